//! Namecraft - AI-assisted business name generation pipeline
//!
//! Generates brandable business names with a generative model, rewrites
//! collisions against a recorded-name corpus, probes candidate domains for
//! likely availability, and meters usage credits against a subscription plan.

pub mod account;
pub mod corpus;
pub mod error;
pub mod limiter;
pub mod llm;
pub mod pipeline;
pub mod probe;
pub mod types;
pub mod usage;

// Re-export commonly used types
pub use error::{NamecraftError, Result};
pub use types::{
    DomainCheck, DomainReport, DomainStatus, EnrichedSuggestion, GenerationInput,
    GenerationOutcome, Identity, LlmConfig, PipelineConfig, Plan, Subscription,
    SubscriptionStatus, Suggestion, SuggestionCount, UsagePeriod,
};

// Re-export main functionality
pub use llm::{create_model, NameModel};
pub use pipeline::NamePipeline;
pub use probe::{AvailabilityProber, DomainProber, HickoryDnsProbe};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
