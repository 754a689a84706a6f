//! Core types and structures for namecraft

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NamecraftError, Result};

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Pro,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "FREE"),
            Plan::Pro => write!(f, "PRO"),
        }
    }
}

/// Billing-processor subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
}

impl SubscriptionStatus {
    /// Only these statuses keep an elevated plan in effect; any other status
    /// collapses entitlement to the free tier regardless of the stored plan.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

/// One subscription per identity, mutated externally by the billing webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// External billing price reference, e.g. a processor price id.
    pub price_ref: Option<String>,
}

/// An authenticated caller, resolved by the external session collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Allowed suggestion counts, each mapped to a credit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SuggestionCount {
    Two,
    Four,
    Six,
}

impl SuggestionCount {
    pub fn as_u32(&self) -> u32 {
        match self {
            SuggestionCount::Two => 2,
            SuggestionCount::Four => 4,
            SuggestionCount::Six => 6,
        }
    }

    /// Credit cost scales with the requested count: count / 2.
    pub fn credit_cost(&self) -> Decimal {
        Decimal::from(self.as_u32()) / Decimal::from(2u32)
    }
}

impl Default for SuggestionCount {
    fn default() -> Self {
        SuggestionCount::Four
    }
}

impl TryFrom<u32> for SuggestionCount {
    type Error = NamecraftError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            2 => Ok(SuggestionCount::Two),
            4 => Ok(SuggestionCount::Four),
            6 => Ok(SuggestionCount::Six),
            other => Err(NamecraftError::invalid_input(format!(
                "count must be one of 2, 4, 6 (got {other})"
            ))),
        }
    }
}

impl From<SuggestionCount> for u32 {
    fn from(value: SuggestionCount) -> Self {
        value.as_u32()
    }
}

/// Validated generation request input. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInput {
    pub description: String,
    pub industry: String,
    pub tone: String,
    pub keywords: Option<String>,
    #[serde(default)]
    pub count: Option<SuggestionCount>,
}

impl GenerationInput {
    /// Validate shape and bounds. Character counts, not bytes.
    pub fn validate(&self) -> Result<()> {
        check_len("description", &self.description, 10, 2000)?;
        check_len("industry", &self.industry, 2, 120)?;
        check_len("tone", &self.tone, 2, 40)?;
        if let Some(keywords) = &self.keywords {
            check_len("keywords", keywords, 1, 200)?;
        }
        Ok(())
    }

    /// Requested count, falling back to the default of four.
    pub fn requested_count(&self) -> SuggestionCount {
        self.count.unwrap_or_default()
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(NamecraftError::invalid_input(format!(
            "{field} must be {min}-{max} characters (got {len})"
        )));
    }
    Ok(())
}

/// One model-produced candidate, normalized but not yet enriched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub tagline: Option<String>,
}

/// Likely-availability verdict for a fully-qualified domain name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Taken,
    LikelyAvailable,
    Unknown,
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStatus::Taken => write!(f, "taken"),
            DomainStatus::LikelyAvailable => write!(f, "likely_available"),
            DomainStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-TLD probe verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainCheck {
    pub fqdn: String,
    pub status: DomainStatus,
}

/// All probe verdicts for one candidate base label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainReport {
    pub domains: Vec<DomainCheck>,
    /// Subset of `domains` with a likely-available verdict.
    pub available_domains: Vec<String>,
}

/// A suggestion after corpus and domain processing. The unit returned to the
/// caller; an out-of-scope save endpoint may persist it later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSuggestion {
    /// Final name actually returned.
    pub name: String,
    /// The model's name, present only when a replacement was substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// True when the name collided and a clear replacement was found.
    pub replaced_because_taken: bool,
    /// True when the model's name collided with the recorded-name corpus.
    pub is_existing_business_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    pub domains: Vec<DomainCheck>,
    pub available_domains: Vec<String>,
}

/// Successful pipeline response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub suggestions: Vec<EnrichedSuggestion>,
    /// Identifier of the model that produced the suggestions.
    pub model: String,
}

/// One recorded generation-credit period for an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePeriod {
    pub id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub used_credits: Decimal,
}

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-source-address requests per window.
    pub ip_limit: u32,
    /// Per-identity requests per window.
    pub identity_limit: u32,
    /// Fixed rate-limit window.
    pub window: Duration,
    /// Hard cap on suggestions enriched per request, whatever the model returns.
    pub max_enriched: usize,
    /// Free-tier credits per billing period.
    pub free_limit: Decimal,
    /// Pro-tier credits per billing period.
    pub pro_limit: Decimal,
    /// TLDs probed for each candidate.
    pub tlds: Vec<String>,
    /// Billing price reference that also grants the pro tier.
    pub pro_price_ref: Option<String>,
    /// Sampling temperature for the generation step.
    pub temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ip_limit: 30,
            identity_limit: 20,
            window: Duration::from_secs(60),
            max_enriched: 20,
            free_limit: Decimal::from(1u32),
            pro_limit: Decimal::from(200u32),
            tlds: vec!["com", "ai", "io", "co", "app"]
                .into_iter()
                .map(String::from)
                .collect(),
            pro_price_ref: None,
            temperature: 0.9,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            base_url: None,
        }
    }
}

impl LlmConfig {
    /// Build a configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            provider: "openai".to_string(),
            model: std::env::var("OPENAI_NAME_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
        }
    }
}
