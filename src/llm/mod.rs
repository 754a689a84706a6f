//! Generative model integration.
//!
//! The provider seam returns raw completion text; parsing and schema
//! validation happen here so a malformed completion is always surfaced as a
//! bad-gateway condition, never guess-repaired.

pub mod openai;

pub use openai::OpenAiModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NamecraftError, Result};
use crate::types::{LlmConfig, Suggestion, SuggestionCount};

/// Bounds enforced on the model's structured output.
const MIN_SUGGESTIONS: usize = 1;
const MAX_SUGGESTIONS: usize = 30;
const MAX_NAME_CHARS: usize = 80;
const MAX_TAGLINE_CHARS: usize = 120;

/// Core trait for generative model providers.
#[async_trait]
pub trait NameModel: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(&self, request: &ModelRequest) -> Result<String>;

    /// Get model identifier being used
    fn model(&self) -> &str;

    /// Check if provider is configured and ready
    fn is_ready(&self) -> bool;
}

/// A structured prompt: fixed system instruction plus a JSON user payload.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Create a model provider from configuration
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn NameModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiModel::new(config)?)),
        other => Err(NamecraftError::not_configured(format!(
            "Unsupported model provider: {other}. Supported providers: openai"
        ))),
    }
}

/// Build the request for one generation.
///
/// Temperature stays non-zero so repeated identical requests vary.
pub fn build_model_request(
    description: &str,
    industry: &str,
    tone: &str,
    keywords: Option<&str>,
    count: SuggestionCount,
    temperature: f32,
) -> ModelRequest {
    let system = "You are an expert brand strategist. Generate short, brandable, \
startup-ready business names. Avoid trademarks and well-known brand names. Prefer \
1-2 words, easy to pronounce, memorable. Prefer made-up or blended words over \
common dictionary terms. Aim for names that are more likely to have open domain \
options across popular TLDs. Provide optional tagline. Output ONLY valid JSON."
        .to_string();

    let payload = serde_json::json!({
        "description": description,
        "industry": industry,
        "tone": tone,
        "keywords": keywords,
        "requirements": {
            "count": count.as_u32(),
            "disallow": ["trademarked names", "existing famous companies"],
        },
        "outputSchema": {
            "suggestions": [{
                "name": "string",
                "tagline": "string (optional)",
            }],
        },
    });

    let user = format!(
        "Generate exactly {} name suggestions for the following. Return ONLY JSON \
with shape {{\"suggestions\":[{{\"name\":...,\"tagline\":...}}]}}. No markdown, \
no code fences.\n\n{payload}",
        count.as_u32()
    );

    ModelRequest {
        system,
        user,
        temperature,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSuggestion {
    name: String,
    #[serde(default)]
    tagline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawModelResponse {
    suggestions: Vec<RawSuggestion>,
}

/// Parse the model's raw text and validate its shape.
///
/// Any parse failure or bound violation is a bad-gateway condition; malformed
/// model output is never forwarded to the client.
pub fn parse_suggestions(raw: &str) -> Result<Vec<Suggestion>> {
    let parsed: RawModelResponse = serde_json::from_str(raw)
        .map_err(|e| NamecraftError::bad_gateway(format!("Invalid model response: {e}")))?;

    let count = parsed.suggestions.len();
    if !(MIN_SUGGESTIONS..=MAX_SUGGESTIONS).contains(&count) {
        return Err(NamecraftError::bad_gateway(format!(
            "Invalid model response: expected {MIN_SUGGESTIONS}-{MAX_SUGGESTIONS} suggestions, got {count}"
        )));
    }

    let mut suggestions = Vec::with_capacity(count);
    for raw in parsed.suggestions {
        let name_len = raw.name.chars().count();
        if name_len == 0 || name_len > MAX_NAME_CHARS {
            return Err(NamecraftError::bad_gateway(format!(
                "Invalid model response: name must be 1-{MAX_NAME_CHARS} characters"
            )));
        }
        if let Some(tagline) = &raw.tagline {
            let tagline_len = tagline.chars().count();
            if tagline_len == 0 || tagline_len > MAX_TAGLINE_CHARS {
                return Err(NamecraftError::bad_gateway(format!(
                    "Invalid model response: tagline must be 1-{MAX_TAGLINE_CHARS} characters"
                )));
            }
        }
        suggestions.push(Suggestion {
            name: raw.name,
            tagline: raw.tagline,
        });
    }

    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_exact_count() {
        let request = build_model_request(
            "A cloud-based invoicing tool for freelancers",
            "Fintech",
            "professional",
            None,
            SuggestionCount::Six,
            0.9,
        );
        assert!(request.user.contains("Generate exactly 6 name suggestions"));
        assert!(request.user.contains("\"count\":6"));
        assert!(request.system.contains("brand strategist"));
        assert!(request.temperature > 0.0);
    }

    #[test]
    fn test_parse_well_formed_response() {
        let raw = r#"{"suggestions":[{"name":"Finlio","tagline":"Invoices on autopilot"},{"name":"Wavely"}]}"#;
        let suggestions = parse_suggestions(raw).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].name, "Finlio");
        assert_eq!(suggestions[0].tagline.as_deref(), Some("Invoices on autopilot"));
        assert!(suggestions[1].tagline.is_none());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_suggestions("Here are some names: Finlio, Wavely").unwrap_err();
        assert_eq!(err.condition_code(), "BAD_GATEWAY");
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(parse_suggestions(r#"{"names":["Finlio"]}"#).is_err());
        assert!(parse_suggestions(r#"{"suggestions":[]}"#).is_err());
        assert!(parse_suggestions(r#"{"suggestions":[{"tagline":"no name"}]}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_bound_violations() {
        let long_name = "x".repeat(81);
        let raw = format!(r#"{{"suggestions":[{{"name":"{long_name}"}}]}}"#);
        assert!(parse_suggestions(&raw).is_err());

        let empty_name = r#"{"suggestions":[{"name":""}]}"#;
        assert!(parse_suggestions(empty_name).is_err());

        let long_tagline = "t".repeat(121);
        let raw = format!(r#"{{"suggestions":[{{"name":"Finlio","tagline":"{long_tagline}"}}]}}"#);
        assert!(parse_suggestions(&raw).is_err());

        let too_many: Vec<String> = (0..31).map(|i| format!(r#"{{"name":"n{i}"}}"#)).collect();
        let raw = format!(r#"{{"suggestions":[{}]}}"#, too_many.join(","));
        assert!(parse_suggestions(&raw).is_err());
    }

    #[test]
    fn test_create_model_rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(create_model(&config).is_err());
    }
}
