//! OpenAI-compatible chat-completions provider.
//!
//! Works against the OpenAI API and compatible gateways that accept the same
//! chat-completions shape.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NamecraftError, Result};
use crate::llm::{ModelRequest, NameModel};
use crate::types::LlmConfig;

pub struct OpenAiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(NamecraftError::not_configured(
                "OpenAI API key is required",
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("namecraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NamecraftError::network(e.to_string(), None, None))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }

    /// Constructs the full API URL, tolerating base URLs with or without /v1.
    fn build_url(&self, endpoint: &str) -> String {
        let base_url = self.base_url.trim_end_matches('/');
        if base_url.ends_with("/v1") {
            format!("{base_url}{endpoint}")
        } else {
            format!("{base_url}/v1{endpoint}")
        }
    }
}

#[async_trait]
impl NameModel for OpenAiModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: 2000,
        };

        let url = self.build_url("/chat/completions");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                NamecraftError::network(
                    format!("Failed to connect to API: {e}"),
                    None,
                    Some(url.clone()),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = match status.as_u16() {
                401 => format!(
                    "Authentication failed (401). Please check your API key for {}",
                    self.base_url
                ),
                403 => "Access forbidden (403). Your API key may not have permission for this endpoint".to_string(),
                429 => "Rate limit exceeded (429). Please try again later".to_string(),
                500..=599 => format!("Server error ({status}). The API service is experiencing issues"),
                _ => format!("API request failed ({status}): {error_text}"),
            };

            return Err(NamecraftError::network(
                error_msg,
                Some(status.as_u16()),
                Some(url),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| NamecraftError::parse(e.to_string(), None))?;

        let content = chat_response
            .choices
            .first()
            .ok_or_else(|| NamecraftError::bad_gateway("No response from model API"))?
            .message
            .content
            .clone();

        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// Chat-completions API structures
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: "test-key".to_string(),
            base_url: base_url.map(String::from),
        }
    }

    #[test]
    fn test_requires_api_key() {
        let mut cfg = config(None);
        cfg.api_key = String::new();
        assert!(OpenAiModel::new(&cfg).is_err());
    }

    #[test]
    fn test_build_url_handles_v1_suffix() {
        let with_v1 = OpenAiModel::new(&config(Some("https://gateway.example/v1/"))).unwrap();
        assert_eq!(
            with_v1.build_url("/chat/completions"),
            "https://gateway.example/v1/chat/completions"
        );

        let without_v1 = OpenAiModel::new(&config(Some("https://gateway.example"))).unwrap();
        assert_eq!(
            without_v1.build_url("/chat/completions"),
            "https://gateway.example/v1/chat/completions"
        );
    }

    #[test]
    fn test_readiness() {
        let model = OpenAiModel::new(&config(None)).unwrap();
        assert!(model.is_ready());
        assert_eq!(model.model(), "gpt-4o-mini");
    }
}
