//! Google Gemini backend speaking the Generative Language API.
//!
//! Gemini authenticates via a `key` query parameter rather than a bearer
//! header, and reports token usage under `usageMetadata`.

use async_trait::async_trait;
use serde_json::json;

use crate::polyllm::provider::{LLMResult, Provider, ProviderError};
use crate::polyllm::providers::common::{get_shared_http_client, post_json, read_usize};

/// Backend for Google's Gemini models.
pub struct GoogleProvider {
    base_url: String,
}

impl GoogleProvider {
    /// Create a backend pointing at the public Generative Language API.
    pub fn new() -> Self {
        Self::with_base_url("https://generativelanguage.googleapis.com/v1beta")
    }

    /// Create a backend pointing at a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<LLMResult, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let body = json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": [{"role": "user", "parts": [{"text": user}]}],
            "generationConfig": {"maxOutputTokens": max_tokens},
        });

        let data = post_json(
            get_shared_http_client()
                .post(&url)
                .query(&[("key", api_key)])
                .header("Content-Type", "application/json")
                .json(&body),
        )
        .await?;

        let mut text = String::new();
        if let Some(candidates) = data.get("candidates").and_then(|v| v.as_array()) {
            for candidate in candidates {
                if let Some(parts) = candidate
                    .get("content")
                    .and_then(|c| c.get("parts"))
                    .and_then(|v| v.as_array())
                {
                    for part in parts {
                        text.push_str(part.get("text").and_then(|v| v.as_str()).unwrap_or(""));
                    }
                }
            }
        }

        let usage = data.get("usageMetadata");
        Ok(LLMResult {
            text: text.trim().to_string(),
            provider: "google".to_string(),
            model: model.to_string(),
            input_tokens: read_usize(usage, "promptTokenCount"),
            output_tokens: read_usize(usage, "candidatesTokenCount"),
            cost_usd: 0.0,
        })
    }
}
