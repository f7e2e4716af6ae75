//! OpenAI backend speaking the Responses API.
//!
//! Posts to `{base_url}/responses` with bearer authentication and extracts
//! the assistant text from the `output` message items. Token usage comes back
//! under `usage.input_tokens` / `usage.output_tokens`; OpenAI does not price
//! the call, so `cost_usd` is left at zero for the aggregator to impute.

use async_trait::async_trait;
use serde_json::json;

use crate::polyllm::provider::{LLMResult, Provider, ProviderError};
use crate::polyllm::providers::common::{get_shared_http_client, post_json, read_usize};

/// Backend for OpenAI's hosted models.
pub struct OpenAIProvider {
    base_url: String,
}

impl OpenAIProvider {
    /// Create a backend pointing at the public OpenAI API.
    pub fn new() -> Self {
        Self::with_base_url("https://api.openai.com/v1")
    }

    /// Create a backend pointing at a custom OpenAI-compatible base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<LLMResult, ProviderError> {
        let url = format!("{}/responses", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "input": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "max_output_tokens": max_tokens,
        });

        let data = post_json(
            get_shared_http_client()
                .post(&url)
                .bearer_auth(api_key)
                .header("Content-Type", "application/json")
                .json(&body),
        )
        .await?;

        // Best-effort extraction: concatenate every output_text part of
        // every message item.
        let mut text = String::new();
        if let Some(items) = data.get("output").and_then(|v| v.as_array()) {
            for item in items {
                if item.get("type").and_then(|v| v.as_str()) != Some("message") {
                    continue;
                }
                if let Some(parts) = item.get("content").and_then(|v| v.as_array()) {
                    for part in parts {
                        if part.get("type").and_then(|v| v.as_str()) == Some("output_text") {
                            text.push_str(part.get("text").and_then(|v| v.as_str()).unwrap_or(""));
                        }
                    }
                }
            }
        }

        let usage = data.get("usage");
        Ok(LLMResult {
            text: text.trim().to_string(),
            provider: "openai".to_string(),
            model: model.to_string(),
            input_tokens: read_usize(usage, "input_tokens"),
            output_tokens: read_usize(usage, "output_tokens"),
            cost_usd: 0.0,
        })
    }
}
