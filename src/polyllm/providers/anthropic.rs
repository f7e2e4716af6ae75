//! Anthropic backend speaking the native Messages API.

use async_trait::async_trait;
use serde_json::json;

use crate::polyllm::provider::{LLMResult, Provider, ProviderError};
use crate::polyllm::providers::common::{get_shared_http_client, post_json, read_usize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend for Anthropic's Claude models.
pub struct AnthropicProvider {
    base_url: String,
}

impl AnthropicProvider {
    /// Create a backend pointing at the public Anthropic API.
    pub fn new() -> Self {
        Self::with_base_url("https://api.anthropic.com/v1")
    }

    /// Create a backend pointing at a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<LLMResult, ProviderError> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });

        let data = post_json(
            get_shared_http_client()
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body),
        )
        .await?;

        let mut text = String::new();
        if let Some(blocks) = data.get("content").and_then(|v| v.as_array()) {
            for block in blocks {
                if block.get("type").and_then(|v| v.as_str()) == Some("text") {
                    text.push_str(block.get("text").and_then(|v| v.as_str()).unwrap_or(""));
                }
            }
        }

        let usage = data.get("usage");
        Ok(LLMResult {
            text: text.trim().to_string(),
            provider: "anthropic".to_string(),
            model: model.to_string(),
            input_tokens: read_usize(usage, "input_tokens"),
            output_tokens: read_usize(usage, "output_tokens"),
            cost_usd: 0.0,
        })
    }
}
