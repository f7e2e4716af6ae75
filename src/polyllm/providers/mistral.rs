//! Mistral backend, served over the OpenAI-compatible chat-completions surface.

use async_trait::async_trait;

use crate::polyllm::provider::{LLMResult, Provider, ProviderError};
use crate::polyllm::providers::common::send_chat_completions;

/// Backend for Mistral's hosted models.
pub struct MistralProvider {
    base_url: String,
}

impl MistralProvider {
    /// Create a backend pointing at the public Mistral API.
    pub fn new() -> Self {
        Self::with_base_url("https://api.mistral.ai/v1")
    }

    /// Create a backend pointing at a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Provider for MistralProvider {
    fn provider_name(&self) -> &str {
        "mistral"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<LLMResult, ProviderError> {
        send_chat_completions(
            &self.base_url,
            "mistral",
            api_key,
            model,
            system,
            user,
            max_tokens,
        )
        .await
    }
}
