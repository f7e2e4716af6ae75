//! Shared primitives for provider-agnostic LLM calls.
//!
//! The orchestrator talks to every vendor through the [`Provider`] trait and
//! the [`LLMResult`] value it returns. Concrete implementations live in
//! [`crate::polyllm::providers`]; the [`ProviderRegistry`] dispatches on the
//! provider-name half of a stage's model identifier, which keeps stage
//! specifications serializable plain data.
//!
//! # Example
//!
//! ```rust,no_run
//! use polyllm::{Provider, ProviderRegistry};
//! use polyllm::polyllm::provider::split_model;
//!
//! # async {
//! let registry = ProviderRegistry::default();
//! let (provider_name, model_id) = split_model("anthropic:claude-3-5-sonnet");
//! let provider = registry.get(provider_name).unwrap();
//! let result = provider
//!     .generate("api-key", model_id, "You are helpful.", "Hello!", 256)
//!     .await
//!     .unwrap();
//! println!("{}", result.text);
//! # };
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::polyllm::providers::anthropic::AnthropicProvider;
use crate::polyllm::providers::google::GoogleProvider;
use crate::polyllm::providers::groq::GroqProvider;
use crate::polyllm::providers::mistral::MistralProvider;
use crate::polyllm::providers::openai::OpenAIProvider;

/// Normalized outcome of one provider call.
///
/// `cost_usd` is `0.0` when the vendor does not price the call itself; the
/// usage aggregator imputes a cost from its pricing table in that case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMResult {
    /// Assistant text, trimmed of leading/trailing whitespace.
    pub text: String,
    /// Provider name the call was served by (e.g. `"openai"`).
    pub provider: String,
    /// Model identifier the call was served by (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Prompt tokens billed by the provider.
    pub input_tokens: usize,
    /// Completion tokens billed by the provider.
    pub output_tokens: usize,
    /// Provider-computed cost in USD, `0.0` when unknown.
    pub cost_usd: f64,
}

/// Error raised by a concrete [`Provider`] implementation.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Transport-level failure: DNS, TLS, connect, or mid-body I/O.
    Network(String),
    /// Non-success HTTP status from the vendor API.
    Http { status: u16, body: String },
    /// Response arrived but did not match the expected wire shape.
    Protocol(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Network(msg) => write!(f, "network error: {}", msg),
            ProviderError::Http { status, body } => write!(f, "http {}: {}", status, body),
            ProviderError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl Error for ProviderError {}

/// Uniform capability set exposed by every LLM vendor backend.
///
/// Implementations translate one request into the vendor wire format and
/// normalize the response into an [`LLMResult`]. They must be thread-safe
/// (`Send + Sync`) so the orchestrator can share them across spawned stage
/// tasks, and the returned future must be cancel-safe: dropping it aborts the
/// underlying HTTP request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable lowercase provider name used as registry key and usage label.
    fn provider_name(&self) -> &str;

    /// Issue one generation request.
    ///
    /// `max_tokens` caps the completion length. Errors are raised for
    /// network, protocol, and quota failures; the resilience wrapper decides
    /// whether to retry.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<LLMResult, ProviderError>;
}

/// Split a `"<provider>:<model-id>"` identifier into its two halves.
///
/// Only the first colon splits, so model ids may themselves contain colons.
/// An identifier without a colon defaults to the `openai` provider.
pub fn split_model(full: &str) -> (&str, &str) {
    match full.find(':') {
        Some(pos) => (&full[..pos], &full[pos + 1..]),
        None => ("openai", full),
    }
}

/// Name-indexed set of [`Provider`] backends.
///
/// [`ProviderRegistry::default`] registers the five built-in vendors. Entries
/// can be replaced via [`ProviderRegistry::insert`], which is how tests plug
/// in scripted providers without touching the network.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create a registry with no backends registered.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register or replace the backend for `name`.
    pub fn insert(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Look up the backend for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert("openai", Arc::new(OpenAIProvider::new()) as Arc<dyn Provider>);
        registry.insert("anthropic", Arc::new(AnthropicProvider::new()) as Arc<dyn Provider>);
        registry.insert("google", Arc::new(GoogleProvider::new()) as Arc<dyn Provider>);
        registry.insert("groq", Arc::new(GroqProvider::new()) as Arc<dyn Provider>);
        registry.insert("mistral", Arc::new(MistralProvider::new()) as Arc<dyn Provider>);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_model_with_colon() {
        assert_eq!(split_model("openai:gpt-4o"), ("openai", "gpt-4o"));
    }

    #[test]
    fn split_model_without_colon_defaults_to_openai() {
        assert_eq!(split_model("gpt-4o"), ("openai", "gpt-4o"));
    }

    #[test]
    fn split_model_anthropic_prefix() {
        assert_eq!(
            split_model("anthropic:claude-3-5-sonnet"),
            ("anthropic", "claude-3-5-sonnet")
        );
    }

    #[test]
    fn split_model_only_first_colon_splits() {
        assert_eq!(split_model("openai:gpt-4:turbo"), ("openai", "gpt-4:turbo"));
    }

    #[test]
    fn default_registry_has_all_builtin_vendors() {
        let registry = ProviderRegistry::default();
        for name in &["openai", "anthropic", "google", "groq", "mistral"] {
            assert!(registry.get(name).is_some(), "missing provider {}", name);
        }
        assert!(registry.get("unknown_llm").is_none());
    }
}
