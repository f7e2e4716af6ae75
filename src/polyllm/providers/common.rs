//! Shared utilities used across provider implementations.
//!
//! Every vendor backend posts JSON to its API through one pooled
//! [`reqwest::Client`]; keeping a single instance alive keeps TLS sessions
//! and DNS lookups warm when many stages fan out concurrently. The helpers
//! here also centralize the error mapping from transport/status/parse
//! failures into [`ProviderError`], and implement the OpenAI-compatible
//! chat-completions shape that more than one vendor speaks.

use lazy_static::lazy_static;
use serde_json::json;
use std::time::Duration;

use crate::polyllm::provider::{LLMResult, ProviderError};

lazy_static! {
    /// Shared HTTP client with persistent connection pooling.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = {
        reqwest::ClientBuilder::new()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build shared HTTP client")
    };
}

/// Borrow the lazily initialised shared [`reqwest::Client`].
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Send a prepared request and parse the response body as JSON.
///
/// Transport failures map to [`ProviderError::Network`], non-success statuses
/// to [`ProviderError::Http`] with the response body attached, and unparsable
/// bodies to [`ProviderError::Protocol`].
pub async fn post_json(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    if !status.is_success() {
        if log::log_enabled!(log::Level::Error) {
            log::error!("provider call failed: HTTP {}: {}", status, text);
        }
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Protocol(e.to_string()))
}

/// Call an OpenAI-compatible `/chat/completions` endpoint and normalize the
/// response.
///
/// Several vendors (Groq, Mistral) expose this exact wire shape, so their
/// backends delegate here with their own base URL and provider label.
pub async fn send_chat_completions(
    base_url: &str,
    provider_name: &str,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    max_tokens: u32,
) -> Result<LLMResult, ProviderError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let body = json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ],
        "max_tokens": max_tokens,
    });

    let data = post_json(
        get_shared_http_client()
            .post(&url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body),
    )
    .await?;

    let text = data
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let usage = data.get("usage");
    let input_tokens = read_usize(usage, "prompt_tokens");
    let output_tokens = read_usize(usage, "completion_tokens");

    Ok(LLMResult {
        text,
        provider: provider_name.to_string(),
        model: model.to_string(),
        input_tokens,
        output_tokens,
        cost_usd: 0.0,
    })
}

/// Read a non-negative integer field from an optional JSON object.
pub fn read_usize(object: Option<&serde_json::Value>, field: &str) -> usize {
    object
        .and_then(|o| o.get(field))
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize
}
