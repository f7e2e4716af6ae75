//! Cost imputation and per-call usage payloads.
//!
//! Providers that price their own calls are taken at their word; everything
//! else is imputed from [`PricingTable`]. The table is a static snapshot of
//! public list prices and will drift from vendor reality, so it is exposed
//! as configurable data, not compile-time constants. Treat imputed costs as
//! order-of-magnitude estimates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::polyllm::provider::LLMResult;
use crate::polyllm::resilience::{CallStatus, StageRuntime};

/// USD per million tokens as `(input, output)`.
pub type TokenPrice = (f64, f64);

/// Per-provider token prices with a fallback row for unknown names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTable {
    rows: HashMap<String, TokenPrice>,
    fallback: TokenPrice,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut rows = HashMap::new();
        rows.insert("openai".to_string(), (0.50, 1.50));
        rows.insert("anthropic".to_string(), (0.80, 4.00));
        rows.insert("google".to_string(), (0.35, 1.05));
        rows.insert("groq".to_string(), (0.10, 0.30));
        rows.insert("mistral".to_string(), (0.20, 0.60));
        Self {
            rows,
            // Unknown providers are priced like openai.
            fallback: (0.50, 1.50),
        }
    }
}

impl PricingTable {
    /// Price row for `provider`, or the fallback row when unknown.
    pub fn price_for(&self, provider: &str) -> TokenPrice {
        self.rows.get(provider).copied().unwrap_or(self.fallback)
    }

    /// Register or replace the price row for `provider`.
    pub fn set_price(&mut self, provider: impl Into<String>, input: f64, output: f64) {
        self.rows.insert(provider.into(), (input, output));
    }
}

/// Round to six decimal places, the resolution used for every USD amount.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Everything reported per provider call: the text, token counts, money, and
/// the runtime the resilience wrapper measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePayload {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub retries: u32,
    pub status: CallStatus,
}

/// Assemble the usage payload for one call, imputing cost when the provider
/// reported none.
pub fn build_payload(
    result: &LLMResult,
    runtime: &StageRuntime,
    pricing: &PricingTable,
) -> UsagePayload {
    let cost_usd = if result.cost_usd > 0.0 {
        result.cost_usd
    } else {
        let provider = if result.provider.is_empty() {
            "openai"
        } else {
            result.provider.as_str()
        };
        let (in_price, out_price) = pricing.price_for(provider);
        round6(
            (result.input_tokens as f64 * in_price + result.output_tokens as f64 * out_price)
                / 1_000_000.0,
        )
    };

    UsagePayload {
        text: result.text.clone(),
        provider: result.provider.clone(),
        model: result.model.clone(),
        input_tokens: result.input_tokens,
        output_tokens: result.output_tokens,
        cost_usd,
        latency_ms: runtime.latency_ms,
        retries: runtime.retries,
        status: runtime.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(provider: &str, input_tokens: usize, output_tokens: usize, cost_usd: f64) -> LLMResult {
        LLMResult {
            text: "answer".to_string(),
            provider: provider.to_string(),
            model: "gpt-4o-mini".to_string(),
            input_tokens,
            output_tokens,
            cost_usd,
        }
    }

    fn runtime() -> StageRuntime {
        StageRuntime {
            latency_ms: 100,
            retries: 0,
            status: CallStatus::Ok,
            error: None,
        }
    }

    #[test]
    fn provider_cost_used_verbatim_when_positive() {
        let payload = build_payload(&result("openai", 100, 50, 0.005), &runtime(), &PricingTable::default());
        assert_eq!(payload.cost_usd, 0.005);
    }

    #[test]
    fn input_cost_imputed_when_zero() {
        let payload = build_payload(
            &result("openai", 1_000_000, 0, 0.0),
            &runtime(),
            &PricingTable::default(),
        );
        assert!((payload.cost_usd - 0.50).abs() < 0.0001);
    }

    #[test]
    fn output_cost_imputed_when_zero() {
        let payload = build_payload(
            &result("openai", 0, 1_000_000, 0.0),
            &runtime(),
            &PricingTable::default(),
        );
        assert!((payload.cost_usd - 1.50).abs() < 0.0001);
    }

    #[test]
    fn anthropic_row_applied() {
        let payload = build_payload(
            &result("anthropic", 1_000_000, 0, 0.0),
            &runtime(),
            &PricingTable::default(),
        );
        assert!((payload.cost_usd - 0.80).abs() < 0.0001);
    }

    #[test]
    fn unknown_provider_falls_back_to_openai_row() {
        let payload = build_payload(
            &result("unknown_llm", 1_000_000, 0, 0.0),
            &runtime(),
            &PricingTable::default(),
        );
        assert!((payload.cost_usd - 0.50).abs() < 0.0001);
    }

    #[test]
    fn runtime_fields_carried_through() {
        let rt = StageRuntime {
            latency_ms: 350,
            retries: 2,
            status: CallStatus::Ok,
            error: None,
        };
        let payload = build_payload(&result("openai", 100, 50, 0.0), &rt, &PricingTable::default());
        assert_eq!(payload.latency_ms, 350);
        assert_eq!(payload.retries, 2);
        assert_eq!(payload.status, CallStatus::Ok);
    }

    #[test]
    fn custom_price_row_overrides_default() {
        let mut pricing = PricingTable::default();
        pricing.set_price("openai", 1.0, 2.0);
        let payload = build_payload(&result("openai", 1_000_000, 0, 0.0), &runtime(), &pricing);
        assert!((payload.cost_usd - 1.0).abs() < 0.0001);
    }

    #[test]
    fn imputed_cost_rounded_to_six_decimals() {
        let payload = build_payload(&result("openai", 100, 50, 0.0), &runtime(), &PricingTable::default());
        // 100 * 0.50/1M + 50 * 1.50/1M = 0.000125
        assert_eq!(payload.cost_usd, 0.000125);
    }
}
