//! Timeout and bounded-retry wrapper around a single provider call.
//!
//! Every provider interaction in the pipeline goes through
//! [`call_with_resilience`]: each attempt runs under a wall-clock deadline,
//! failed attempts back off exponentially (capped at three seconds), and
//! latency accumulates across attempts so telemetry reflects what the caller
//! actually waited.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::polyllm::config::ExecutionConfig;
use crate::polyllm::provider::{LLMResult, Provider};

/// Terminal state of a wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ok,
    Failed,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::Ok => write!(f, "ok"),
            CallStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What one wrapped call cost in time and attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRuntime {
    /// Wall-clock milliseconds summed over every attempt, failed ones
    /// included.
    pub latency_ms: u64,
    /// Retries performed; zero when the first attempt succeeded.
    pub retries: u32,
    pub status: CallStatus,
    /// Last observed error when the call exhausted its attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sleep duration before retrying after the 0-indexed failed `attempt`.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = (0.8_f64 * 2.0_f64.powi(attempt as i32)).min(3.0);
    Duration::from_secs_f64(secs)
}

/// Run one provider call with a per-attempt timeout and bounded retries.
///
/// Total attempts are `retries_per_stage + 1`. On success the runtime
/// records how many retries were spent; on exhaustion the result is `None`
/// and the runtime carries the last error text.
pub async fn call_with_resilience(
    provider: &dyn Provider,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
    max_tokens: u32,
    cfg: &ExecutionConfig,
) -> (Option<LLMResult>, StageRuntime) {
    let attempts = cfg.retries_per_stage + 1;
    let mut last_error = String::new();
    let mut total_latency_ms: u64 = 0;

    for attempt in 0..attempts {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(cfg.stage_timeout_sec),
            provider.generate(api_key, model, system, user, max_tokens),
        )
        .await;
        total_latency_ms += started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                return (
                    Some(result),
                    StageRuntime {
                        latency_ms: total_latency_ms,
                        retries: attempt,
                        status: CallStatus::Ok,
                        error: None,
                    },
                );
            }
            Ok(Err(err)) => {
                last_error = err.to_string();
            }
            Err(_) => {
                last_error = format!(
                    "timeout: attempt exceeded {}s deadline",
                    cfg.stage_timeout_sec
                );
            }
        }

        if attempt + 1 < attempts {
            log::warn!(
                "{}:{} attempt {}/{} failed ({}), backing off",
                provider.provider_name(),
                model,
                attempt + 1,
                attempts,
                last_error
            );
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    log::error!(
        "{}:{} exhausted {} attempt(s): {}",
        provider.provider_name(),
        model,
        attempts,
        last_error
    );
    (
        None,
        StageRuntime {
            latency_ms: total_latency_ms,
            retries: attempts.saturating_sub(1),
            status: CallStatus::Failed,
            error: Some(last_error),
        },
    )
}
