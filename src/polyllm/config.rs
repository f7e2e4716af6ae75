//! Invocation tunables: spending budget, execution behavior, and the
//! localizable placeholder texts returned when a pipeline cannot run.
//!
//! All of these are plain data constructed by the caller; there is no config
//! file parsing in this crate. Persisting them is the caller's concern.

use serde::{Deserialize, Serialize};

/// Hard ceiling on how many stages one pipeline may declare.
pub const MAX_PIPELINE_STAGES: usize = 6;

/// Spending and token caps for one orchestrator invocation. Immutable for
/// the duration of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Cumulative cost ceiling in USD. Zero or negative disables the guard.
    pub max_usd: f64,
    /// Completion-token cap passed to every non-synthesis stage call.
    pub max_tokens_per_stage: u32,
    /// Completion-token cap for the synthesis and refine calls.
    pub synth_max_tokens: u32,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_usd: 0.10,
            max_tokens_per_stage: 800,
            synth_max_tokens: 1200,
        }
    }
}

/// Resilience and feature switches for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Retries after the first attempt; total attempts = retries + 1.
    pub retries_per_stage: u32,
    /// Wall-clock cap on a single provider attempt, in seconds.
    pub stage_timeout_sec: u64,
    /// When false, stage dependencies are the strict linear chain instead of
    /// being inferred from the prompts.
    pub enable_dynamic_graph: bool,
    /// When false, the refine pass never runs (quality is still reported).
    pub enable_quality_matrix: bool,
    /// Axis score below which a refine pass is attempted, in `[0, 5]`.
    pub quality_min_threshold: f64,
    /// Allow at most one refine call per invocation.
    pub auto_refine_once: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            retries_per_stage: 1,
            stage_timeout_sec: 75,
            enable_dynamic_graph: true,
            enable_quality_matrix: true,
            quality_min_threshold: 3.0,
            auto_refine_once: true,
        }
    }
}

/// User-facing texts returned in the `final` field when an invocation cannot
/// proceed.
///
/// Stored as templates with `{provider}` / `{name}` / `{error}` / `{max}`
/// substitution markers so deployments can swap in any locale. Defaults keep
/// the original Korean wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderMessages {
    /// Shown when the stage list is empty.
    pub empty_pipeline: String,
    /// Shown when the first stage's provider is unknown or has no API key.
    pub missing_api_key: String,
    /// Shown when the fast-path first stage exhausts its retries.
    pub stage_failed: String,
    /// Shown when the synthesis call exhausts its retries.
    pub synth_failed: String,
    /// Shown when a stage claims a reserved usage key.
    pub reserved_stage_name: String,
    /// Shown when two stages share one name.
    pub duplicate_stage_name: String,
    /// Shown when the pipeline exceeds [`MAX_PIPELINE_STAGES`].
    pub too_many_stages: String,
}

impl Default for PlaceholderMessages {
    fn default() -> Self {
        Self {
            empty_pipeline: "파이프라인 스테이지가 없습니다. Settings에서 스테이지를 추가해주세요."
                .to_string(),
            missing_api_key: "API Key가 없습니다: {provider}. Settings에서 등록해주세요."
                .to_string(),
            stage_failed: "{name} 실행 실패: {error}".to_string(),
            synth_failed: "Synth 실행 실패: {error}".to_string(),
            reserved_stage_name: "예약된 스테이지 이름입니다: {name}".to_string(),
            duplicate_stage_name: "스테이지 이름이 중복되었습니다: {name}".to_string(),
            too_many_stages: "파이프라인 스테이지는 최대 {max}개까지 지원합니다.".to_string(),
        }
    }
}

impl PlaceholderMessages {
    pub fn missing_key(&self, provider: &str) -> String {
        self.missing_api_key.replace("{provider}", provider)
    }

    pub fn stage_failure(&self, name: &str, error: &str) -> String {
        self.stage_failed
            .replace("{name}", name)
            .replace("{error}", error)
    }

    pub fn synth_failure(&self, error: &str) -> String {
        self.synth_failed.replace("{error}", error)
    }

    pub fn reserved_name(&self, name: &str) -> String {
        self.reserved_stage_name.replace("{name}", name)
    }

    pub fn duplicate_name(&self, name: &str) -> String {
        self.duplicate_stage_name.replace("{name}", name)
    }

    pub fn too_many(&self, max: usize) -> String {
        self.too_many_stages.replace("{max}", &max.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_default_values() {
        let b = Budget::default();
        assert_eq!(b.max_usd, 0.10);
        assert_eq!(b.max_tokens_per_stage, 800);
        assert_eq!(b.synth_max_tokens, 1200);
    }

    #[test]
    fn execution_config_default_values() {
        let cfg = ExecutionConfig::default();
        assert_eq!(cfg.retries_per_stage, 1);
        assert_eq!(cfg.stage_timeout_sec, 75);
        assert!(cfg.enable_dynamic_graph);
        assert!(cfg.enable_quality_matrix);
        assert_eq!(cfg.quality_min_threshold, 3.0);
        assert!(cfg.auto_refine_once);
    }

    #[test]
    fn execution_config_custom_values() {
        let cfg = ExecutionConfig {
            retries_per_stage: 3,
            stage_timeout_sec: 30,
            enable_dynamic_graph: false,
            ..ExecutionConfig::default()
        };
        assert_eq!(cfg.retries_per_stage, 3);
        assert_eq!(cfg.stage_timeout_sec, 30);
        assert!(!cfg.enable_dynamic_graph);
    }

    #[test]
    fn placeholder_substitution() {
        let messages = PlaceholderMessages::default();
        assert!(messages.missing_key("openai").contains("openai"));
        let failure = messages.stage_failure("Solver", "network error: boom");
        assert!(failure.contains("Solver"));
        assert!(failure.contains("boom"));
        assert!(messages.too_many(6).contains('6'));
    }
}
