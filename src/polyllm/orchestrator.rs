//! The pipeline driver.
//!
//! One [`Orchestrator::run`] call answers one question: it gates the
//! question, schedules the configured stages into parallel levels, runs each
//! level as a fan-out of spawned tasks behind the resilience wrapper, feeds
//! every emitted stage output into a synthesis call, scores the result, and
//! optionally refines it once. Failures degrade instead of aborting: a dead
//! stage becomes a labeled placeholder, a blown budget stops scheduling new
//! levels, and configuration problems come back as a human-readable `final`
//! text rather than an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use polyllm::{Orchestrator, OrchestratorRequest, StageSpec};
//!
//! # async {
//! let request = OrchestratorRequest::new("What is the best caching strategy?")
//!     .with_api_key("openai", "sk-...")
//!     .with_stage(StageSpec::new("Solver", "Answer the question.", "openai:gpt-4o-mini"))
//!     .with_stage(StageSpec::new("Critic", "Critique the answer.", "openai:gpt-4o-mini"))
//!     .with_synth_model("openai:gpt-4o-mini");
//!
//! let result = Orchestrator::new().run(request).await;
//! println!("{}", result.final_text);
//! # };
//! ```

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::polyllm::config::{Budget, ExecutionConfig, PlaceholderMessages, MAX_PIPELINE_STAGES};
use crate::polyllm::gate::{rule_based_gate, GateDecision};
use crate::polyllm::graph::{infer_dependencies, linear_chain, topology_levels};
use crate::polyllm::prompts;
use crate::polyllm::provider::{split_model, LLMResult, ProviderRegistry};
use crate::polyllm::quality::{quality_matrix, QualityReport};
use crate::polyllm::resilience::{call_with_resilience, CallStatus, StageRuntime};
use crate::polyllm::usage::{build_payload, round6, PricingTable, UsagePayload};

/// Usage-map keys claimed by the orchestrator itself. Stages must not use
/// them as names.
const RESERVED_STAGE_NAMES: &[&str] = &["synth", "quality_refine"];

/// One configured pipeline stage: a display name, the system prompt it runs
/// under, and a `"<provider>:<model-id>"` identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub system_prompt: String,
    pub model: String,
}

impl StageSpec {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: model.into(),
        }
    }
}

/// Output of one stage, keyed by the stage's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub name: String,
    pub text: String,
}

/// Runtime numbers for one call as surfaced in the monitoring report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub latency_ms: u64,
    pub retries: u32,
    pub status: CallStatus,
}

impl StageMetrics {
    fn from_payload(payload: &UsagePayload) -> Self {
        Self {
            latency_ms: payload.latency_ms,
            retries: payload.retries,
            status: payload.status,
        }
    }
}

/// Telemetry accumulated over one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringReport {
    /// Correlation id, also used in log lines for this invocation.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// How the SIMPLE/MULTI decision was reached.
    pub decision_reason: String,
    /// The parallel levels the scheduler executed, as stage indices.
    pub graph_levels: Vec<Vec<usize>>,
    pub total_latency_ms: u64,
    pub total_cost_usd: f64,
    pub total_input_tokens: usize,
    pub total_output_tokens: usize,
    pub stage_metrics: HashMap<String, StageMetrics>,
    /// True when cumulative cost met the budget ceiling and further levels
    /// were skipped.
    pub budget_guard_triggered: bool,
}

impl MonitoringReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            decision_reason: String::new(),
            graph_levels: Vec::new(),
            total_latency_ms: 0,
            total_cost_usd: 0.0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            stage_metrics: HashMap::new(),
            budget_guard_triggered: false,
        }
    }

    /// Fold one call's payload into the running totals. Called serially,
    /// never from concurrent tasks.
    fn record(&mut self, name: &str, payload: &UsagePayload) {
        self.stage_metrics
            .insert(name.to_string(), StageMetrics::from_payload(payload));
        self.total_latency_ms += payload.latency_ms;
        self.total_input_tokens += payload.input_tokens;
        self.total_output_tokens += payload.output_tokens;
        self.total_cost_usd = round6(self.total_cost_usd + payload.cost_usd);
    }
}

/// Everything one invocation needs, with builder-style setters.
#[derive(Debug, Clone)]
pub struct OrchestratorRequest {
    pub question: String,
    /// Prior conversation context; empty means none.
    pub thread_summary: String,
    /// Provider name to API key.
    pub user_api_keys: HashMap<String, String>,
    pub stages: Vec<StageSpec>,
    pub synth_model: String,
    pub budget: Budget,
    pub use_llm_gate: bool,
    pub gate_model: String,
    pub execution: ExecutionConfig,
}

impl OrchestratorRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            thread_summary: String::new(),
            user_api_keys: HashMap::new(),
            stages: Vec::new(),
            synth_model: "openai:gpt-4o-mini".to_string(),
            budget: Budget::default(),
            use_llm_gate: false,
            gate_model: "openai:gpt-4o-mini".to_string(),
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_thread_summary(mut self, summary: impl Into<String>) -> Self {
        self.thread_summary = summary.into();
        self
    }

    pub fn with_api_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.user_api_keys.insert(provider.into(), key.into());
        self
    }

    pub fn with_stages(mut self, stages: Vec<StageSpec>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_synth_model(mut self, model: impl Into<String>) -> Self {
        self.synth_model = model.into();
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Enable the LLM gate override on the given `"<provider>:<model>"`.
    pub fn with_llm_gate(mut self, gate_model: impl Into<String>) -> Self {
        self.use_llm_gate = true;
        self.gate_model = gate_model.into();
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// Assembled outcome of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResult {
    /// The answer to surface to the user. On configuration or synthesis
    /// failure this is a human-readable placeholder, never an error value.
    #[serde(rename = "final")]
    pub final_text: String,
    pub decision: GateDecision,
    /// Emitted stage outputs in ascending stage-index order.
    pub stages: Vec<StageResult>,
    /// Per-call usage keyed by stage name, plus the reserved `synth` and
    /// (when a refinement was adopted) `quality_refine` keys.
    pub usage: HashMap<String, UsagePayload>,
    pub quality: QualityReport,
    pub monitoring: MonitoringReport,
}

/// The pipeline driver. Holds the provider registry, the pricing table used
/// to impute costs, and the localizable placeholder texts.
pub struct Orchestrator {
    registry: ProviderRegistry,
    pricing: PricingTable,
    messages: PlaceholderMessages,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Driver with the built-in providers, pricing snapshot, and messages.
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::default(),
            pricing: PricingTable::default(),
            messages: PlaceholderMessages::default(),
        }
    }

    /// Replace the provider registry (tests inject scripted providers here).
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_messages(mut self, messages: PlaceholderMessages) -> Self {
        self.messages = messages;
        self
    }

    fn placeholder(
        &self,
        final_text: String,
        decision: GateDecision,
        monitoring: MonitoringReport,
    ) -> OrchestratorResult {
        OrchestratorResult {
            final_text,
            decision,
            stages: Vec::new(),
            usage: HashMap::new(),
            quality: QualityReport::default(),
            monitoring,
        }
    }

    /// Reject pipelines the driver cannot execute faithfully: too many
    /// stages, blank names, reserved names, duplicate names.
    fn validate_stages(&self, stages: &[StageSpec]) -> Option<String> {
        if stages.len() > MAX_PIPELINE_STAGES {
            return Some(self.messages.too_many(MAX_PIPELINE_STAGES));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for stage in stages {
            let name = stage.name.trim();
            if name.is_empty() || RESERVED_STAGE_NAMES.contains(&name) {
                return Some(self.messages.reserved_name(name));
            }
            if !seen.insert(stage.name.as_str()) {
                return Some(self.messages.duplicate_name(name));
            }
        }
        None
    }

    /// Answer one question through the configured pipeline.
    ///
    /// Never returns an error: every failure mode ends in a result whose
    /// `final_text` describes what happened.
    pub async fn run(&self, request: OrchestratorRequest) -> OrchestratorResult {
        let cfg = request.execution;
        let mut monitoring = MonitoringReport::new();
        let run_id = monitoring.run_id;

        log::info!(
            "run {}: question received, {} stage(s) configured",
            run_id,
            request.stages.len()
        );

        if request.stages.is_empty() {
            monitoring.decision_reason = "validation failed".to_string();
            return self.placeholder(
                self.messages.empty_pipeline.clone(),
                rule_based_gate(&request.question),
                monitoring,
            );
        }
        if let Some(text) = self.validate_stages(&request.stages) {
            monitoring.decision_reason = "validation failed".to_string();
            return self.placeholder(text, rule_based_gate(&request.question), monitoring);
        }

        // Gate: rule-based verdict first, then the optional LLM override.
        let mut decision = rule_based_gate(&request.question);
        let mut decision_reason = "rule-based gate".to_string();
        if request.use_llm_gate {
            let (gate_provider_name, gate_model_id) = split_model(&request.gate_model);
            let gate_key = request
                .user_api_keys
                .get(gate_provider_name)
                .filter(|k| !k.is_empty());
            if let (Some(gate_provider), Some(gate_key)) =
                (self.registry.get(gate_provider_name), gate_key)
            {
                let (gate_result, _) = call_with_resilience(
                    gate_provider.as_ref(),
                    gate_key,
                    gate_model_id,
                    prompts::GATE_SYSTEM,
                    &prompts::gate_user(&request.thread_summary, &request.question),
                    5,
                    &cfg,
                )
                .await;
                if let Some(result) = gate_result {
                    let verdict = result.text.to_uppercase();
                    if verdict.contains("MULTI") {
                        decision = GateDecision::Multi;
                        decision_reason = "llm gate => MULTI".to_string();
                    } else if verdict.contains("SIMPLE") {
                        decision = GateDecision::Simple;
                        decision_reason = "llm gate => SIMPLE".to_string();
                    }
                }
            }
        }
        monitoring.decision_reason = decision_reason;
        log::debug!("run {}: decision {} ({})", run_id, decision, monitoring.decision_reason);

        // The first stage anchors provider and key fallback for the rest of
        // the pipeline; without it nothing can run.
        let (first_provider_name, first_model) = split_model(&request.stages[0].model);
        let first_key = request
            .user_api_keys
            .get(first_provider_name)
            .cloned()
            .unwrap_or_default();
        let first_provider = match self.registry.get(first_provider_name) {
            Some(provider) if !first_key.is_empty() => provider,
            _ => {
                log::warn!(
                    "run {}: no usable credentials for provider {}",
                    run_id,
                    first_provider_name
                );
                return self.placeholder(
                    self.messages.missing_key(first_provider_name),
                    decision,
                    monitoring,
                );
            }
        };

        // Fast path: trivial questions and single-stage pipelines skip the
        // graph and the synthesis call entirely.
        if decision == GateDecision::Simple || request.stages.len() == 1 {
            let first = &request.stages[0];
            let (result, runtime) = call_with_resilience(
                first_provider.as_ref(),
                &first_key,
                first_model,
                &first.system_prompt,
                &prompts::build_stage_user_prompt(&request.question, &request.thread_summary, &[]),
                request.budget.max_tokens_per_stage,
                &cfg,
            )
            .await;

            let result = match result {
                Some(result) => result,
                None => {
                    let error = runtime
                        .error
                        .unwrap_or_else(|| "unknown error".to_string());
                    return self.placeholder(
                        self.messages.stage_failure(&first.name, &error),
                        decision,
                        monitoring,
                    );
                }
            };

            let payload = build_payload(&result, &runtime, &self.pricing);
            monitoring.record(&first.name, &payload);

            let stage_results = vec![StageResult {
                name: first.name.clone(),
                text: result.text.clone(),
            }];
            let quality = quality_matrix(&request.question, &result.text, &stage_results);
            let mut usage = HashMap::new();
            usage.insert(first.name.clone(), payload);

            return OrchestratorResult {
                final_text: result.text,
                decision,
                stages: stage_results,
                usage,
                quality,
                monitoring,
            };
        }

        // DAG path.
        let deps = if cfg.enable_dynamic_graph {
            infer_dependencies(&request.stages)
        } else {
            linear_chain(request.stages.len())
        };
        let levels = topology_levels(request.stages.len(), &deps);
        log::debug!("run {}: execution levels {:?}", run_id, levels);
        monitoring.graph_levels = levels.clone();

        let mut results_by_idx: BTreeMap<usize, StageResult> = BTreeMap::new();
        let mut usage: HashMap<String, UsagePayload> = HashMap::new();
        // Unrounded running cost for the guard comparison; the monitoring
        // total re-rounds after every addition.
        let mut total_cost = 0.0_f64;

        for level in &levels {
            let mut meta: Vec<(usize, String, String, String)> = Vec::new();
            let mut handles = Vec::new();

            for &idx in level {
                let stage = request.stages[idx].clone();
                let (provider_name, model_id) = split_model(&stage.model);
                // Unknown providers and missing keys fall back to the first
                // stage's provider and key.
                let provider = self
                    .registry
                    .get(provider_name)
                    .unwrap_or_else(|| Arc::clone(&first_provider));
                let key = request
                    .user_api_keys
                    .get(provider_name)
                    .filter(|k| !k.is_empty())
                    .cloned()
                    .unwrap_or_else(|| first_key.clone());

                let dep_results: Vec<StageResult> = deps
                    .get(&idx)
                    .map(|ds| {
                        ds.iter()
                            .filter_map(|d| results_by_idx.get(d).cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                let user_prompt = if idx == 0 {
                    prompts::build_stage_user_prompt(
                        &request.question,
                        &request.thread_summary,
                        &[],
                    )
                } else {
                    prompts::build_stage_user_prompt(&request.question, "", &dep_results)
                };

                meta.push((
                    idx,
                    stage.name.clone(),
                    provider_name.to_string(),
                    model_id.to_string(),
                ));
                let model_id = model_id.to_string();
                let max_tokens = request.budget.max_tokens_per_stage;
                handles.push(tokio::spawn(async move {
                    call_with_resilience(
                        provider.as_ref(),
                        &key,
                        &model_id,
                        &stage.system_prompt,
                        &user_prompt,
                        max_tokens,
                        &cfg,
                    )
                    .await
                }));
            }

            // Level barrier: install outcomes only after every task in the
            // level has settled.
            let outcomes = join_all(handles).await;
            for ((idx, name, provider_name, model_id), joined) in
                meta.into_iter().zip(outcomes)
            {
                let (result, runtime) = match joined {
                    Ok(pair) => pair,
                    Err(join_error) => (
                        None,
                        StageRuntime {
                            latency_ms: 0,
                            retries: 0,
                            status: CallStatus::Failed,
                            error: Some(format!("task join error: {}", join_error)),
                        },
                    ),
                };

                let result = result.unwrap_or_else(|| {
                    let error = runtime
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string());
                    log::warn!("run {}: stage {} degraded: {}", run_id, name, error);
                    LLMResult {
                        text: format!(
                            "[{} skipped due to transient failure]\nReason: {}",
                            name, error
                        ),
                        provider: provider_name,
                        model: model_id,
                        input_tokens: 0,
                        output_tokens: 0,
                        cost_usd: 0.0,
                    }
                });

                let payload = build_payload(&result, &runtime, &self.pricing);
                monitoring.record(&name, &payload);
                total_cost += payload.cost_usd;
                results_by_idx.insert(
                    idx,
                    StageResult {
                        name: name.clone(),
                        text: result.text,
                    },
                );
                usage.insert(name, payload);
            }

            if request.budget.max_usd > 0.0 && total_cost >= request.budget.max_usd {
                log::warn!(
                    "run {}: budget guard tripped at ${:.6}, skipping remaining levels",
                    run_id,
                    total_cost
                );
                monitoring.budget_guard_triggered = true;
                break;
            }
        }

        // Synthesis over everything that ran, in stage-index order.
        let ordered: Vec<StageResult> = results_by_idx.values().cloned().collect();
        let (synth_provider_name, synth_model_id) = split_model(&request.synth_model);
        let synth_provider = self
            .registry
            .get(synth_provider_name)
            .unwrap_or_else(|| Arc::clone(&first_provider));
        let synth_key = request
            .user_api_keys
            .get(synth_provider_name)
            .filter(|k| !k.is_empty())
            .cloned()
            .unwrap_or_else(|| first_key.clone());

        let (synth_result, synth_runtime) = call_with_resilience(
            synth_provider.as_ref(),
            &synth_key,
            synth_model_id,
            prompts::SYNTH_SYSTEM,
            &prompts::build_synth_user_prompt(&request.question, &ordered),
            request.budget.synth_max_tokens,
            &cfg,
        )
        .await;

        let synth_result = match synth_result {
            Some(result) => result,
            None => {
                let error = synth_runtime
                    .error
                    .unwrap_or_else(|| "unknown error".to_string());
                log::error!("run {}: synthesis failed: {}", run_id, error);
                return self.placeholder(self.messages.synth_failure(&error), decision, monitoring);
            }
        };

        let synth_payload = build_payload(&synth_result, &synth_runtime, &self.pricing);
        monitoring.record("synth", &synth_payload);
        usage.insert("synth".to_string(), synth_payload);

        let mut final_text = synth_result.text;
        let mut quality = quality_matrix(&request.question, &final_text, &ordered);
        let mut refined = false;

        if cfg.enable_quality_matrix
            && cfg.auto_refine_once
            && quality.min_axis() < cfg.quality_min_threshold
        {
            log::debug!(
                "run {}: weakest quality axis {:.1} below {:.1}, attempting refine",
                run_id,
                quality.min_axis(),
                cfg.quality_min_threshold
            );
            let (refine_result, refine_runtime) = call_with_resilience(
                synth_provider.as_ref(),
                &synth_key,
                synth_model_id,
                prompts::QUALITY_REFINE_SYSTEM,
                &prompts::refine_user(&request.question, &final_text, &quality),
                request.budget.synth_max_tokens,
                &cfg,
            )
            .await;

            // A failed or empty refinement is discarded silently; the
            // original synthesis stands.
            if let Some(candidate) = refine_result {
                if !candidate.text.trim().is_empty() {
                    let candidate_quality =
                        quality_matrix(&request.question, &candidate.text, &ordered);
                    if candidate_quality.overall >= quality.overall {
                        let refine_payload =
                            build_payload(&candidate, &refine_runtime, &self.pricing);
                        monitoring.record("quality_refine", &refine_payload);
                        usage.insert("quality_refine".to_string(), refine_payload);
                        final_text = candidate.text;
                        quality = candidate_quality;
                        refined = true;
                    }
                }
            }
        }
        quality.refined = refined;

        log::info!(
            "run {}: complete, {} stage(s) emitted, total cost ${:.6}",
            run_id,
            ordered.len(),
            monitoring.total_cost_usd
        );

        OrchestratorResult {
            final_text,
            decision,
            stages: ordered,
            usage,
            quality,
            monitoring,
        }
    }
}
