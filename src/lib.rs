// src/lib.rs

// Import the top-level `polyllm` module.
pub mod polyllm;

// Re-export the submodules at the crate root so callers write
// polyllm::orchestrator::... instead of polyllm::polyllm::orchestrator::...
pub use polyllm::{
    clarifier, config, gate, graph, orchestrator, prompts, provider, providers, quality,
    resilience, usage,
};

// Re-exporting key items for easier external access.
pub use polyllm::config::{Budget, ExecutionConfig, PlaceholderMessages};
pub use polyllm::gate::GateDecision;
pub use polyllm::orchestrator::{Orchestrator, OrchestratorRequest, OrchestratorResult, StageSpec};
pub use polyllm::provider::{LLMResult, Provider, ProviderError, ProviderRegistry};
pub use polyllm::quality::QualityReport;
pub use polyllm::usage::PricingTable;
