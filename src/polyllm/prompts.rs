//! System-prompt constants and user-prompt assembly.
//!
//! The exact wording and whitespace of the assembled prompts is part of the
//! pipeline's observable behavior (stage outputs are quoted back to later
//! stages verbatim), so the builders here are kept byte-stable and covered by
//! tests.

use crate::polyllm::orchestrator::{StageResult, StageSpec};
use crate::polyllm::quality::QualityReport;

/// Default system prompt for an answering stage.
pub const SOLVER_SYSTEM: &str = "You are Solver. Provide the best answer with short assumptions and actionable steps. Keep it concise. Always reply in the same language as the question.";

/// Default system prompt for a critique stage.
pub const CRITIC_SYSTEM: &str = "You are Critic. Attack weaknesses, missing edge cases, and risks in the previous answer. Keep it short and specific. Always reply in the same language as the question.";

/// Default system prompt for a consistency-checking stage.
pub const CHECKER_SYSTEM: &str = "You are Checker. Verify logical consistency of all previous answers and propose minimal fixes. Keep it short. Always reply in the same language as the question.";

/// System prompt for the synthesis call.
pub const SYNTH_SYSTEM: &str = "You are Synthesizer. Produce a single final answer that addresses critiques. Be actionable. Mention uncertainty if needed. Always reply in the same language as the question.";

/// System prompt for the optional refine call.
pub const QUALITY_REFINE_SYSTEM: &str = "You are Quality Refiner. Improve answer quality using this matrix: accuracy, completeness, consistency, format. Keep the answer concise, faithful, and actionable. Always reply in the same language as the question.";

/// System prompt for the LLM gate.
pub const GATE_SYSTEM: &str = "You are a cost-aware router. Decide whether this needs multi-model debate.";

/// The classic three-stage preset: Solver answers, Critic attacks, Checker
/// verifies. All three run on `model`.
pub fn default_pipeline(model: &str) -> Vec<StageSpec> {
    vec![
        StageSpec::new("Solver", SOLVER_SYSTEM, model),
        StageSpec::new("Critic", CRITIC_SYSTEM, model),
        StageSpec::new("Checker", CHECKER_SYSTEM, model),
    ]
}

/// User prompt for the LLM gate call.
pub fn gate_user(summary: &str, question: &str) -> String {
    format!(
        "Thread summary:\n{}\n\nDecide whether this needs multi-model debate.\nReturn only one word: SIMPLE or MULTI.\n\nQuestion: {}\n",
        summary, question
    )
}

/// User prompt for one pipeline stage.
///
/// Without previous results the prompt carries the question and, when
/// non-empty, the thread summary. With previous results the summary is
/// omitted and each dependency's `name:` block is appended in dependency
/// order.
pub fn build_stage_user_prompt(
    question: &str,
    thread_summary: &str,
    prev_results: &[StageResult],
) -> String {
    if prev_results.is_empty() {
        let mut out = String::new();
        if !thread_summary.is_empty() {
            out.push_str("Thread context:\n");
            out.push_str(thread_summary);
            out.push_str("\n\n");
        }
        out.push_str("Question: ");
        out.push_str(question);
        return out;
    }

    let mut out = format!("Question: {}\n\n", question);
    for result in prev_results {
        out.push_str(&result.name);
        out.push_str(":\n");
        out.push_str(&result.text);
        out.push_str("\n\n");
    }
    // One trailing newline after the last block.
    out.pop();
    out
}

/// User prompt for the synthesis call: the question, every emitted stage
/// block in index order, and the closing `Final answer:` sentinel.
pub fn build_synth_user_prompt(question: &str, stage_results: &[StageResult]) -> String {
    let mut out = format!("Q: {}\n\n", question);
    for result in stage_results {
        out.push_str(&result.name);
        out.push_str(":\n");
        out.push_str(&result.text);
        out.push_str("\n\n");
    }
    out.push_str("Final answer:");
    out
}

/// User prompt for the refine call: question, current answer, and the scores
/// that triggered the pass.
pub fn refine_user(question: &str, current_answer: &str, quality: &QualityReport) -> String {
    format!(
        "Question:\n{}\n\nCurrent answer:\n{}\n\nQuality scores:\naccuracy={:.1}, completeness={:.1}, consistency={:.1}, format={:.1}, overall={:.2}\n\nImprove weak dimensions while keeping facts conservative and format clean.",
        question,
        current_answer,
        quality.accuracy,
        quality.completeness,
        quality.consistency,
        quality.format,
        quality.overall
    )
}
