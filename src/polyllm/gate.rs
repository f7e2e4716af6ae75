//! SIMPLE/MULTI routing for incoming questions.
//!
//! The rule-based classifier is deliberately conservative: only unmistakable
//! greetings and small-talk short-circuit to a single stage, everything else
//! runs the full pipeline. An optional LLM gate may override the rule-based
//! decision; that call lives in the orchestrator because it needs a provider
//! and resilience around it.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref SIMPLE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)^(안녕|hi|hello|hey|ㅎㅇ|하이)[!?.\s]*$").expect("invalid gate pattern"),
        Regex::new(r"(?i)^(고마워|감사|thank)[!?.\s]*$").expect("invalid gate pattern"),
        Regex::new(r"(?i)^(몇\s*시|what\s*time|오늘\s*날씨)[^가-힣a-z]*$")
            .expect("invalid gate pattern"),
    ];
}

/// Routing verdict for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateDecision {
    /// Trivial question: answer with the first stage only.
    Simple,
    /// Run the full multi-stage pipeline.
    Multi,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Simple => write!(f, "SIMPLE"),
            GateDecision::Multi => write!(f, "MULTI"),
        }
    }
}

/// Classify a question by length and small-talk patterns.
///
/// SIMPLE only when the trimmed question is under 20 characters and matches
/// one of the greeting/small-talk patterns; everything else is MULTI.
pub fn rule_based_gate(question: &str) -> GateDecision {
    let q = question.trim();
    if q.chars().count() < 20 && SIMPLE_PATTERNS.iter().any(|p| p.is_match(q)) {
        return GateDecision::Simple;
    }
    GateDecision::Multi
}
