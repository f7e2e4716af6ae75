//! Heuristic four-axis scoring of a final answer.
//!
//! The matrix is intentionally cheap and deterministic: word-overlap against
//! the question, length and structure cues, and contradiction markers. It is
//! a tie-breaking signal for the refine pass, not a judge of truth.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::polyllm::orchestrator::StageResult;

const CONTRADICTION_MARKERS: &[&str] = &[
    "but also not",
    "yes and no",
    "모순",
    "상충",
    "contradiction",
    "inconsistent",
];

const CHECKER_ALERTS: &[&str] = &["error", "모순", "inconsistent"];

/// Scores on the four axes plus their mean. Axes are clamped into `[0, 5]`
/// at one decimal; `overall` is the mean at two decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub accuracy: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub format: f64,
    pub overall: f64,
    /// True when a refine pass ran and its output was adopted.
    pub refined: bool,
}

impl QualityReport {
    /// The weakest axis, used to decide whether a refine pass is worth it.
    pub fn min_axis(&self) -> f64 {
        self.accuracy
            .min(self.completeness)
            .min(self.consistency)
            .min(self.format)
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_string())
        .collect()
}

fn clamp_axis(value: f64) -> f64 {
    (value.max(0.0).min(5.0) * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score `final_answer` against the question and the stage outputs that fed
/// it.
pub fn quality_matrix(
    question: &str,
    final_answer: &str,
    stage_results: &[StageResult],
) -> QualityReport {
    let q_words = word_set(question);
    let a_words = word_set(final_answer);
    let overlap = q_words.intersection(&a_words).count();
    let overlap_ratio = overlap as f64 / q_words.len().max(1) as f64;

    let answer_lower = final_answer.to_lowercase();

    let mut accuracy = 2.5 + (overlap_ratio * 2.0).min(2.0);
    if answer_lower.contains("uncertain") || answer_lower.contains("불확실") {
        accuracy -= 0.5;
    }

    let mut completeness = 2.0;
    if final_answer.chars().count() >= 220 {
        completeness += 1.5;
    }
    if overlap_ratio >= 0.25 {
        completeness += 1.0;
    }
    if overlap_ratio >= 0.45 {
        completeness += 0.5;
    }

    let mut consistency = 4.0;
    if CONTRADICTION_MARKERS.iter().any(|m| answer_lower.contains(m)) {
        consistency -= 1.5;
    }
    let checker_notes = stage_results
        .iter()
        .filter(|s| s.name.to_lowercase().contains("checker"))
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if CHECKER_ALERTS.iter().any(|m| checker_notes.contains(m)) {
        consistency -= 0.8;
    }

    let mut format_score = 2.5;
    if final_answer.contains("\n- ") || final_answer.contains("\n1.") {
        format_score += 1.0;
    }
    if final_answer
        .trim_end()
        .ends_with(|c| matches!(c, '.' | '!' | '?' | '다' | '요'))
    {
        format_score += 0.5;
    }
    if final_answer.lines().count() >= 3 {
        format_score += 0.5;
    }

    let accuracy = clamp_axis(accuracy);
    let completeness = clamp_axis(completeness);
    let consistency = clamp_axis(consistency);
    let format = clamp_axis(format_score);

    QualityReport {
        accuracy,
        completeness,
        consistency,
        format,
        overall: round2((accuracy + completeness + consistency + format) / 4.0),
        refined: false,
    }
}
