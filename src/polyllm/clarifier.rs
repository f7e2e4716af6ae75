//! Heuristic detection of under-specified requests.
//!
//! Before spending a whole pipeline run on a vague question, callers can ask
//! for an ambiguity score and a pair of follow-up questions to put to the
//! user. Scoring is additive over independent signals and capped at 1.0;
//! anything at or above [`NEEDS_CLARIFICATION_THRESHOLD`] is worth a
//! clarification round-trip.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Score at or above which a clarification round-trip is recommended.
pub const NEEDS_CLARIFICATION_THRESHOLD: f64 = 0.55;

const GOAL_HINTS: &[&str] = &[
    "implement", "fix", "compare", "plan", "design", "debug", "review", "구현", "수정", "비교",
    "계획", "설계", "디버그", "리뷰",
];

const FOLLOW_UP_QUESTIONS: &[&str] = &[
    "가장 중요한 목표 1가지를 먼저 알려주세요. (예: 속도 최적화, 정확도, 비용 절감)",
    "제약 조건을 알려주세요. (예: 시간, 예산, 기술 스택, 변경 가능 범위)",
    "원하는 출력 형식을 알려주세요. (예: 체크리스트, 코드 패치, 표, 단계별 가이드)",
];

lazy_static! {
    static ref DEICTIC_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(it|this|that|these|those)\b").expect("invalid deictic pattern"),
        Regex::new(r"(이거|그거|저거|이것|그것|저것|요거)").expect("invalid deictic pattern"),
    ];
    static ref FORMAT_HINT: Regex =
        Regex::new(r"\b(json|table|markdown|코드|문서|요약|리스트)\b").expect("invalid format pattern");
}

/// Ambiguity verdict for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationResult {
    /// Ambiguity score in `[0, 1]`, rounded to two decimals.
    pub score: f64,
    /// Up to three human-readable reasons the score was raised.
    pub reasons: Vec<String>,
    /// Exactly two follow-up questions to put to the user.
    pub questions: Vec<String>,
}

/// Score how much interpretation room a request leaves open.
pub fn analyze_request_clarity(question: &str) -> ClarificationResult {
    let q = question.trim();
    let q_lower = q.to_lowercase();
    let mut reasons: Vec<String> = Vec::new();
    let mut score: f64 = 0.0;

    if q.chars().count() < 20 {
        score += 0.35;
        reasons.push("요청이 짧아 목표/범위 해석 여지가 큽니다.".to_string());
    }

    if q.chars().filter(|c| *c == '?' || *c == '？').count() >= 2 {
        score += 0.15;
        reasons.push("질문이 복수 개라 우선순위가 모호합니다.".to_string());
    }

    if DEICTIC_PATTERNS.iter().any(|p| p.is_match(&q_lower)) {
        score += 0.25;
        reasons.push("지시어(이거/that 등)가 있어 대상이 불명확할 수 있습니다.".to_string());
    }

    if !GOAL_HINTS.iter().any(|h| q_lower.contains(h)) {
        score += 0.15;
        reasons.push("원하는 작업 유형(구현/비교/리뷰 등)이 명시되지 않았습니다.".to_string());
    }

    if !FORMAT_HINT.is_match(&q_lower) {
        score += 0.10;
        reasons.push("원하는 출력 형식이 명확하지 않습니다.".to_string());
    }

    let score = ((score * 100.0).round() / 100.0).min(1.0);
    reasons.truncate(3);

    ClarificationResult {
        score,
        reasons,
        questions: FOLLOW_UP_QUESTIONS[..2]
            .iter()
            .map(|q| q.to_string())
            .collect(),
    }
}
