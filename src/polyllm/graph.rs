//! Dependency inference and level-wise topological scheduling.
//!
//! Dependencies between stages are inferred from prose hints in each stage's
//! system prompt, so the result can be wrong in every way prose can be wrong,
//! including cycles. The scheduler therefore carries a cycle guard that
//! breaks ties deterministically instead of refusing to run.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::polyllm::orchestrator::StageSpec;

/// Phrases that pull in every earlier stage.
const ALL_PREVIOUS_HINTS: &[&str] = &[
    "all previous",
    "all prior",
    "모든 이전",
    "앞선",
    "이전 단계 전체",
    "all outputs",
];

/// Phrases that opt a stage out of the implicit chain.
const INDEPENDENT_HINTS: &[&str] = &["independent", "standalone", "질문만", "독립적으로"];

/// Stage names shorter than this are never matched as prompt references;
/// one- and two-character names collide with ordinary words too easily.
const MIN_NAME_REFERENCE_LEN: usize = 3;

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

/// Derive the dependency map for an ordered stage list.
///
/// For each stage after the first: an "all previous" hint depends on every
/// earlier stage; otherwise earlier stage names mentioned in the prompt
/// become explicit dependencies; otherwise the stage chains onto its
/// predecessor unless it declares itself independent.
pub fn infer_dependencies(stages: &[StageSpec]) -> HashMap<usize, Vec<usize>> {
    let mut deps: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, stage) in stages.iter().enumerate() {
        if idx == 0 {
            deps.insert(idx, Vec::new());
            continue;
        }

        let prompt = stage.system_prompt.to_lowercase();
        let all_prev = contains_any(&prompt, ALL_PREVIOUS_HINTS);
        let independent = contains_any(&prompt, INDEPENDENT_HINTS);

        let mut current: BTreeSet<usize> = BTreeSet::new();
        if all_prev {
            current.extend(0..idx);
        } else {
            for (prev_idx, prev_stage) in stages.iter().enumerate().take(idx) {
                let prev_name = prev_stage.name.trim().to_lowercase();
                if prev_name.chars().count() >= MIN_NAME_REFERENCE_LEN
                    && prompt.contains(&prev_name)
                {
                    current.insert(prev_idx);
                }
            }
            if current.is_empty() && !independent {
                current.insert(idx - 1);
            }
        }
        deps.insert(idx, current.into_iter().collect());
    }
    deps
}

/// The strict linear chain used when dynamic graph inference is disabled:
/// every stage depends on its predecessor only.
pub fn linear_chain(num_stages: usize) -> HashMap<usize, Vec<usize>> {
    let mut deps = HashMap::new();
    for idx in 0..num_stages {
        deps.insert(idx, if idx == 0 { Vec::new() } else { vec![idx - 1] });
    }
    deps
}

/// Partition node indices into parallel execution levels.
///
/// Every dependency of a node in level `k` sits in some level before `k`.
/// Nodes within a level are sorted for deterministic output. When no node is
/// ready (a cycle), the smallest remaining index is forced into the next
/// level so the scheduler always terminates.
pub fn topology_levels(num_nodes: usize, deps: &HashMap<usize, Vec<usize>>) -> Vec<Vec<usize>> {
    let mut remaining: BTreeSet<usize> = (0..num_nodes).collect();
    let mut done: HashSet<usize> = HashSet::new();
    let mut levels: Vec<Vec<usize>> = Vec::new();

    while !remaining.is_empty() {
        let mut ready: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|i| {
                deps.get(i)
                    .map(|ds| ds.iter().all(|d| done.contains(d)))
                    .unwrap_or(true)
            })
            .collect();
        if ready.is_empty() {
            // Cycle guard: force progress in deterministic order.
            if let Some(&min) = remaining.iter().next() {
                ready.push(min);
            }
        }
        for i in &ready {
            remaining.remove(i);
            done.insert(*i);
        }
        levels.push(ready);
    }
    levels
}
