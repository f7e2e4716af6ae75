use polyllm::graph::{infer_dependencies, linear_chain, topology_levels};
use polyllm::StageSpec;
use std::collections::HashMap;

fn stage(name: &str, prompt: &str) -> StageSpec {
    StageSpec::new(name, prompt, "openai:gpt-4o-mini")
}

fn deps_of(pairs: &[(usize, &[usize])]) -> HashMap<usize, Vec<usize>> {
    pairs.iter().map(|(k, v)| (*k, v.to_vec())).collect()
}

#[test]
fn single_stage_has_no_deps() {
    let deps = infer_dependencies(&[stage("Solver", "")]);
    assert_eq!(deps[&0], Vec::<usize>::new());
}

#[test]
fn sequential_chain_by_default() {
    let deps = infer_dependencies(&[
        stage("Solver", "Answer the question."),
        stage("Critic", "Critique the answer."),
        stage("Finalizer", "Combine everything."),
    ]);
    assert_eq!(deps[&0], Vec::<usize>::new());
    assert_eq!(deps[&1], vec![0]);
    assert_eq!(deps[&2], vec![1]);
}

#[test]
fn all_previous_keyword_pulls_in_every_earlier_stage() {
    let deps = infer_dependencies(&[
        stage("A", "Answer."),
        stage("B", "Check."),
        stage("C", "Use all previous outputs to synthesize."),
    ]);
    assert_eq!(deps[&2], vec![0, 1]);
}

#[test]
fn korean_all_previous_keyword() {
    let deps = infer_dependencies(&[
        stage("A", "답변."),
        stage("B", "검증."),
        stage("C", "모든 이전 단계를 참조해서 최종 답변 작성."),
    ]);
    assert_eq!(deps[&2], vec![0, 1]);
}

#[test]
fn independent_keyword_yields_empty_deps() {
    let deps = infer_dependencies(&[
        stage("A", "Answer."),
        stage("B", "Independent analysis of the question only."),
    ]);
    // Independent stages get no implicit chain, and the one-letter name "a"
    // must not be substring-matched inside words like "analysis".
    assert_eq!(deps[&1], Vec::<usize>::new());
}

#[test]
fn name_reference_in_prompt_becomes_dependency() {
    let deps = infer_dependencies(&[
        stage("solver", "Answer."),
        stage("critic", "Check."),
        stage("Refiner", "Take solver output and improve it."),
    ]);
    assert!(deps[&2].contains(&0));
}

#[test]
fn name_reference_is_case_insensitive() {
    let deps = infer_dependencies(&[
        stage("Solver", "Answer."),
        stage("Reviewer", "Review what SOLVER produced."),
    ]);
    assert_eq!(deps[&1], vec![0]);
}

#[test]
fn first_stage_deps_always_empty() {
    let deps = infer_dependencies(&[stage("A", "all previous outputs")]);
    assert_eq!(deps[&0], Vec::<usize>::new());
}

#[test]
fn linear_chain_shape() {
    let deps = linear_chain(3);
    assert_eq!(deps[&0], Vec::<usize>::new());
    assert_eq!(deps[&1], vec![0]);
    assert_eq!(deps[&2], vec![1]);
}

#[test]
fn levels_linear_chain() {
    let deps = deps_of(&[(0, &[]), (1, &[0]), (2, &[1])]);
    assert_eq!(topology_levels(3, &deps), vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn levels_all_independent_run_together() {
    let deps = deps_of(&[(0, &[]), (1, &[]), (2, &[])]);
    assert_eq!(topology_levels(3, &deps), vec![vec![0, 1, 2]]);
}

#[test]
fn levels_diamond_pattern() {
    let deps = deps_of(&[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2])]);
    let levels = topology_levels(4, &deps);
    assert_eq!(levels[0], vec![0]);
    assert_eq!(levels[1], vec![1, 2]);
    assert_eq!(levels[2], vec![3]);
}

#[test]
fn levels_single_node() {
    let deps = deps_of(&[(0, &[])]);
    assert_eq!(topology_levels(1, &deps), vec![vec![0]]);
}

#[test]
fn cycle_guard_terminates_and_covers_all_nodes() {
    let deps = deps_of(&[(0, &[1]), (1, &[0])]);
    let levels = topology_levels(2, &deps);
    let total: usize = levels.iter().map(|l| l.len()).sum();
    assert_eq!(total, 2);
}

#[test]
fn levels_partition_the_node_set() {
    let deps = deps_of(&[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2]), (4, &[3])]);
    let levels = topology_levels(5, &deps);
    let mut all: Vec<usize> = levels.iter().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all, vec![0, 1, 2, 3, 4]);
}

#[test]
fn every_dependency_lands_in_an_earlier_level() {
    let stages = vec![
        stage("Solver", "Answer."),
        stage("Critic", "Critique all previous outputs."),
        stage("Checker", "Independent standalone review."),
        stage("Refiner", "Improve using solver and checker notes."),
    ];
    let deps = infer_dependencies(&stages);
    let levels = topology_levels(stages.len(), &deps);

    let mut level_of: HashMap<usize, usize> = HashMap::new();
    for (level_idx, level) in levels.iter().enumerate() {
        for node in level {
            assert!(
                level_of.insert(*node, level_idx).is_none(),
                "node {} appears twice",
                node
            );
        }
    }
    assert_eq!(level_of.len(), stages.len());
    for (node, node_deps) in &deps {
        for dep in node_deps {
            assert!(
                level_of[dep] < level_of[node],
                "dep {} of node {} not in an earlier level",
                dep,
                node
            );
        }
    }
}

#[test]
fn missing_dep_entry_treated_as_ready() {
    // A sparse map without entries for every node must not wedge the loop.
    let deps = deps_of(&[(1, &[0])]);
    let levels = topology_levels(2, &deps);
    assert_eq!(levels, vec![vec![0], vec![1]]);
}
