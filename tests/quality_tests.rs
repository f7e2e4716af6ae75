use polyllm::orchestrator::StageResult;
use polyllm::quality::quality_matrix;

fn stage(name: &str, text: &str) -> StageResult {
    StageResult {
        name: name.to_string(),
        text: text.to_string(),
    }
}

#[test]
fn all_axes_in_range() {
    let q = quality_matrix("Explain Redis caching strategy.", "Redis is fast.", &[]);
    for (axis, value) in [
        ("accuracy", q.accuracy),
        ("completeness", q.completeness),
        ("consistency", q.consistency),
        ("format", q.format),
    ] {
        assert!((0.0..=5.0).contains(&value), "{} out of range: {}", axis, value);
    }
}

#[test]
fn overall_is_mean_of_axes_to_two_decimals() {
    let q = quality_matrix("What is Python?", "Python is a programming language.", &[]);
    let expected =
        ((q.accuracy + q.completeness + q.consistency + q.format) / 4.0 * 100.0).round() / 100.0;
    assert_eq!(q.overall, expected);
}

#[test]
fn long_answer_scores_higher_completeness() {
    let short = "Python is good.";
    let long = "Python is a high-level, interpreted programming language known for \
                its readability and versatility. It supports multiple paradigms including \
                object-oriented, functional, and procedural. It is widely used in data \
                science, web development, and automation scripting.";
    let q_short = quality_matrix("What is Python?", short, &[]);
    let q_long = quality_matrix("What is Python?", long, &[]);
    assert!(q_long.completeness >= q_short.completeness);
}

#[test]
fn uncertain_keyword_reduces_accuracy() {
    let certain = "Python is a high level programming language used widely.";
    let uncertain = "Python is uncertain as a high level language honestly.";
    let q_c = quality_matrix("What is Python?", certain, &[]);
    let q_u = quality_matrix("What is Python?", uncertain, &[]);
    assert!(q_u.accuracy < q_c.accuracy);
}

#[test]
fn korean_uncertainty_marker_reduces_accuracy() {
    let q_plain = quality_matrix("질문?", "명확한 답변입니다.", &[]);
    let q_hedged = quality_matrix("질문?", "불확실 하지만 답변입니다.", &[]);
    assert!(q_hedged.accuracy < q_plain.accuracy);
}

#[test]
fn contradiction_marker_reduces_consistency() {
    let normal = "Python is great for data science applications.";
    let contradicted = "Python is great but also not suitable for any tasks and inconsistent.";
    let q_n = quality_matrix("Python?", normal, &[]);
    let q_c = quality_matrix("Python?", contradicted, &[]);
    assert!(q_c.consistency < q_n.consistency);
}

#[test]
fn checker_error_notes_reduce_consistency() {
    let with_error = [stage("checker", "Found error in logic step 3.")];
    let clean = [stage("checker", "All checks passed.")];
    let q_err = quality_matrix("Q?", "Answer.", &with_error);
    let q_clean = quality_matrix("Q?", "Answer.", &clean);
    assert!(q_err.consistency < q_clean.consistency);
}

#[test]
fn checker_match_on_name_is_case_insensitive() {
    let with_error = [stage("Consistency-Checker", "inconsistent conclusion found")];
    let q = quality_matrix("Q?", "Answer.", &with_error);
    assert!(q.consistency < 4.0);
}

#[test]
fn non_checker_stage_errors_do_not_affect_consistency() {
    let noisy_solver = [stage("Solver", "error error error")];
    let q = quality_matrix("Q?", "Answer.", &noisy_solver);
    assert_eq!(q.consistency, 4.0);
}

#[test]
fn bullet_list_improves_format() {
    let plain = "First do A. Then do B. Then do C.";
    let listed = "Steps:\n- Do A\n- Do B\n- Do C";
    let q_p = quality_matrix("How to do it?", plain, &[]);
    let q_l = quality_matrix("How to do it?", listed, &[]);
    assert!(q_l.format >= q_p.format);
}

#[test]
fn numbered_list_improves_format() {
    let answer = "Here are the steps:\n1. Install Python\n2. Create a virtualenv\n3. Install packages";
    let q = quality_matrix("How to setup Python?", answer, &[]);
    assert!(q.format > 2.5);
}

#[test]
fn proper_ending_improves_format() {
    let ends_well = "This is the final answer.";
    let ends_badly = "This is the final answer";
    let q_w = quality_matrix("Q?", ends_well, &[]);
    let q_b = quality_matrix("Q?", ends_badly, &[]);
    assert!(q_w.format >= q_b.format);
}

#[test]
fn korean_sentence_ending_counts() {
    let q = quality_matrix("질문?", "답변입니다", &[]);
    assert!(q.format >= 3.0);
}

#[test]
fn overlap_ratio_improves_completeness() {
    let question = "explain python caching implementation strategies";
    let high_overlap = "python caching implementation can use several strategies \
                        like redis memcached or local dict based explain each";
    let low_overlap = "There are many ways to speed things up in software.";
    let q_high = quality_matrix(question, high_overlap, &[]);
    let q_low = quality_matrix(question, low_overlap, &[]);
    assert!(q_high.completeness >= q_low.completeness);
}

#[test]
fn empty_answer_stays_in_range() {
    let q = quality_matrix("What is Python?", "", &[]);
    assert!(q.overall >= 0.0);
    assert!(!q.refined);
}

#[test]
fn min_axis_returns_the_weakest_score() {
    let q = quality_matrix("Explain caching.", "ok", &[]);
    assert_eq!(q.min_axis(), 2.0); // completeness floor for a bare answer
}
