//! Node handlers driven against scripted and failing collaborators.
//!
//! Covers what each node writes into the session state, how it recovers
//! from a failed completion, and which profile it asks the collaborator for.

use studyplan_core::config::WorkflowLimits;
use studyplan_core::model::{BookRecord, StageDescriptor, StudySessionState, UserLevel};
use studyplan_core::nodes::{analysis, planning, research, validation};
use studyplan_test_utils::{FIVE_GOOD_BOOKS, FailingCompletion, ScriptedCompletion};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn session(topic: &str) -> StudySessionState {
    StudySessionState::new(topic, Some(UserLevel::Beginner), 4.0)
}

fn with_stages(topic: &str, stages: &[(&str, usize)]) -> StudySessionState {
    let mut state = session(topic);
    for (name, count) in stages {
        state.plan.insert(*name, StageDescriptor::empty());
        if *count > 0 {
            state.books_by_stage.insert(
                name.to_string(),
                (0..*count)
                    .map(|i| BookRecord {
                        rating: 4.5,
                        review_count: 500,
                        ..BookRecord::new(format!("{name} book {i}"))
                    })
                    .collect(),
            );
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analysis_extracts_gap_lines() {
    let completion = ScriptedCompletion::constant(
        "Key areas: sorting, graphs\n  A common gap is recursion  \nLearners lack proof practice\nDynamic programming",
    );
    let mut state = session("Algorithms");
    analysis::analyze_topic(&completion, &mut state).await;

    assert_eq!(
        state.knowledge_gaps,
        vec!["A common gap is recursion", "Learners lack proof practice"]
    );
    assert_eq!(state.validation_feedback.len(), 1);
    assert!(state.validation_feedback[0].starts_with("Initial analysis: Key areas"));
    assert!(state.validation_feedback[0].ends_with("..."));

    let calls = completion.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].temperature, 0.7);
    assert!(!calls[0].search_enabled);
}

#[tokio::test]
async fn analysis_without_gaps_uses_synthetic_gap() {
    let completion = ScriptedCompletion::constant("Sorting, searching and graphs.");
    let mut state = session("Algorithms");
    analysis::analyze_topic(&completion, &mut state).await;
    assert_eq!(state.knowledge_gaps, vec!["Complete coverage of Algorithms"]);
}

#[tokio::test]
async fn analysis_failure_falls_back_to_level_gaps() {
    let completion = FailingCompletion::new();
    let mut state = session("Algorithms");
    analysis::analyze_topic(&completion, &mut state).await;

    assert_eq!(
        state.knowledge_gaps,
        vec![
            "Foundational Algorithms",
            "Intermediate Algorithms",
            "Advanced Algorithms"
        ]
    );
    assert!(state.validation_feedback.is_empty());
    assert_eq!(completion.call_count(), 1);
}

#[tokio::test]
async fn analysis_preview_is_bounded() {
    let long = "x".repeat(1_000);
    let completion = ScriptedCompletion::constant(long);
    let mut state = session("Algorithms");
    analysis::analyze_topic(&completion, &mut state).await;

    let entry = &state.validation_feedback[0];
    assert_eq!(entry.len(), "Initial analysis: ".len() + 200 + "...".len());
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unparseable_plan_falls_back_to_default() {
    let completion = ScriptedCompletion::constant("Just read some books.");
    let mut state = session("Go");
    planning::structure_plan(&completion, &mut state).await;

    assert_eq!(
        state.plan.names().collect::<Vec<_>>(),
        vec!["Fundamentals of Go", "Intermediate Go", "Advanced Go"]
    );
    assert_eq!(state.plan_refinement_iterations, 1);
}

#[tokio::test]
async fn parsed_plan_replaces_state_plan() {
    let completion = ScriptedCompletion::constant(
        "Stage 1: Syntax\nDuration: 2 weeks\n\nPhase 2: Concurrency\nDuration: 1 month\n",
    );
    let mut state = session("Go");
    state.user_level = Some(UserLevel::Intermediate);
    planning::structure_plan(&completion, &mut state).await;

    assert_eq!(
        state.plan.names().collect::<Vec<_>>(),
        vec!["Syntax", "Concurrency"]
    );
    assert_eq!(state.plan.total_weeks(), 6);
    assert!(completion.calls()[0].prompt.contains("User level: intermediate"));
}

#[tokio::test]
async fn replan_records_suggestion_and_reopens_stages() {
    let completion = ScriptedCompletion::constant("Merge the first two stages.");
    let limits = WorkflowLimits::default();
    let mut state = with_stages("Algorithms", &[("A", 3), ("B", 1), ("C", 0)]);
    state.plan_refinement_iterations = 1;
    state.exhausted_stages.insert("B".into());
    state.exhausted_stages.insert("C".into());
    state.current_stage = Some("C".into());
    state.all_stages_covered = true;

    planning::replan(&completion, &mut state, &limits).await;

    assert_eq!(state.plan_refinement_iterations, 2);
    assert_eq!(
        state.validation_feedback.last().map(String::as_str),
        Some("Replanning #2: Merge the first two stages.")
    );
    assert_eq!(state.book_count("A"), 3, "covered stages keep their books");
    assert!(!state.books_by_stage.contains_key("B"));
    assert!(state.exhausted_stages.is_empty());
    assert_eq!(state.current_stage, None);
    assert!(!state.all_stages_covered);
    assert_eq!(completion.calls()[0].temperature, 0.6);
}

#[tokio::test]
async fn replan_failure_still_reopens_stages() {
    let completion = FailingCompletion::new();
    let limits = WorkflowLimits::default();
    let mut state = with_stages("Algorithms", &[("A", 0)]);
    state.plan_refinement_iterations = 1;
    state.exhausted_stages.insert("A".into());

    planning::replan(&completion, &mut state, &limits).await;

    assert_eq!(state.plan_refinement_iterations, 2);
    assert_eq!(
        state.validation_feedback.last().map(String::as_str),
        Some("Replanning #2: no suggestions (collaborator unavailable)")
    );
    assert!(!state.is_exhausted("A"));
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

#[tokio::test]
async fn research_stores_candidates_for_selected_stage() {
    let completion = ScriptedCompletion::constant(FIVE_GOOD_BOOKS);
    let mut state = with_stages("Algorithms", &[("Sorting", 0)]);
    state.current_stage = Some("Sorting".into());

    research::research_books(&completion, &mut state, 0.9).await;

    assert_eq!(state.book_candidates["Sorting"].len(), 5);
    assert_eq!(state.book_search_iterations, 1);
    let call = &completion.calls()[0];
    assert!(call.search_enabled);
    assert_eq!(call.temperature, 0.9);
}

#[tokio::test]
async fn research_failure_still_counts_the_attempt() {
    let completion = FailingCompletion::new();
    let mut state = with_stages("Algorithms", &[("Sorting", 0)]);
    state.current_stage = Some("Sorting".into());

    research::research_books(&completion, &mut state, 1.0).await;

    assert_eq!(state.book_search_iterations, 1);
    assert!(state.book_candidates["Sorting"].is_empty());
}

#[tokio::test]
async fn research_without_stage_makes_no_call() {
    let completion = ScriptedCompletion::constant(FIVE_GOOD_BOOKS);
    let mut state = with_stages("Algorithms", &[("Sorting", 0)]);

    research::research_books(&completion, &mut state, 1.0).await;

    assert_eq!(completion.call_count(), 0);
    assert_eq!(state.book_search_iterations, 0);
}

#[tokio::test]
async fn retry_prompt_quotes_gaps_for_the_stage() {
    let completion = ScriptedCompletion::constant("nothing");
    let limits = WorkflowLimits::default();
    let mut state = with_stages("Algorithms", &[("Sorting", 0)]);
    state.current_stage = Some("Sorting".into());

    research::research_books(&completion, &mut state, 1.0).await;
    research::validate_quality(&mut state, &limits);
    research::detect_gaps(&mut state, &limits);
    research::research_books(&completion, &mut state, 1.0).await;

    let calls = completion.calls();
    assert!(!calls[0].prompt.contains("previous search"));
    assert!(calls[1].prompt.contains("- Stage 'Sorting' needs more books (currently 0)"));
}

// ---------------------------------------------------------------------------
// Global validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_records_score_and_issues() {
    let completion = ScriptedCompletion::constant("Score: 4. There is a critical ordering flaw.");
    let mut state = with_stages("Algorithms", &[("A", 2)]);

    validation::validate_plan(&completion, &mut state).await;

    assert_eq!(state.validation_iterations, 1);
    assert_eq!(
        state.validation_feedback,
        vec![
            "Validation 1: Score 4/10",
            "Critical issues detected in plan structure",
            "Low quality score: 4/10",
        ]
    );
    let call = &completion.calls()[0];
    assert_eq!(call.temperature, 0.5);
    assert!(call.prompt.contains("- A: 2 books, avg rating: 4.5"));
}

#[tokio::test]
async fn validation_without_score_assumes_seven() {
    let completion = ScriptedCompletion::constant("Looks coherent.");
    let mut state = with_stages("Algorithms", &[("A", 2)]);

    validation::validate_plan(&completion, &mut state).await;

    assert_eq!(state.validation_feedback, vec!["Validation 1: Score 7/10"]);
}

#[tokio::test]
async fn validation_failure_is_recorded_as_warning() {
    let completion = FailingCompletion::new();
    let mut state = with_stages("Algorithms", &[("A", 2)]);
    state.validation_iterations = 2;

    validation::validate_plan(&completion, &mut state).await;

    assert_eq!(state.validation_iterations, 3);
    assert_eq!(
        state.validation_feedback,
        vec!["Validation 3: Completed with warnings"]
    );
}
