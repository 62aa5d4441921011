//! Plan structuring, stage selection and replanning.

use tracing::{debug, info, warn};

use crate::completion::{CompletionProfile, TextCompletion};
use crate::config::WorkflowLimits;
use crate::extract::{leading_chars, parse_stages};
use crate::graph::decision::RECENT_FEEDBACK_WINDOW;
use crate::model::{PlanStructure, StageDescriptor, StudySessionState, UserLevel};

/// Gaps listed in the plan prompt.
const PROMPT_GAPS: usize = 5;

/// Characters of the replanning suggestion kept in the feedback log.
const REPLAN_PREVIEW_CHARS: usize = 100;

pub fn plan_prompt(state: &StudySessionState) -> String {
    let topic = &state.topic;
    let areas = state
        .knowledge_gaps
        .iter()
        .take(PROMPT_GAPS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Create a structured learning roadmap for: \"{topic}\"\n\
         \n\
         User level: {level}\n\
         Knowledge areas to cover: {areas}\n\
         \n\
         HARD CONSTRAINTS:\n\
         1. Create between 3 and 7 stages depending on the complexity of the topic\n\
         2. Each stage MUST start with \"Stage N:\" where N is 1 to 7\n\
         3. Do not nest numbered lists under the objectives; use \"-\" bullets only\n\
         4. Do not create phases, levels or sections; only numbered stages 1-7\n\
         5. Progress from beginner to advanced material\n\
         \n\
         Use this EXACT format:\n\
         \n\
         Stage 1: Fundamentals of [Topic]\n\
         Description: [what will be learned, 1-2 sentences]\n\
         Duration: 4 weeks\n\
         Prerequisites: None\n\
         Objectives:\n\
         - Objective 1\n\
         - Objective 2\n\
         \n\
         Stage 2: Intermediate [Topic]\n\
         Description: [what will be learned, 1-2 sentences]\n\
         Duration: 6 weeks\n\
         Prerequisites: Fundamentals\n\
         Objectives:\n\
         - Objective 1\n\
         - Objective 2",
        level = state.level(),
    )
}

/// The fixed plan used when no stage can be parsed: three stages for
/// beginners, two otherwise.
pub fn default_plan(topic: &str, level: UserLevel) -> PlanStructure {
    fn stage(description: String, duration: &str, prerequisite: &str, objectives: &[&str]) -> StageDescriptor {
        StageDescriptor {
            description,
            duration: duration.to_string(),
            prerequisites: vec![prerequisite.to_string()],
            objectives: objectives.iter().map(|o| o.to_string()).collect(),
        }
    }

    let mut plan = PlanStructure::new();
    match level {
        UserLevel::Beginner => {
            plan.insert(
                format!("Fundamentals of {topic}"),
                stage(
                    format!("Introduction to basic concepts of {topic}"),
                    "4 weeks",
                    "None",
                    &["Understand core concepts", "Build foundation"],
                ),
            );
            plan.insert(
                format!("Intermediate {topic}"),
                stage(
                    format!("Deeper dive into {topic} topics"),
                    "6 weeks",
                    "Fundamentals",
                    &["Apply concepts", "Solve intermediate problems"],
                ),
            );
            plan.insert(
                format!("Advanced {topic}"),
                stage(
                    format!("Advanced topics and applications in {topic}"),
                    "8 weeks",
                    "Intermediate knowledge",
                    &["Master advanced concepts", "Complete projects"],
                ),
            );
        }
        UserLevel::Intermediate | UserLevel::Advanced => {
            plan.insert(
                format!("Core {topic}"),
                stage(
                    format!("Essential concepts in {topic}"),
                    "6 weeks",
                    "Basic knowledge",
                    &["Consolidate understanding"],
                ),
            );
            plan.insert(
                format!("Advanced {topic}"),
                stage(
                    "Advanced and specialized topics".to_string(),
                    "8 weeks",
                    "Core knowledge",
                    &["Expert-level mastery"],
                ),
            );
        }
    }
    plan
}

/// Ask for a staged roadmap and parse it, falling back to [`default_plan`].
pub async fn structure_plan(completion: &dyn TextCompletion, state: &mut StudySessionState) {
    debug!(topic = %state.topic, "structuring plan");
    let prompt = plan_prompt(state);

    let parsed = match CompletionProfile::PLAN_STRUCTURING
        .complete(completion, &prompt)
        .await
    {
        Ok(text) => {
            let plan = parse_stages(&text);
            if plan.is_empty() {
                warn!("no stages found in plan response; using default plan");
            }
            plan
        }
        Err(e) => {
            warn!(collaborator = completion.name(), error = %e, "plan structuring failed; using default plan");
            PlanStructure::new()
        }
    };

    state.plan = if parsed.is_empty() {
        default_plan(&state.topic, state.level())
    } else {
        parsed
    };
    state.plan_refinement_iterations += 1;
    info!(
        stages = state.plan.len(),
        iteration = state.plan_refinement_iterations,
        "plan structured"
    );
}

/// Select the first stage still short of books and not yet exhausted.
///
/// The book-search counter restarts only when the selection changes.
pub fn select_stage(state: &mut StudySessionState, limits: &WorkflowLimits) {
    let next = state
        .under_covered_stages(limits.min_books_per_stage)
        .into_iter()
        .find(|stage| !state.is_exhausted(stage))
        .map(str::to_string);

    match next {
        Some(stage) => {
            if state.current_stage.as_deref() != Some(stage.as_str()) {
                state.book_search_iterations = 0;
                info!(stage = %stage, "selected new stage");
            } else {
                debug!(stage = %stage, iteration = state.book_search_iterations, "continuing with stage");
            }
            state.current_stage = Some(stage);
        }
        None => {
            state.current_stage = None;
            state.all_stages_covered = state.every_stage_covered(limits.min_books_per_stage);
            info!(covered = state.all_stages_covered, "no stage left to research");
        }
    }
}

pub fn replan_prompt(state: &StudySessionState) -> String {
    let stages = state.plan.names().collect::<Vec<_>>().join(", ");
    let feedback = state.recent_feedback(RECENT_FEEDBACK_WINDOW).join("\n");
    let counts = state
        .plan
        .names()
        .map(|stage| format!("{stage}: {} books", state.book_count(stage)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "The learning plan for \"{topic}\" needs refinement.\n\
         \n\
         Current plan stages:\n\
         {stages}\n\
         \n\
         Validation feedback:\n\
         {feedback}\n\
         \n\
         Books found per stage:\n\
         {counts}\n\
         \n\
         Suggest improvements:\n\
         1. Should any stages be merged or split?\n\
         2. Are stages missing?\n\
         3. Should the order change?\n\
         4. Are the stage names clear and logical?\n\
         \n\
         Give specific restructuring recommendations.",
        topic = state.topic,
    )
}

/// Record restructuring suggestions and reopen under-covered stages for
/// another search round.
///
/// Suggestions are logged, not applied to the plan.
pub async fn replan(completion: &dyn TextCompletion, state: &mut StudySessionState, limits: &WorkflowLimits) {
    debug!(iteration = state.plan_refinement_iterations, "replanning");
    let prompt = replan_prompt(state);
    let response = CompletionProfile::REPLANNING.complete(completion, &prompt).await;

    state.plan_refinement_iterations += 1;
    let n = state.plan_refinement_iterations;
    match response {
        Ok(text) => {
            state.validation_feedback.push(format!(
                "Replanning #{n}: {}",
                leading_chars(&text, REPLAN_PREVIEW_CHARS)
            ));
        }
        Err(e) => {
            warn!(collaborator = completion.name(), error = %e, "replanning failed; reopening stages anyway");
            state
                .validation_feedback
                .push(format!("Replanning #{n}: no suggestions (collaborator unavailable)"));
        }
    }

    let reopened: Vec<String> = state
        .under_covered_stages(limits.min_books_per_stage)
        .into_iter()
        .map(str::to_string)
        .collect();
    for stage in &reopened {
        state.books_by_stage.remove(stage);
        state.exhausted_stages.remove(stage);
    }
    state.current_stage = None;
    state.all_stages_covered = false;
    info!(iteration = n, reopened = reopened.len(), "plan refined");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookRecord;

    fn planned_state(stages: &[(&str, usize)]) -> StudySessionState {
        let mut state = StudySessionState::new("Algorithms", None, 4.0);
        for (name, count) in stages {
            state.plan.insert(*name, StageDescriptor::empty());
            if *count > 0 {
                state.books_by_stage.insert(
                    name.to_string(),
                    (0..*count).map(|i| BookRecord::new(format!("b{i}"))).collect(),
                );
            }
        }
        state
    }

    #[test]
    fn default_plan_by_level() {
        let beginner = default_plan("Go", UserLevel::Beginner);
        assert_eq!(
            beginner.names().collect::<Vec<_>>(),
            vec!["Fundamentals of Go", "Intermediate Go", "Advanced Go"]
        );
        assert_eq!(beginner.total_weeks(), 18);
        assert_eq!(
            beginner.get("Fundamentals of Go").unwrap().prerequisites,
            vec!["None"]
        );

        let advanced = default_plan("Go", UserLevel::Advanced);
        assert_eq!(
            advanced.names().collect::<Vec<_>>(),
            vec!["Core Go", "Advanced Go"]
        );
        assert_eq!(
            advanced.get("Advanced Go").unwrap().description,
            "Advanced and specialized topics"
        );
    }

    #[test]
    fn plan_prompt_lists_first_five_gaps_and_level() {
        let mut state = planned_state(&[]);
        state.user_level = Some(UserLevel::Intermediate);
        state.knowledge_gaps = (1..=7).map(|i| format!("gap{i}")).collect();
        let prompt = plan_prompt(&state);
        assert!(prompt.contains("User level: intermediate"));
        assert!(prompt.contains("gap1, gap2, gap3, gap4, gap5\n"));
        assert!(!prompt.contains("gap6"));
    }

    #[test]
    fn selection_resets_counter_only_on_change() {
        let limits = WorkflowLimits::default();
        let mut state = planned_state(&[("A", 0), ("B", 0)]);

        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage.as_deref(), Some("A"));
        state.book_search_iterations = 2;

        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage.as_deref(), Some("A"));
        assert_eq!(state.book_search_iterations, 2);

        state
            .books_by_stage
            .insert("A".into(), vec![BookRecord::new("x"), BookRecord::new("y")]);
        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage.as_deref(), Some("B"));
        assert_eq!(state.book_search_iterations, 0);
    }

    #[test]
    fn selection_skips_exhausted_stages() {
        let limits = WorkflowLimits::default();
        let mut state = planned_state(&[("A", 0), ("B", 2), ("C", 1)]);
        state.exhausted_stages.insert("A".into());

        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage.as_deref(), Some("C"));

        state.exhausted_stages.insert("C".into());
        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage, None);
        assert!(!state.all_stages_covered);
    }

    #[test]
    fn selection_marks_full_coverage() {
        let limits = WorkflowLimits::default();
        let mut state = planned_state(&[("A", 2), ("B", 3)]);
        state.current_stage = Some("B".into());

        select_stage(&mut state, &limits);
        assert_eq!(state.current_stage, None);
        assert!(state.all_stages_covered);
    }

    #[test]
    fn replan_prompt_summarizes_plan() {
        let mut state = planned_state(&[("A", 2), ("B", 0)]);
        state.validation_feedback = vec!["old".into(), "f1".into(), "f2".into(), "f3".into()];
        let prompt = replan_prompt(&state);
        assert!(prompt.contains("A, B"));
        assert!(prompt.contains("f1\nf2\nf3"));
        assert!(!prompt.contains("old"));
        assert!(prompt.contains("A: 2 books, B: 0 books"));
    }
}
