//! Global validation of the whole plan.

use tracing::{debug, info, warn};

use crate::completion::{CompletionProfile, TextCompletion};
use crate::extract::signals;
use crate::model::StudySessionState;

/// Score assumed when the response states none.
pub const DEFAULT_SCORE: u32 = 7;

/// Scores below this are recorded as a low-quality issue.
pub const LOW_SCORE: u32 = 6;

/// One summary line per stage: book count and mean rating.
pub fn plan_summary(state: &StudySessionState) -> Vec<String> {
    state
        .plan
        .names()
        .map(|stage| {
            let books = state.books_for(stage);
            let avg = if books.is_empty() {
                0.0
            } else {
                books.iter().map(|b| b.rating).sum::<f64>() / books.len() as f64
            };
            format!("- {stage}: {} books, avg rating: {avg:.1}", books.len())
        })
        .collect()
}

pub fn validation_prompt(state: &StudySessionState) -> String {
    format!(
        "Evaluate this learning plan for \"{topic}\":\n\
         \n\
         Plan structure:\n\
         {summary}\n\
         \n\
         Total stages: {stages}\n\
         User level: {level}\n\
         \n\
         Assess:\n\
         1. Coherence: do the stages build on each other logically?\n\
         2. Completeness: does this cover the topic thoroughly?\n\
         3. Balance: is difficulty well distributed?\n\
         4. Book quality: are there enough high-quality resources?\n\
         \n\
         Identify any critical problem that requires restructuring the plan.\n\
         Give a quality score from 1 to 10 and specific feedback.",
        topic = state.topic,
        summary = plan_summary(state).join("\n"),
        stages = state.plan.len(),
        level = state.level(),
    )
}

/// Ask for a quality score and record it, plus any issue markers, in the
/// feedback log.
pub async fn validate_plan(completion: &dyn TextCompletion, state: &mut StudySessionState) {
    debug!(stages = state.plan.len(), "validating plan");
    let prompt = validation_prompt(state);
    let response = CompletionProfile::GLOBAL_VALIDATION
        .complete(completion, &prompt)
        .await;

    state.validation_iterations += 1;
    let n = state.validation_iterations;

    match response {
        Ok(text) => {
            let score = signals::validation_score(&text).unwrap_or(DEFAULT_SCORE);
            let mut issues = Vec::new();
            if signals::reports_critical_issue(&text) {
                issues.push("Critical issues detected in plan structure".to_string());
            }
            if score < LOW_SCORE {
                issues.push(format!("Low quality score: {score}/10"));
            }

            state
                .validation_feedback
                .push(format!("Validation {n}: Score {score}/10"));
            info!(iteration = n, score, issues = issues.len(), "plan validated");
            state.validation_feedback.extend(issues);
        }
        Err(e) => {
            warn!(collaborator = completion.name(), error = %e, "plan validation failed");
            state
                .validation_feedback
                .push(format!("Validation {n}: Completed with warnings"));
        }
    }
}
