//! Topic analysis and level evaluation.

use tracing::{debug, info, warn};

use crate::completion::{CompletionProfile, TextCompletion};
use crate::extract::{leading_chars, signals};
use crate::model::{StudySessionState, UserLevel};

/// Characters of the analysis kept in the feedback log.
const ANALYSIS_PREVIEW_CHARS: usize = 200;

const ADVANCED_GAP_WORDS: [&str; 3] = ["advanced", "complex", "expert"];

pub fn analysis_prompt(topic: &str) -> String {
    format!(
        "Analyze the learning topic: \"{topic}\"\n\
         \n\
         Provide a thorough analysis covering:\n\
         \n\
         1. Main knowledge areas: list 4-7 key areas or subtopics this topic spans\n\
         2. Potential prerequisites: what prior knowledge should learners have?\n\
         3. Fundamental concepts: what are the core concepts for beginners?\n\
         4. Intermediate concepts: what builds on the fundamentals?\n\
         5. Advanced concepts: what are the most complex topics in this field?\n\
         6. Knowledge gaps to address: what gaps commonly block understanding of this topic?\n\
         \n\
         Give a structured analysis that will help build a complete learning roadmap."
    )
}

/// Ask for a breakdown of the topic and record the knowledge gaps it names.
///
/// Falls back to one synthetic gap when the analysis names none, and to
/// three level-named gaps when the collaborator fails.
pub async fn analyze_topic(completion: &dyn TextCompletion, state: &mut StudySessionState) {
    debug!(topic = %state.topic, "analyzing topic");
    let prompt = analysis_prompt(&state.topic);

    match CompletionProfile::ANALYSIS.complete(completion, &prompt).await {
        Ok(text) => {
            let mut gaps = signals::gap_lines(&text);
            if gaps.is_empty() {
                gaps.push(format!("Complete coverage of {}", state.topic));
            }
            state.knowledge_gaps = gaps;
            state.validation_feedback.push(format!(
                "Initial analysis: {}...",
                leading_chars(&text, ANALYSIS_PREVIEW_CHARS)
            ));
            info!(gaps = state.knowledge_gaps.len(), "topic analyzed");
        }
        Err(e) => {
            warn!(collaborator = completion.name(), error = %e, "topic analysis failed; using default gaps");
            let topic = &state.topic;
            state.knowledge_gaps = vec![
                format!("Foundational {topic}"),
                format!("Intermediate {topic}"),
                format!("Advanced {topic}"),
            ];
        }
    }
}

/// Normalize the user level and narrow the gaps to ones that suit it.
///
/// Beginners keep every gap. Intermediate learners drop foundational gaps.
/// Advanced learners keep only advanced, complex or expert gaps.
pub fn evaluate_level(state: &mut StudySessionState) {
    let level = state.user_level.unwrap_or_default();
    state.user_level = Some(level);

    match level {
        UserLevel::Beginner => {}
        UserLevel::Intermediate => {
            state
                .knowledge_gaps
                .retain(|gap| !gap.to_lowercase().contains("foundational"));
        }
        UserLevel::Advanced => {
            state.knowledge_gaps.retain(|gap| {
                let lower = gap.to_lowercase();
                ADVANCED_GAP_WORDS.iter().any(|w| lower.contains(w))
            });
        }
    }
    info!(level = %level, gaps = state.knowledge_gaps.len(), "level evaluated");
}
