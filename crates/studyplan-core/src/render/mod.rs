//! Plain-text rendering of the finished study plan.

use crate::extract::leading_chars;
use crate::model::{BookRecord, StageDescriptor, StudySessionState};

const WIDTH: usize = 80;

/// Characters of a book's reason shown in the document.
pub const REASON_CHARS: usize = 150;

/// Banner placed above documents produced after a limit was reached.
pub const FORCED_OUTPUT_DISCLAIMER: &str = "
!!! WARNING !!!
This plan was generated with limited resources because the search or
validation limits were reached. Some stages may have fewer books than
recommended.
Consider supplementing it with a manual search for additional resources.
";

/// Render the document for a completed session.
pub fn render_document(state: &StudySessionState) -> String {
    let heavy = "=".repeat(WIDTH);
    let light = "-".repeat(WIDTH);
    let plan = &state.plan;
    let weeks = plan.total_weeks();

    let mut lines = vec![
        heavy.clone(),
        format!("STUDY PLAN: {}", state.topic.to_uppercase()),
        heavy.clone(),
        String::new(),
        format!("Level: {}", capitalize(&state.level().to_string())),
        format!("Total stages: {}", plan.len()),
        String::new(),
        format!("Estimated total duration: {weeks} weeks ({} months)", weeks / 4),
        String::new(),
        light.clone(),
        "\nLEARNING ROADMAP".to_string(),
        light.clone(),
    ];

    for (i, (name, stage)) in plan.iter().enumerate() {
        lines.push(format!("\n{}. {name}", i + 1));
        lines.push(format!("   Duration: {}", stage.duration));
        lines.push(format!(
            "   Resources: {} recommended books",
            state.book_count(name)
        ));
    }
    lines.push(format!("\n{heavy}"));

    for (i, (name, stage)) in plan.iter().enumerate() {
        lines.push(format!("\n\nSTAGE {}: {name}", i + 1));
        lines.push(heavy.clone());
        render_stage(&mut lines, stage);
        render_books(&mut lines, state.books_for(name));
        lines.push(light.clone());
    }

    lines.extend([
        "\n\nFINAL ADVICE".to_string(),
        heavy.clone(),
        "- Follow the stages in order for steady progress".to_string(),
        "- Pair the books with practice and projects".to_string(),
        "- Adjust the pace to the time you have available".to_string(),
        "- Look for communities and forums to resolve questions".to_string(),
        String::new(),
        "Generated by studyplan".to_string(),
        heavy,
    ]);
    lines.join("\n")
}

/// Render the document with [`FORCED_OUTPUT_DISCLAIMER`] on top.
pub fn render_forced_document(state: &StudySessionState) -> String {
    format!("{FORCED_OUTPUT_DISCLAIMER}{}", render_document(state))
}

fn render_stage(lines: &mut Vec<String>, stage: &StageDescriptor) {
    lines.push("\nDescription:".to_string());
    lines.push(format!("  {}", stage.description));
    lines.push(format!("\nEstimated duration: {}", stage.duration));

    let prerequisites = &stage.prerequisites;
    if !prerequisites.is_empty() && !(prerequisites.len() == 1 && prerequisites[0] == "None") {
        lines.push("\nPrerequisites:".to_string());
        lines.extend(prerequisites.iter().map(|p| format!("  - {p}")));
    }

    if !stage.objectives.is_empty() {
        lines.push("\nLearning objectives:".to_string());
        lines.extend(
            stage
                .objectives
                .iter()
                .take(StageDescriptor::MAX_DISPLAYED_OBJECTIVES)
                .map(|o| format!("  - {o}")),
        );
    }
}

fn render_books(lines: &mut Vec<String>, books: &[BookRecord]) {
    if books.is_empty() {
        lines.push("\n! No books found for this stage".to_string());
        return;
    }
    lines.push(format!("\nRecommended books ({}):", books.len()));
    lines.push(String::new());
    for (j, book) in books.iter().enumerate() {
        lines.push(format!("  {}. \"{}\"", j + 1, book.title));
        lines.push(format!("     Author: {}", book.author));
        if let Some(year) = &book.year {
            lines.push(format!("     Year: {year}"));
        }
        lines.push(format!(
            "     Rating: {:.1}/5.0 ({} reviews)",
            book.rating, book.review_count
        ));
        lines.push(format!(
            "     Why: {}",
            leading_chars(&book.reason, REASON_CHARS)
        ));
        lines.push(String::new());
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserLevel;

    fn sample_state() -> StudySessionState {
        let mut state = StudySessionState::new("Algorithms", Some(UserLevel::Intermediate), 4.0);
        state.plan.insert(
            "Foundations",
            StageDescriptor {
                description: "Core ideas".into(),
                duration: "1 month".into(),
                prerequisites: vec!["None".into()],
                objectives: (1..=7).map(|i| format!("Objective {i}")).collect(),
            },
        );
        state.plan.insert(
            "Graphs",
            StageDescriptor {
                description: "Traversals".into(),
                duration: "6 weeks".into(),
                prerequisites: vec!["Foundations".into(), "Discrete math".into()],
                objectives: vec![],
            },
        );
        state.books_by_stage.insert(
            "Foundations".into(),
            vec![BookRecord {
                title: "Grokking Algorithms".into(),
                author: "Aditya Bhargava".into(),
                year: Some("2016".into()),
                rating: 4.44,
                review_count: 3210,
                reason: "x".repeat(200),
            }],
        );
        state
    }

    #[test]
    fn header_and_roadmap() {
        let doc = render_document(&sample_state());
        assert!(doc.starts_with(&"=".repeat(80)));
        assert!(doc.contains("STUDY PLAN: ALGORITHMS"));
        assert!(doc.contains("Level: Intermediate"));
        assert!(doc.contains("Total stages: 2"));
        assert!(doc.contains("Estimated total duration: 10 weeks (2 months)"));
        assert!(doc.contains("\n1. Foundations\n   Duration: 1 month\n   Resources: 1 recommended books"));
        assert!(doc.contains("\n2. Graphs"));
    }

    #[test]
    fn stage_sections() {
        let doc = render_document(&sample_state());
        assert!(doc.contains("STAGE 1: Foundations"));
        assert!(doc.contains("Objective 5"));
        assert!(!doc.contains("Objective 6"));
        assert!(doc.contains("  - Discrete math"));
        // A lone "None" prerequisite is not listed.
        assert_eq!(doc.matches("\nPrerequisites:").count(), 1);
        assert!(doc.contains("! No books found for this stage"));
    }

    #[test]
    fn book_entries() {
        let doc = render_document(&sample_state());
        assert!(doc.contains("  1. \"Grokking Algorithms\""));
        assert!(doc.contains("     Author: Aditya Bhargava"));
        assert!(doc.contains("     Year: 2016"));
        assert!(doc.contains("     Rating: 4.4/5.0 (3210 reviews)"));
        assert!(doc.contains(&format!("     Why: {}\n", "x".repeat(150))));
        assert!(!doc.contains(&"x".repeat(151)));
    }

    #[test]
    fn forced_document_leads_with_disclaimer() {
        let state = sample_state();
        let forced = render_forced_document(&state);
        assert!(forced.starts_with(FORCED_OUTPUT_DISCLAIMER));
        assert!(forced.ends_with(&render_document(&state)));
        assert!(!render_document(&state).contains("WARNING"));
    }
}
