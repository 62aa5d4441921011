//! Book research, quality filtering and gap detection for the selected
//! stage.

use tracing::{debug, info, warn};

use crate::completion::{CompletionProfile, TextCompletion};
use crate::config::WorkflowLimits;
use crate::extract::parse_books;
use crate::model::StudySessionState;
use crate::scoring::QualityFilter;

/// Books requested per search.
pub const BOOKS_PER_SEARCH: usize = 5;

/// Stage gaps quoted in a targeted retry prompt.
const TARGETED_GAPS: usize = 3;

/// A finalized book rated below this marks the stage as weak.
pub const LOW_RATING: f64 = 3.8;

/// A book with fewer reviews than this counts as thinly reviewed.
pub const MIN_REVIEWS: u64 = 50;

pub fn research_prompt(state: &StudySessionState, stage: &str) -> String {
    let mut prompt = format!(
        "List the {BOOKS_PER_SEARCH} best books for learning {stage} in {topic}.\n\
         \n\
         For EACH book use exactly this format:\n\
         \n\
         Title: [exact book title]\n\
         Author: [author name]\n\
         Year: [publication year]\n\
         Rating: [rating out of 5, e.g. 4.5]\n\
         Reviews: [number of reviews, e.g. 1200]\n\
         Why: [one-sentence reason]\n\
         \n\
         ---\n\
         \n\
         Make sure all {BOOKS_PER_SEARCH} books have complete information.",
        topic = state.topic,
    );

    if state.book_search_iterations > 0 {
        let stage_lower = stage.to_lowercase();
        let targeted: Vec<&str> = state
            .knowledge_gaps
            .iter()
            .filter(|gap| gap.to_lowercase().contains(&stage_lower))
            .take(TARGETED_GAPS)
            .map(String::as_str)
            .collect();
        if !targeted.is_empty() {
            prompt.push_str("\n\nA previous search left these problems; prefer books that fix them:\n");
            for gap in targeted {
                prompt.push_str(&format!("- {gap}\n"));
            }
        }
    }
    prompt
}

/// Search for candidate books for the selected stage.
///
/// The book-search counter advances even when the search fails.
pub async fn research_books(completion: &dyn TextCompletion, state: &mut StudySessionState, search_temperature: f64) {
    let Some(stage) = state.current_stage.clone() else {
        debug!("no stage selected; skipping research");
        return;
    };
    debug!(stage = %stage, iteration = state.book_search_iterations, "researching books");

    let prompt = research_prompt(state, &stage);
    let candidates = match CompletionProfile::search(search_temperature)
        .complete(completion, &prompt)
        .await
    {
        Ok(text) => parse_books(&text),
        Err(e) => {
            warn!(stage = %stage, collaborator = completion.name(), error = %e, "book search failed");
            Vec::new()
        }
    };

    info!(stage = %stage, candidates = candidates.len(), "book candidates found");
    state.book_candidates.insert(stage, candidates);
    state.book_search_iterations += 1;
}

/// Filter the selected stage's candidates and store the best of them.
pub fn validate_quality(state: &mut StudySessionState, limits: &WorkflowLimits) {
    let Some(stage) = state.current_stage.clone() else {
        return;
    };
    let candidates = state
        .book_candidates
        .get(&stage)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let filter = QualityFilter::new(
        state.quality_threshold,
        limits.min_books_per_stage,
        limits.max_books_per_stage,
    );
    let outcome = filter.apply(candidates);
    if outcome.relaxed {
        debug!(stage = %stage, threshold = outcome.applied_threshold, "relaxed quality threshold");
    }
    info!(
        stage = %stage,
        kept = outcome.books.len(),
        threshold = outcome.applied_threshold,
        "books validated"
    );
    state.books_by_stage.insert(stage, outcome.books);
}

/// Append gaps describing weaknesses in the selected stage's books, and mark
/// the stage exhausted once its search budget is spent without enough books.
pub fn detect_gaps(state: &mut StudySessionState, limits: &WorkflowLimits) {
    let Some(stage) = state.current_stage.clone() else {
        return;
    };
    let books = state.books_for(&stage);
    let count = books.len();
    let mut found = Vec::new();

    if count < limits.min_books_per_stage {
        found.push(format!("Stage '{stage}' needs more books (currently {count})"));
    }
    if books.iter().any(|b| b.rating < LOW_RATING) {
        found.push(format!("Some books in '{stage}' have low ratings"));
    }
    let thin = books.iter().filter(|b| b.review_count < MIN_REVIEWS).count();
    if thin > count / 2 {
        found.push(format!("Many books in '{stage}' lack enough reviews"));
    }

    if !found.is_empty() {
        info!(stage = %stage, gaps = found.len(), "coverage gaps detected");
    }
    state.knowledge_gaps.extend(found);

    if state.book_search_iterations >= limits.max_book_searches_per_stage
        && count < limits.min_books_per_stage
    {
        warn!(stage = %stage, books = count, "search budget spent; stage stays under-covered");
        state.exhausted_stages.insert(stage);
    }
}
