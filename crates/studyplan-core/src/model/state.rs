//! The single mutable aggregate threaded through every workflow node.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{BookRecord, PlanStructure, UserLevel};

/// Session state shared by all nodes.
///
/// Created once per session with zeroed counters and empty collections,
/// mutated in place by one node at a time, and dropped once a terminal node
/// has produced the final document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySessionState {
    pub topic: String,
    /// `None` until level evaluation normalizes it.
    pub user_level: Option<UserLevel>,
    pub knowledge_gaps: Vec<String>,
    pub plan: PlanStructure,
    /// Finalized books per stage, best score first.
    pub books_by_stage: BTreeMap<String, Vec<BookRecord>>,
    /// Unfiltered research results per stage.
    pub book_candidates: BTreeMap<String, Vec<BookRecord>>,
    pub book_search_iterations: u32,
    pub validation_iterations: u32,
    pub plan_refinement_iterations: u32,
    pub quality_threshold: f64,
    pub current_stage: Option<String>,
    pub all_stages_covered: bool,
    /// Stages whose search budget ran out while still under-covered.
    pub exhausted_stages: BTreeSet<String>,
    pub validation_feedback: Vec<String>,
    pub final_output: Option<String>,
    /// Node executions so far, maintained by the executor.
    #[serde(default)]
    pub steps_taken: usize,
}

impl StudySessionState {
    pub fn new(topic: impl Into<String>, user_level: Option<UserLevel>, quality_threshold: f64) -> Self {
        Self {
            topic: topic.into(),
            user_level,
            knowledge_gaps: Vec::new(),
            plan: PlanStructure::new(),
            books_by_stage: BTreeMap::new(),
            book_candidates: BTreeMap::new(),
            book_search_iterations: 0,
            validation_iterations: 0,
            plan_refinement_iterations: 0,
            quality_threshold,
            current_stage: None,
            all_stages_covered: false,
            exhausted_stages: BTreeSet::new(),
            validation_feedback: Vec::new(),
            final_output: None,
            steps_taken: 0,
        }
    }

    /// The user level, treating an unset level as beginner.
    pub fn level(&self) -> UserLevel {
        self.user_level.unwrap_or_default()
    }

    /// Finalized books for `stage`, empty when none were recorded.
    pub fn books_for(&self, stage: &str) -> &[BookRecord] {
        self.books_by_stage
            .get(stage)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn book_count(&self, stage: &str) -> usize {
        self.books_for(stage).len()
    }

    /// Plan stages holding fewer than `min_books` finalized books, in plan
    /// order.
    pub fn under_covered_stages(&self, min_books: usize) -> Vec<&str> {
        self.plan
            .names()
            .filter(|name| self.book_count(name) < min_books)
            .collect()
    }

    /// Whether every plan stage holds at least `min_books` books.
    pub fn every_stage_covered(&self, min_books: usize) -> bool {
        self.under_covered_stages(min_books).is_empty()
    }

    pub fn is_exhausted(&self, stage: &str) -> bool {
        self.exhausted_stages.contains(stage)
    }

    /// The last `n` feedback entries, oldest first.
    pub fn recent_feedback(&self, n: usize) -> &[String] {
        let start = self.validation_feedback.len().saturating_sub(n);
        &self.validation_feedback[start..]
    }

    /// Record the final document. A second call replaces the first and is
    /// logged, since each terminal path should set it exactly once.
    pub fn set_final_output(&mut self, document: String) {
        if self.final_output.replace(document).is_some() {
            tracing::warn!(topic = %self.topic, "final output was already set; replacing it");
        }
    }
}
