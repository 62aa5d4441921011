//! Tunable workflow limits and completion settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits that bound every retry cycle in the workflow.
///
/// Deserializes from a partial table; absent fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowLimits {
    pub max_book_searches_per_stage: u32,
    pub max_validation_cycles: u32,
    pub max_plan_refinements: u32,
    pub min_books_per_stage: usize,
    pub quality_threshold: f64,
    pub max_books_per_stage: usize,
    /// Ceiling on total node executions per session.
    pub max_steps: usize,
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            max_book_searches_per_stage: 3,
            max_validation_cycles: 5,
            max_plan_refinements: 2,
            min_books_per_stage: 2,
            quality_threshold: 4.0,
            max_books_per_stage: 5,
            max_steps: 100,
        }
    }
}

/// How the command-backed completion collaborator is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Executable that reads a prompt on stdin and writes a completion.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Passed to the command as `STUDYPLAN_MODEL`.
    pub model: Option<String>,
    /// Temperature for the search-augmented book research calls.
    pub search_temperature: f64,
}

impl CompletionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: 120,
            model: None,
            search_temperature: 1.0,
        }
    }
}
