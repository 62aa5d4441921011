//! Routing decisions evaluated after specific nodes.
//!
//! Each function checks its rules strictly in order; the first match wins.
//! Only the deterministic counter and threshold logic lives here. The
//! keyword heuristics come from [`crate::extract::signals`].

use std::fmt;

use crate::config::WorkflowLimits;
use crate::extract::signals;
use crate::model::StudySessionState;

/// Feedback entries inspected by the validation decision.
pub const RECENT_FEEDBACK_WINDOW: usize = 3;

/// Outcome of the book-search decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSearchDecision {
    /// Search budget spent; keep whatever was found.
    AcceptCurrent,
    RetryGeneral,
    /// Retry with the stage's open gaps in the prompt.
    RetrySpecific,
    Sufficient,
}

/// Outcome of the coverage decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageDecision {
    NextStage,
    ValidateGlobally,
}

/// Outcome of the validation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationDecision {
    ForceOutput,
    Replan,
    FormatOutput,
}

/// Which decision function a branch evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    BookSearch,
    Coverage,
    Validation,
}

/// Any decision's outcome, as stored in the edge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    BookSearch(BookSearchDecision),
    Coverage(CoverageDecision),
    Validation(ValidationDecision),
}

impl Decision {
    /// Every outcome this decision can produce.
    pub fn outcomes(self) -> &'static [Outcome] {
        match self {
            Self::BookSearch => &[
                Outcome::BookSearch(BookSearchDecision::AcceptCurrent),
                Outcome::BookSearch(BookSearchDecision::RetryGeneral),
                Outcome::BookSearch(BookSearchDecision::RetrySpecific),
                Outcome::BookSearch(BookSearchDecision::Sufficient),
            ],
            Self::Coverage => &[
                Outcome::Coverage(CoverageDecision::NextStage),
                Outcome::Coverage(CoverageDecision::ValidateGlobally),
            ],
            Self::Validation => &[
                Outcome::Validation(ValidationDecision::ForceOutput),
                Outcome::Validation(ValidationDecision::Replan),
                Outcome::Validation(ValidationDecision::FormatOutput),
            ],
        }
    }

    /// Run the decision function against `state`.
    pub fn evaluate(self, state: &mut StudySessionState, limits: &WorkflowLimits) -> Outcome {
        match self {
            Self::BookSearch => Outcome::BookSearch(book_search_decision(state, limits)),
            Self::Coverage => Outcome::Coverage(coverage_decision(state, limits)),
            Self::Validation => Outcome::Validation(validation_decision(state, limits)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BookSearch => "book_search",
            Self::Coverage => "coverage",
            Self::Validation => "validation",
        }
    }
}

impl Outcome {
    /// The decision that produces this outcome.
    pub fn decision(self) -> Decision {
        match self {
            Self::BookSearch(_) => Decision::BookSearch,
            Self::Coverage(_) => Decision::Coverage,
            Self::Validation(_) => Decision::Validation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BookSearch(BookSearchDecision::AcceptCurrent) => "accept_current",
            Self::BookSearch(BookSearchDecision::RetryGeneral) => "retry_general",
            Self::BookSearch(BookSearchDecision::RetrySpecific) => "retry_specific",
            Self::BookSearch(BookSearchDecision::Sufficient) => "sufficient",
            Self::Coverage(CoverageDecision::NextStage) => "next_stage",
            Self::Coverage(CoverageDecision::ValidateGlobally) => "validate_globally",
            Self::Validation(ValidationDecision::ForceOutput) => "force_output",
            Self::Validation(ValidationDecision::Replan) => "replan",
            Self::Validation(ValidationDecision::FormatOutput) => "format_output",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide what to do after gap detection for the selected stage.
///
/// 1. No stage selected: sufficient.
/// 2. Search budget spent: accept-current.
/// 3. Too few books: retry-general.
/// 4. A gap names the stage or says "need", and another search fits the
///    budget with room to spare: retry-specific.
/// 5. Otherwise: sufficient.
pub fn book_search_decision(state: &StudySessionState, limits: &WorkflowLimits) -> BookSearchDecision {
    let Some(stage) = state.current_stage.as_deref() else {
        return BookSearchDecision::Sufficient;
    };
    let searches = state.book_search_iterations;

    if searches >= limits.max_book_searches_per_stage {
        return BookSearchDecision::AcceptCurrent;
    }
    if state.book_count(stage) < limits.min_books_per_stage {
        return BookSearchDecision::RetryGeneral;
    }
    let gap_mentions_stage = state
        .knowledge_gaps
        .iter()
        .any(|gap| signals::gap_targets_stage(gap, stage));
    if gap_mentions_stage && searches + 1 < limits.max_book_searches_per_stage {
        return BookSearchDecision::RetrySpecific;
    }
    BookSearchDecision::Sufficient
}

/// Decide whether another stage needs books or the plan is ready for global
/// validation. Sets `all_stages_covered`.
///
/// Routes to the next stage only while some under-covered stage still has
/// search budget (is not exhausted).
pub fn coverage_decision(state: &mut StudySessionState, limits: &WorkflowLimits) -> CoverageDecision {
    let under_covered = state.under_covered_stages(limits.min_books_per_stage);
    let searchable = under_covered.iter().any(|stage| !state.is_exhausted(stage));
    let covered = under_covered.is_empty();

    state.all_stages_covered = covered;
    if searchable {
        CoverageDecision::NextStage
    } else {
        CoverageDecision::ValidateGlobally
    }
}

/// Worst-case node executions from a replan to the next terminal node:
/// the replan itself, one full search round per reopened stage, another
/// global validation, and the output node.
pub fn replan_cost(state: &StudySessionState, limits: &WorkflowLimits) -> usize {
    // select, then research/quality/gaps per search, then coverage check
    let per_stage = 2 + 3 * limits.max_book_searches_per_stage as usize;
    let reopened = state
        .under_covered_stages(limits.min_books_per_stage)
        .len()
        .max(1);
    1 + reopened * per_stage + 2
}

/// Whether another replanning round still ends inside the step ceiling.
pub fn replan_fits_step_budget(state: &StudySessionState, limits: &WorkflowLimits) -> bool {
    state.steps_taken + replan_cost(state, limits) <= limits.max_steps
}

/// Decide how to finish after a global validation pass.
///
/// Refinements count as spent when another round would overrun the step
/// ceiling.
///
/// 1. Validation cycles spent: force-output.
/// 2. Recent feedback flags a problem and refinements remain: replan.
/// 3. A stage is under-covered and refinements remain: replan.
/// 4. A stage is under-covered and refinements are spent: force-output.
/// 5. Otherwise: format-output.
pub fn validation_decision(state: &StudySessionState, limits: &WorkflowLimits) -> ValidationDecision {
    if state.validation_iterations >= limits.max_validation_cycles {
        return ValidationDecision::ForceOutput;
    }
    let can_refine = state.plan_refinement_iterations < limits.max_plan_refinements
        && replan_fits_step_budget(state, limits);
    if can_refine && signals::feedback_flags_problem(state.recent_feedback(RECENT_FEEDBACK_WINDOW)) {
        return ValidationDecision::Replan;
    }
    if !state.every_stage_covered(limits.min_books_per_stage) {
        return if can_refine {
            ValidationDecision::Replan
        } else {
            ValidationDecision::ForceOutput
        };
    }
    ValidationDecision::FormatOutput
}
