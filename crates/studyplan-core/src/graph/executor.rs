//! Trampoline executor over the edge table.

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::{Edge, EdgeTable, NodeId};
use crate::config::WorkflowLimits;
use crate::error::WorkflowError;
use crate::model::StudySessionState;

/// Runs the work of a single node against the shared state.
#[async_trait]
pub trait NodeRunner: Send + Sync {
    async fn run(&self, node: NodeId, state: &mut StudySessionState);
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// The terminal node that ended the run.
    pub terminal: NodeId,
    /// Every node executed, in order.
    pub path: Vec<NodeId>,
}

impl ExecutionReport {
    pub fn steps(&self) -> usize {
        self.path.len()
    }
}

/// Runs nodes one at a time, following the edge table, until a terminal
/// node has run or the step ceiling is hit.
#[derive(Debug, Clone)]
pub struct GraphExecutor {
    edges: EdgeTable,
    limits: WorkflowLimits,
    verbose: bool,
}

impl GraphExecutor {
    pub fn new(edges: EdgeTable, limits: WorkflowLimits) -> Self {
        Self {
            edges,
            limits,
            verbose: false,
        }
    }

    /// Log every step at `info` instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub async fn execute(
        &self,
        runner: &dyn NodeRunner,
        start: NodeId,
        state: &mut StudySessionState,
    ) -> Result<ExecutionReport, WorkflowError> {
        let limit = self.limits.max_steps;
        let mut path = Vec::new();
        let mut current = start;

        loop {
            if path.len() >= limit {
                let last_node = path.last().copied().unwrap_or(start);
                error!(limit, last_node = %last_node, "workflow exceeded step limit");
                return Err(WorkflowError::StepLimitExceeded { limit, last_node });
            }

            let step = path.len() + 1;
            if self.verbose {
                info!(node = %current, step, "running node");
            } else {
                debug!(node = %current, step, "running node");
            }
            runner.run(current, state).await;
            path.push(current);
            state.steps_taken = path.len();

            if current.is_terminal() {
                return Ok(ExecutionReport {
                    terminal: current,
                    path,
                });
            }
            current = self.next(current, state)?;
        }
    }

    fn next(&self, node: NodeId, state: &mut StudySessionState) -> Result<NodeId, WorkflowError> {
        match self.edges.edge(node) {
            Some(Edge::To(next)) => Ok(*next),
            Some(Edge::Branch { decision, routes }) => {
                let outcome = decision.evaluate(state, &self.limits);
                let target = routes
                    .iter()
                    .find(|(o, _)| *o == outcome)
                    .map(|(_, target)| *target)
                    .ok_or_else(|| WorkflowError::UndefinedEdge {
                        node,
                        outcome: outcome.to_string(),
                    })?;
                if self.verbose {
                    info!(node = %node, decision = %decision, outcome = %outcome, next = %target, "routed");
                } else {
                    debug!(node = %node, decision = %decision, outcome = %outcome, next = %target, "routed");
                }
                Ok(target)
            }
            Some(Edge::End) | None => Err(WorkflowError::MissingEdge(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::{BookRecord, StageDescriptor};

    /// Records visits and applies a canned effect per node.
    struct RecordingRunner {
        visits: Mutex<Vec<NodeId>>,
        books_per_search: usize,
    }

    impl RecordingRunner {
        fn new(books_per_search: usize) -> Self {
            Self {
                visits: Mutex::new(Vec::new()),
                books_per_search,
            }
        }
    }

    #[async_trait]
    impl NodeRunner for RecordingRunner {
        async fn run(&self, node: NodeId, state: &mut StudySessionState) {
            self.visits.lock().unwrap().push(node);
            match node {
                NodeId::StructurePlan => {
                    state.plan.insert("One", StageDescriptor::empty());
                }
                NodeId::SelectStage => {
                    let next = state.under_covered_stages(2).first().map(|s| s.to_string());
                    state.current_stage = next;
                }
                NodeId::ResearchBooks => {
                    state.book_search_iterations += 1;
                    if let Some(stage) = state.current_stage.clone() {
                        let books = (0..self.books_per_search)
                            .map(|i| BookRecord::new(format!("b{i}")))
                            .collect();
                        state.books_by_stage.insert(stage, books);
                    }
                }
                NodeId::ValidatePlan => state.validation_iterations += 1,
                NodeId::FormatOutput | NodeId::ForcedOutput => {
                    state.set_final_output(node.to_string());
                }
                _ => {}
            }
        }
    }

    fn executor(max_steps: usize) -> GraphExecutor {
        let limits = WorkflowLimits {
            max_steps,
            ..WorkflowLimits::default()
        };
        GraphExecutor::new(EdgeTable::study_plan().unwrap(), limits)
    }

    #[tokio::test]
    async fn follows_happy_path_to_format_output() {
        let runner = RecordingRunner::new(3);
        let mut state = StudySessionState::new("Rust", None, 4.0);
        let report = executor(100)
            .execute(&runner, NodeId::AnalyzeTopic, &mut state)
            .await
            .unwrap();

        assert_eq!(report.terminal, NodeId::FormatOutput);
        assert_eq!(
            report.path,
            vec![
                NodeId::AnalyzeTopic,
                NodeId::EvaluateLevel,
                NodeId::StructurePlan,
                NodeId::SelectStage,
                NodeId::ResearchBooks,
                NodeId::ValidateQuality,
                NodeId::DetectGaps,
                NodeId::CoverageCheck,
                NodeId::ValidatePlan,
                NodeId::FormatOutput,
            ]
        );
        assert_eq!(*runner.visits.lock().unwrap(), report.path);
        assert!(state.all_stages_covered);
        assert_eq!(state.final_output.as_deref(), Some("format_output"));
        assert_eq!(state.steps_taken, report.steps());
    }

    #[tokio::test]
    async fn step_ceiling_is_fatal() {
        let runner = RecordingRunner::new(3);
        let mut state = StudySessionState::new("Rust", None, 4.0);
        let err = executor(5)
            .execute(&runner, NodeId::AnalyzeTopic, &mut state)
            .await
            .unwrap_err();

        match err {
            WorkflowError::StepLimitExceeded { limit, last_node } => {
                assert_eq!(limit, 5);
                assert_eq!(last_node, NodeId::ResearchBooks);
            }
            other => panic!("expected StepLimitExceeded, got {other:?}"),
        }
        assert_eq!(runner.visits.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn search_retries_until_the_budget_is_spent() {
        // One book per search never satisfies the minimum of two.
        let runner = RecordingRunner::new(1);
        let mut state = StudySessionState::new("Rust", None, 4.0);
        state.exhausted_stages.insert("One".into());
        let report = executor(100)
            .execute(&runner, NodeId::AnalyzeTopic, &mut state)
            .await
            .unwrap();

        let searches_before_validation = report
            .path
            .iter()
            .take_while(|n| **n != NodeId::ValidatePlan)
            .filter(|n| **n == NodeId::ResearchBooks)
            .count();
        assert_eq!(searches_before_validation, 3);

        // This runner never refines the plan, so the validation ceiling is
        // what finally forces output.
        assert_eq!(report.terminal, NodeId::ForcedOutput);
        assert_eq!(state.validation_iterations, 5);
    }
}
