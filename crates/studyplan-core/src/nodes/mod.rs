//! The workflow's processing nodes.
//!
//! Every node reads and writes the shared [`StudySessionState`]. Nodes that
//! consult the completion collaborator recover its failures locally with a
//! fixed fallback, so no node ever fails the run.

pub mod analysis;
pub mod output;
pub mod planning;
pub mod research;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;

use crate::completion::TextCompletion;
use crate::config::WorkflowLimits;
use crate::graph::{NodeId, NodeRunner};
use crate::model::StudySessionState;
use crate::sink::OutputSink;

/// Dispatch table from [`NodeId`] to node handler, plus the collaborators
/// the handlers need.
#[derive(Clone)]
pub struct NodeSet {
    completion: Arc<dyn TextCompletion>,
    sink: Arc<dyn OutputSink>,
    limits: WorkflowLimits,
    search_temperature: f64,
}

impl std::fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSet")
            .field("completion", &self.completion.name())
            .field("limits", &self.limits)
            .field("search_temperature", &self.search_temperature)
            .finish()
    }
}

impl NodeSet {
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        sink: Arc<dyn OutputSink>,
        limits: WorkflowLimits,
        search_temperature: f64,
    ) -> Self {
        Self {
            completion,
            sink,
            limits,
            search_temperature,
        }
    }
}

#[async_trait]
impl NodeRunner for NodeSet {
    async fn run(&self, node: NodeId, state: &mut StudySessionState) {
        let completion = self.completion.as_ref();
        let limits = &self.limits;
        match node {
            NodeId::AnalyzeTopic => analysis::analyze_topic(completion, state).await,
            NodeId::EvaluateLevel => analysis::evaluate_level(state),
            NodeId::StructurePlan => planning::structure_plan(completion, state).await,
            NodeId::SelectStage => planning::select_stage(state, limits),
            NodeId::ResearchBooks => {
                research::research_books(completion, state, self.search_temperature).await
            }
            NodeId::ValidateQuality => research::validate_quality(state, limits),
            NodeId::DetectGaps => research::detect_gaps(state, limits),
            NodeId::CoverageCheck => {}
            NodeId::ValidatePlan => validation::validate_plan(completion, state).await,
            NodeId::Replan => planning::replan(completion, state, limits).await,
            NodeId::FormatOutput => output::format_output(self.sink.as_ref(), state).await,
            NodeId::ForcedOutput => output::forced_output(self.sink.as_ref(), state).await,
        }
    }
}
