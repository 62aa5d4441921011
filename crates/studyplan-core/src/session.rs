//! Session entry point: one topic in, one study-plan document out.

use std::sync::Arc;

use tracing::{Instrument, info};
use uuid::Uuid;

use crate::completion::TextCompletion;
use crate::config::WorkflowLimits;
use crate::error::{GraphError, WorkflowError};
use crate::graph::{EdgeTable, ExecutionReport, GraphExecutor, NodeId};
use crate::model::{StudySessionState, UserLevel};
use crate::nodes::NodeSet;
use crate::sink::OutputSink;

/// Result of a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub document: String,
    pub state: StudySessionState,
    pub report: ExecutionReport,
}

impl SessionOutcome {
    /// Whether the document came from the limited-resources path.
    pub fn is_limited(&self) -> bool {
        self.report.terminal == NodeId::ForcedOutput
    }
}

/// Builds a study plan for a topic by driving the workflow graph.
#[derive(Debug, Clone)]
pub struct StudyPlanner {
    executor: GraphExecutor,
    nodes: NodeSet,
    quality_threshold: f64,
}

impl StudyPlanner {
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        sink: Arc<dyn OutputSink>,
        limits: WorkflowLimits,
        search_temperature: f64,
    ) -> Result<Self, GraphError> {
        let edges = EdgeTable::study_plan()?;
        let quality_threshold = limits.quality_threshold;
        let nodes = NodeSet::new(completion, sink, limits.clone(), search_temperature);
        Ok(Self {
            executor: GraphExecutor::new(edges, limits),
            nodes,
            quality_threshold,
        })
    }

    /// Run one session. An empty topic is rejected before any node runs.
    pub async fn run(&self, topic: &str, level: UserLevel, verbose: bool) -> Result<SessionOutcome, WorkflowError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(WorkflowError::EmptyTopic);
        }

        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", session_id = %session_id, topic = %topic);

        async move {
            info!(level = %level, "starting study plan session");
            let mut state = StudySessionState::new(topic, Some(level), self.quality_threshold);
            let report = self
                .executor
                .clone()
                .verbose(verbose)
                .execute(&self.nodes, NodeId::AnalyzeTopic, &mut state)
                .await?;

            let document = state.final_output.clone().ok_or(WorkflowError::MissingDocument)?;
            info!(
                terminal = %report.terminal,
                steps = report.steps(),
                "study plan session finished"
            );
            Ok::<_, WorkflowError>(SessionOutcome {
                session_id,
                document,
                state,
                report,
            })
        }
        .instrument(span)
        .await
    }
}
