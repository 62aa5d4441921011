use thiserror::Error;

use crate::graph::NodeId;

/// Fatal workflow conditions. Collaborator and parse failures never surface
/// here; nodes recover those locally.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("workflow exceeded the step limit of {limit} (last node: {last_node})")]
    StepLimitExceeded { limit: usize, last_node: NodeId },

    #[error("no edge from {node} for decision outcome {outcome:?}")]
    UndefinedEdge { node: NodeId, outcome: String },

    #[error("node {0} has no outgoing edge")]
    MissingEdge(NodeId),

    #[error("terminal node finished without producing a document")]
    MissingDocument,
}

/// Edge-table construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("branch from {node} does not route outcome {outcome:?}")]
    UncoveredOutcome { node: NodeId, outcome: &'static str },

    #[error("branch from {node} is evaluated by the wrong decision ({decision})")]
    MismatchedDecision { node: NodeId, decision: &'static str },

    #[error("terminal node {0} must not have outgoing edges")]
    TerminalWithEdges(NodeId),

    #[error("node {0} has no outgoing edge")]
    Unrouted(NodeId),
}
