//! The workflow as an explicit finite-state machine.
//!
//! ```text
//! analyze_topic -> evaluate_level -> structure_plan -> select_stage
//! select_stage  -> research_books -> validate_quality -> detect_gaps
//! detect_gaps   -[book_search]-> research_books (retry_general, retry_specific)
//!                              -> coverage_check (accept_current, sufficient)
//! coverage_check -[coverage]-> select_stage (next_stage)
//!                             -> validate_plan (validate_globally)
//! validate_plan  -[validation]-> replan (replan)
//!                               -> forced_output (force_output)
//!                               -> format_output (format_output)
//! replan -> select_stage
//! ```

pub mod decision;
pub mod executor;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

pub use decision::{
    BookSearchDecision, CoverageDecision, Decision, Outcome, ValidationDecision,
};
pub use executor::{ExecutionReport, GraphExecutor, NodeRunner};

use crate::error::GraphError;

/// Identifier of every node in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    AnalyzeTopic,
    EvaluateLevel,
    StructurePlan,
    SelectStage,
    ResearchBooks,
    ValidateQuality,
    DetectGaps,
    /// Routing junction for the coverage decision; does no work.
    CoverageCheck,
    ValidatePlan,
    Replan,
    FormatOutput,
    ForcedOutput,
}

impl NodeId {
    pub const ALL: [NodeId; 12] = [
        NodeId::AnalyzeTopic,
        NodeId::EvaluateLevel,
        NodeId::StructurePlan,
        NodeId::SelectStage,
        NodeId::ResearchBooks,
        NodeId::ValidateQuality,
        NodeId::DetectGaps,
        NodeId::CoverageCheck,
        NodeId::ValidatePlan,
        NodeId::Replan,
        NodeId::FormatOutput,
        NodeId::ForcedOutput,
    ];

    /// Terminal nodes end the session once they have run.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeId::FormatOutput | NodeId::ForcedOutput)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::AnalyzeTopic => "analyze_topic",
            NodeId::EvaluateLevel => "evaluate_level",
            NodeId::StructurePlan => "structure_plan",
            NodeId::SelectStage => "select_stage",
            NodeId::ResearchBooks => "research_books",
            NodeId::ValidateQuality => "validate_quality",
            NodeId::DetectGaps => "detect_gaps",
            NodeId::CoverageCheck => "coverage_check",
            NodeId::ValidatePlan => "validate_plan",
            NodeId::Replan => "replan",
            NodeId::FormatOutput => "format_output",
            NodeId::ForcedOutput => "forced_output",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing edge of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    To(NodeId),
    Branch {
        decision: Decision,
        routes: Vec<(Outcome, NodeId)>,
    },
    End,
}

/// Validated mapping from node to outgoing edge.
#[derive(Debug, Clone)]
pub struct EdgeTable {
    edges: HashMap<NodeId, Edge>,
}

impl EdgeTable {
    /// Build a table, checking that every node is routed, terminals end the
    /// run, and each branch covers exactly its decision's outcomes.
    pub fn new(edges: impl IntoIterator<Item = (NodeId, Edge)>) -> Result<Self, GraphError> {
        let edges: HashMap<NodeId, Edge> = edges.into_iter().collect();

        for node in NodeId::ALL {
            let edge = edges.get(&node).ok_or(GraphError::Unrouted(node))?;
            if node.is_terminal() && *edge != Edge::End {
                return Err(GraphError::TerminalWithEdges(node));
            }
            if let Edge::Branch { decision, routes } = edge {
                if let Some((outcome, _)) = routes.iter().find(|(o, _)| o.decision() != *decision) {
                    return Err(GraphError::MismatchedDecision {
                        node,
                        decision: outcome.decision().as_str(),
                    });
                }
                for outcome in decision.outcomes() {
                    if !routes.iter().any(|(o, _)| o == outcome) {
                        return Err(GraphError::UncoveredOutcome {
                            node,
                            outcome: outcome.as_str(),
                        });
                    }
                }
            }
        }
        Ok(Self { edges })
    }

    /// The study-plan workflow.
    pub fn study_plan() -> Result<Self, GraphError> {
        use BookSearchDecision as B;
        use CoverageDecision as C;
        use ValidationDecision as V;

        Self::new([
            (NodeId::AnalyzeTopic, Edge::To(NodeId::EvaluateLevel)),
            (NodeId::EvaluateLevel, Edge::To(NodeId::StructurePlan)),
            (NodeId::StructurePlan, Edge::To(NodeId::SelectStage)),
            (NodeId::SelectStage, Edge::To(NodeId::ResearchBooks)),
            (NodeId::ResearchBooks, Edge::To(NodeId::ValidateQuality)),
            (NodeId::ValidateQuality, Edge::To(NodeId::DetectGaps)),
            (
                NodeId::DetectGaps,
                Edge::Branch {
                    decision: Decision::BookSearch,
                    routes: vec![
                        (Outcome::BookSearch(B::AcceptCurrent), NodeId::CoverageCheck),
                        (Outcome::BookSearch(B::RetryGeneral), NodeId::ResearchBooks),
                        (Outcome::BookSearch(B::RetrySpecific), NodeId::ResearchBooks),
                        (Outcome::BookSearch(B::Sufficient), NodeId::CoverageCheck),
                    ],
                },
            ),
            (
                NodeId::CoverageCheck,
                Edge::Branch {
                    decision: Decision::Coverage,
                    routes: vec![
                        (Outcome::Coverage(C::NextStage), NodeId::SelectStage),
                        (Outcome::Coverage(C::ValidateGlobally), NodeId::ValidatePlan),
                    ],
                },
            ),
            (
                NodeId::ValidatePlan,
                Edge::Branch {
                    decision: Decision::Validation,
                    routes: vec![
                        (Outcome::Validation(V::ForceOutput), NodeId::ForcedOutput),
                        (Outcome::Validation(V::Replan), NodeId::Replan),
                        (Outcome::Validation(V::FormatOutput), NodeId::FormatOutput),
                    ],
                },
            ),
            (NodeId::Replan, Edge::To(NodeId::SelectStage)),
            (NodeId::FormatOutput, Edge::End),
            (NodeId::ForcedOutput, Edge::End),
        ])
    }

    pub fn edge(&self, node: NodeId) -> Option<&Edge> {
        self.edges.get(&node)
    }
}
