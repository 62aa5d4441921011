//! Study-plan workflow engine.
//!
//! Turns a learning topic into a staged study plan with ranked book
//! recommendations by driving a fixed graph of nodes over one shared
//! [`StudySessionState`]. Text generation and document persistence sit
//! behind the [`TextCompletion`] and [`OutputSink`] seams.

pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod model;
pub mod nodes;
pub mod render;
pub mod scoring;
pub mod session;
pub mod sink;

pub use completion::{CommandCompletion, CompletionProfile, TextCompletion};
pub use config::{CompletionSettings, WorkflowLimits};
pub use error::{GraphError, WorkflowError};
pub use model::{BookRecord, PlanStructure, StageDescriptor, StudySessionState, UserLevel};
pub use session::{SessionOutcome, StudyPlanner};
pub use sink::{DirectorySink, NullSink, OutputSink};
