//! Error types for the taskflow framework.
//!
//! Errors are split by the layer that produces them:
//! - [`TaskError`]: raised by a task body, contained at the node boundary
//! - [`TransitionError`]: an illegal status change on a task
//! - [`EngineError`]: the execution engine refused or lost a unit of work
//! - [`GraphValidationError`] / [`CycleDetectedError`]: graph construction
//! - [`OrchestrationError`]: the run as a whole cannot be trusted

use crate::core::{ExecutionResults, ExecutionStatus, NodeId, TaskOutput};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// The umbrella error type for taskflow operations outside of a graph run.
#[derive(Debug, Error)]
pub enum TaskflowError {
    /// A graph validation error occurred.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// A cycle was detected in the graph.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// The execution engine failed.
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// A task failed.
    #[error("{0}")]
    Task(#[from] TaskError),

    /// An illegal status transition was requested.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error produced while executing a task body.
///
/// Task errors never unwind past the orchestrator: they are stored on the
/// node's [`ExecutionResult`](crate::core::ExecutionResult) and turned into a status.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum TaskError {
    /// The task body reported a failure.
    #[error("Task execution failed: {0}")]
    Failed(String),

    /// The task body panicked on a worker.
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The engine refused to run the task because it was shut down.
    #[error("Task submission rejected: execution engine is shut down")]
    Rejected,
}

impl TaskError {
    /// Creates a failed error from any message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns true if the error came from the engine rather than the task body.
    #[must_use]
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

impl From<EngineError> for TaskError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::WorkerPanicked(msg) => Self::Panicked(msg),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Error raised when a task status change violates `PENDING -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal status transition: {from} -> {to}")]
pub struct TransitionError {
    /// The status the task was in.
    pub from: ExecutionStatus,
    /// The status that was requested.
    pub to: ExecutionStatus,
}

/// Errors raised by an execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The worker pool no longer accepts work.
    #[error("Submission rejected: worker pool is shut down")]
    Rejected,

    /// The unit of work panicked while running.
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// The completion queue was closed while waiting for work.
    #[error("Completion queue closed")]
    Closed,

    /// `take` was called with no submitted work left to retrieve.
    #[error("No submitted work left to take")]
    Idle,

    /// The engine was created outside of a tokio runtime.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Diagnostic metadata attached to graph validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "GRAPH-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ErrorInfo {
    /// Creates new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised when a graph cannot be built.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The nodes involved in the error, rendered with `Debug`.
    pub nodes: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nodes: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the nodes involved.
    #[must_use]
    pub fn with_nodes<K: Debug>(mut self, nodes: &[&K]) -> Self {
        self.nodes = nodes.iter().map(|n| format!("{n:?}")).collect();
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a cycle is detected in the graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in graph: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of nodes forming the cycle.
    pub cycle_path: Vec<String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ErrorInfo::new(
            "GRAPH-CYCLE",
            format!("Graph contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for GraphValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            nodes: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Terminal failure of an orchestration run.
///
/// Task-level errors are not reported here; they live on the node results.
/// These variants mean the run as a whole cannot be trusted.
#[derive(Debug, Error)]
pub enum OrchestrationError<K: NodeId, R: TaskOutput> {
    /// The engine refused to run one or more ready nodes.
    #[error("Execution engine rejected {} submission(s): {rejected:?}", rejected.len())]
    RejectedSubmission {
        /// Nodes that could not be submitted.
        rejected: Vec<K>,
        /// Every node that did reach a terminal status.
        results: ExecutionResults<K, R>,
    },

    /// Some nodes never became ready (malformed graph).
    #[error("Incomplete graph execution; nodes still pending: {pending:?}")]
    IncompleteGraphExecution {
        /// Nodes left in `PENDING`.
        pending: Vec<K>,
        /// Every node that did reach a terminal status.
        results: ExecutionResults<K, R>,
    },

    /// A node was already terminal before the run started.
    #[error("Node {id:?} is {status}, expected pending before the run")]
    NodeNotPending {
        /// The offending node.
        id: K,
        /// Its current status.
        status: ExecutionStatus,
    },

    /// The engine failed in a way that stops the run.
    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl<K: NodeId, R: TaskOutput> OrchestrationError<K, R> {
    /// Returns the partial results carried by the error, if any.
    #[must_use]
    pub fn partial_results(&self) -> Option<&ExecutionResults<K, R>> {
        match self {
            Self::RejectedSubmission { results, .. }
            | Self::IncompleteGraphExecution { results, .. } => Some(results),
            _ => None,
        }
    }
}
