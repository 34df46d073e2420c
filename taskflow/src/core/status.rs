//! Execution status and behavior enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of a task within one graph run.
///
/// A task starts `Pending` and moves exactly once to one of the terminal
/// values; it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// The task has not reached a terminal outcome yet.
    #[default]
    Pending,
    /// The task completed (or its error was suppressed).
    Success,
    /// The task failed and the failure counts.
    Errored,
    /// The task was never invoked.
    Skipped,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Errored => write!(f, "errored"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl ExecutionStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the task errored or was skipped.
    #[must_use]
    pub const fn is_unsuccessful(&self) -> bool {
        matches!(self, Self::Errored | Self::Skipped)
    }
}

/// How a task's error affects its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionBehavior {
    /// An error blocks every downstream node (cascading skip).
    #[default]
    Terminating,
    /// An error is recorded; dependents still decide whether to run.
    NonTerminating,
}

impl fmt::Display for ExecutionBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminating => write!(f, "terminating"),
            Self::NonTerminating => write!(f, "non_terminating"),
        }
    }
}

impl ExecutionBehavior {
    /// Returns true if errors under this behavior block dependents.
    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        matches!(self, Self::Terminating)
    }
}
