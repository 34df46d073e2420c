//! Core domain model types for taskflow.
//!
//! This module contains the fundamental types used throughout the framework:
//! - Execution status and behavior enums
//! - Per-node execution results
//! - The bounds every node id and task output must satisfy

mod results;
mod status;
mod types;

pub use results::{ExecutionResult, ExecutionResults};
pub use status::{ExecutionBehavior, ExecutionStatus};
pub use types::{NodeId, TaskOutput};
