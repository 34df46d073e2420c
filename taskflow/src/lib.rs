//! # Taskflow
//!
//! Concurrent execution of dependent tasks arranged in a directed acyclic graph.
//!
//! Taskflow runs every task in a graph exactly once, never before all of its
//! predecessors have reached a terminal status, and as many at a time as the
//! worker pool allows. It provides:
//!
//! - **Graph construction**: a builder that rejects duplicates, self edges and cycles
//! - **Per-task error policy**: terminating or non-terminating failures, and
//!   errors that are recorded but not counted
//! - **Conditional execution**: tasks may decline to run based on their
//!   predecessors' results
//! - **Decorators**: wrap a task with timing, retry or custom behavior
//! - **Pluggable engines**: a bounded tokio worker pool by default
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskflow::prelude::*;
//! use std::sync::Arc;
//!
//! let mut builder = GraphBuilder::new();
//! builder
//!     .add_node("fetch", Arc::new(FnTask::new(|| Ok(1))))?
//!     .add_node("parse", Arc::new(FnTask::new(|| Ok(2))))?
//!     .add_dependency("fetch", "parse")?;
//! let graph = builder.build()?;
//!
//! let mut executor = DependentTasksExecutor::with_pool(WorkerPool::new(4)?);
//! let results = executor.execute(&graph).await?;
//! assert!(results.all_succeeded());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod decorators;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod observability;
pub mod task;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        ExecutionBehavior, ExecutionResult, ExecutionResults, ExecutionStatus, NodeId, TaskOutput,
    };
    pub use crate::decorators::{
        DelegatingTask, Retry, RetryConfig, RetryingTask, TaskDecorator, TimedTask, Timing,
    };
    pub use crate::engine::{DefaultExecutionEngine, ExecutionEngine, WorkerPool};
    pub use crate::errors::{
        CycleDetectedError, EngineError, GraphValidationError, OrchestrationError, TaskError,
        TaskflowError,
    };
    pub use crate::executor::{DependentTasksExecutor, ExecutorConfig};
    pub use crate::graph::{Graph, GraphBuilder};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::task::{AsyncFnTask, FnTask, Task, TaskState};
}
