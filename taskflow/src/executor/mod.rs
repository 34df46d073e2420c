//! Graph execution.
//!
//! This module provides:
//! - The dependent-task orchestrator
//! - Executor configuration

mod config;
mod dependent;


pub use config::{ExecutorConfig, NAME_ENV_VAR, POOL_SIZE_ENV_VAR};
pub use dependent::{DependentTasksExecutor, NodeOutcome};
