//! Execution engines.
//!
//! An engine turns "run this on some worker" into a submit / take protocol
//! where `take` hands back finished units in completion order. Engines know
//! nothing about graphs or tasks.

mod default;
mod pool;

pub use default::DefaultExecutionEngine;
pub use pool::WorkerPool;

use crate::errors::EngineError;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// A unit of work accepted by an engine.
pub type Work<T> = BoxFuture<'static, T>;

/// Identifies one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionHandle(pub(crate) u64);

impl SubmissionHandle {
    /// Monotonic ticket number, in submission order.
    #[must_use]
    pub fn ticket(self) -> u64 {
        self.0
    }
}

/// A finished unit of work.
#[derive(Debug)]
pub struct Completion<T> {
    /// The submission this completion belongs to.
    pub handle: SubmissionHandle,
    /// The value produced, or why the unit did not produce one.
    pub outcome: Result<T, EngineError>,
}

/// Submit / take-in-completion-order protocol over a worker pool.
#[async_trait]
pub trait ExecutionEngine<T: Send + 'static>: Send {
    /// Enqueues work and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rejected`] if the engine has been shut down.
    fn submit(&mut self, work: Work<T>) -> Result<SubmissionHandle, EngineError>;

    /// Waits for the next unit to finish and returns it.
    ///
    /// Units are returned in the order they finish, not the order they were
    /// submitted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Idle`] when nothing is outstanding, or
    /// [`EngineError::Closed`] if the completion queue is gone.
    async fn take(&mut self) -> Result<Completion<T>, EngineError>;

    /// Returns true once the engine no longer accepts work.
    fn is_shutdown(&self) -> bool;
}
