//! Mutable per-task state shared between the orchestrator and decorators.

use crate::core::{ExecutionBehavior, ExecutionStatus};
use crate::errors::TransitionError;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};

/// Identity, status and policy of a task.
///
/// Tasks are shared behind `Arc` between the orchestrator and the worker
/// running them, so every field uses interior mutability. The status only
/// ever moves from `Pending` to a terminal value, once.
#[derive(Debug)]
pub struct TaskState<K> {
    id: RwLock<Option<K>>,
    status: Mutex<ExecutionStatus>,
    behavior: RwLock<ExecutionBehavior>,
    consider_execution_error: AtomicBool,
}

impl<K> Default for TaskState<K> {
    fn default() -> Self {
        Self {
            id: RwLock::new(None),
            status: Mutex::new(ExecutionStatus::Pending),
            behavior: RwLock::new(ExecutionBehavior::default()),
            consider_execution_error: AtomicBool::new(true),
        }
    }
}

impl<K: Clone> TaskState<K> {
    /// Creates a pending state with default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: ExecutionBehavior) -> Self {
        *self.behavior.write() = behavior;
        self
    }

    /// Sets whether execution errors count as failures.
    #[must_use]
    pub fn with_consider_execution_error(self, consider: bool) -> Self {
        self.consider_execution_error.store(consider, Ordering::SeqCst);
        self
    }

    /// Returns the assigned id.
    #[must_use]
    pub fn id(&self) -> Option<K> {
        self.id.read().clone()
    }

    /// Assigns the id.
    pub fn set_id(&self, id: K) {
        *self.id.write() = Some(id);
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        *self.status.lock()
    }

    /// Moves the status from `Pending` to a terminal value.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is already terminal or `next` is `Pending`.
    pub fn transition_to(&self, next: ExecutionStatus) -> Result<(), TransitionError> {
        let mut status = self.status.lock();
        if status.is_terminal() || !next.is_terminal() {
            return Err(TransitionError {
                from: *status,
                to: next,
            });
        }
        *status = next;
        Ok(())
    }

    /// Returns the execution behavior.
    #[must_use]
    pub fn behavior(&self) -> ExecutionBehavior {
        *self.behavior.read()
    }

    /// Sets the execution behavior.
    pub fn set_behavior(&self, behavior: ExecutionBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Returns whether execution errors count as failures.
    #[must_use]
    pub fn consider_execution_error(&self) -> bool {
        self.consider_execution_error.load(Ordering::SeqCst)
    }

    /// Sets whether execution errors count as failures.
    pub fn set_consider_execution_error(&self, consider: bool) {
        self.consider_execution_error.store(consider, Ordering::SeqCst);
    }
}
