//! Task trait and implementations.
//!
//! Tasks are the units of work attached to graph nodes. A task carries its
//! own [`TaskState`] (id, status, behavior policy) and an `execute` body.

mod state;

pub use state::TaskState;

use crate::core::{ExecutionBehavior, ExecutionResults, ExecutionStatus, NodeId, TaskOutput};
use crate::errors::{TaskError, TransitionError};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Predicate deciding whether a task runs, given its predecessors' results.
pub type ShouldExecuteFn<K, R> = Arc<dyn Fn(&ExecutionResults<K, R>) -> bool + Send + Sync>;

/// Trait for graph tasks.
///
/// Implementors supply [`state`](Task::state) and [`execute`](Task::execute);
/// every other operation has a default backed by the state and may be
/// overridden.
#[async_trait]
pub trait Task<K: NodeId, R: TaskOutput>: Send + Sync + Debug {
    /// Returns the task's mutable state.
    fn state(&self) -> &TaskState<K>;

    /// Returns the id assigned when the task was added to a graph.
    fn id(&self) -> Option<K> {
        self.state().id()
    }

    /// Assigns the task id.
    fn set_id(&self, id: K) {
        self.state().set_id(id);
    }

    /// Returns the current status.
    fn status(&self) -> ExecutionStatus {
        self.state().status()
    }

    /// Moves the task to a terminal status.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is already terminal.
    fn transition_to(&self, status: ExecutionStatus) -> Result<(), TransitionError> {
        self.state().transition_to(status)
    }

    /// Marks the task as succeeded.
    fn mark_success(&self) -> Result<(), TransitionError> {
        self.transition_to(ExecutionStatus::Success)
    }

    /// Marks the task as errored.
    fn mark_errored(&self) -> Result<(), TransitionError> {
        self.transition_to(ExecutionStatus::Errored)
    }

    /// Marks the task as skipped.
    fn mark_skipped(&self) -> Result<(), TransitionError> {
        self.transition_to(ExecutionStatus::Skipped)
    }

    /// Returns how an error on this task affects its dependents.
    fn execution_behavior(&self) -> ExecutionBehavior {
        self.state().behavior()
    }

    /// Sets the execution behavior.
    fn set_execution_behavior(&self, behavior: ExecutionBehavior) {
        self.state().set_behavior(behavior);
    }

    /// Returns whether an error raised by `execute` counts as a failure.
    fn should_consider_execution_error(&self) -> bool {
        self.state().consider_execution_error()
    }

    /// Sets whether an error raised by `execute` counts as a failure.
    fn set_consider_execution_error(&self, consider: bool) {
        self.state().set_consider_execution_error(consider);
    }

    /// Decides whether the task runs, given the results of its predecessors.
    ///
    /// Returning false marks the task `SKIPPED` without invoking it.
    fn should_execute(&self, _predecessors: &ExecutionResults<K, R>) -> bool {
        true
    }

    /// Performs the work.
    async fn execute(&self) -> Result<R, TaskError>;
}

/// A task backed by a synchronous closure.
pub struct FnTask<K, R, F>
where
    F: Fn() -> anyhow::Result<R> + Send + Sync,
{
    state: TaskState<K>,
    func: F,
    should_execute: Option<ShouldExecuteFn<K, R>>,
}

impl<K, R, F> FnTask<K, R, F>
where
    K: NodeId,
    R: TaskOutput,
    F: Fn() -> anyhow::Result<R> + Send + Sync,
{
    /// Creates a new closure task.
    pub fn new(func: F) -> Self {
        Self {
            state: TaskState::new(),
            func,
            should_execute: None,
        }
    }

    /// Sets the execution behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: ExecutionBehavior) -> Self {
        self.state.set_behavior(behavior);
        self
    }

    /// Sets whether execution errors count as failures.
    #[must_use]
    pub fn with_consider_execution_error(self, consider: bool) -> Self {
        self.state.set_consider_execution_error(consider);
        self
    }

    /// Sets the predicate consulted before execution.
    #[must_use]
    pub fn with_should_execute(
        mut self,
        predicate: impl Fn(&ExecutionResults<K, R>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_execute = Some(Arc::new(predicate));
        self
    }
}

impl<K, R, F> Debug for FnTask<K, R, F>
where
    K: Debug,
    F: Fn() -> anyhow::Result<R> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTask")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<K, R, F> Task<K, R> for FnTask<K, R, F>
where
    K: NodeId,
    R: TaskOutput,
    F: Fn() -> anyhow::Result<R> + Send + Sync,
{
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    fn should_execute(&self, predecessors: &ExecutionResults<K, R>) -> bool {
        self.should_execute
            .as_ref()
            .map_or(true, |predicate| predicate(predecessors))
    }

    async fn execute(&self) -> Result<R, TaskError> {
        (self.func)().map_err(TaskError::from)
    }
}

/// A task backed by an async closure.
pub struct AsyncFnTask<K, R, F, Fut>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    state: TaskState<K>,
    func: F,
    should_execute: Option<ShouldExecuteFn<K, R>>,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<K, R, F, Fut> AsyncFnTask<K, R, F, Fut>
where
    K: NodeId,
    R: TaskOutput,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    /// Creates a new async closure task.
    pub fn new(func: F) -> Self {
        Self {
            state: TaskState::new(),
            func,
            should_execute: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the execution behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: ExecutionBehavior) -> Self {
        self.state.set_behavior(behavior);
        self
    }

    /// Sets whether execution errors count as failures.
    #[must_use]
    pub fn with_consider_execution_error(self, consider: bool) -> Self {
        self.state.set_consider_execution_error(consider);
        self
    }

    /// Sets the predicate consulted before execution.
    #[must_use]
    pub fn with_should_execute(
        mut self,
        predicate: impl Fn(&ExecutionResults<K, R>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_execute = Some(Arc::new(predicate));
        self
    }
}

impl<K, R, F, Fut> Debug for AsyncFnTask<K, R, F, Fut>
where
    K: Debug,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnTask")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<K, R, F, Fut> Task<K, R> for AsyncFnTask<K, R, F, Fut>
where
    K: NodeId,
    R: TaskOutput,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    fn should_execute(&self, predecessors: &ExecutionResults<K, R>) -> bool {
        self.should_execute
            .as_ref()
            .map_or(true, |predicate| predicate(predecessors))
    }

    async fn execute(&self) -> Result<R, TaskError> {
        (self.func)().await.map_err(TaskError::from)
    }
}
