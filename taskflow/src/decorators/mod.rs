//! Task decorators.
//!
//! A [`DelegatingTask`] wraps another task and forwards the whole task
//! contract to it. Cross-cutting behavior (timing, retry) is layered on by a
//! [`TaskDecorator`], which may override `execute` and `should_execute`
//! while still ending up in the wrapped task. Status and policy are always
//! read from and written to the wrapped task, so a chain of decorators is
//! observationally identical to the innermost task.

mod retry;
mod timing;

pub use retry::{BackoffStrategy, JitterStrategy, Retry, RetryConfig, RetrySchedule};
pub use timing::Timing;

use crate::core::{ExecutionBehavior, ExecutionResults, ExecutionStatus, NodeId, TaskOutput};
use crate::errors::{TaskError, TransitionError};
use crate::task::{Task, TaskState};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Behavior layered on top of a wrapped task.
///
/// Both hooks default to plain forwarding.
#[async_trait]
pub trait TaskDecorator<K: NodeId, R: TaskOutput>: Send + Sync + Debug {
    /// Runs the wrapped task.
    async fn execute(&self, target: &dyn Task<K, R>) -> Result<R, TaskError> {
        target.execute().await
    }

    /// Decides whether the wrapped task runs.
    fn should_execute(&self, target: &dyn Task<K, R>, predecessors: &ExecutionResults<K, R>) -> bool {
        target.should_execute(predecessors)
    }
}

/// A decorator that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl<K: NodeId, R: TaskOutput> TaskDecorator<K, R> for Passthrough {}

/// A task that forwards every operation to a wrapped task.
#[derive(Debug)]
pub struct DelegatingTask<K: NodeId, R: TaskOutput, D = Passthrough> {
    target: Arc<dyn Task<K, R>>,
    decorator: D,
}

/// A task whose executions are timed.
pub type TimedTask<K, R> = DelegatingTask<K, R, Timing>;

/// A task retried on error.
pub type RetryingTask<K, R> = DelegatingTask<K, R, Retry>;

impl<K: NodeId, R: TaskOutput, D: TaskDecorator<K, R>> DelegatingTask<K, R, D> {
    /// Wraps `target` with the given decorator.
    pub fn new(target: Arc<dyn Task<K, R>>, decorator: D) -> Self {
        Self { target, decorator }
    }

    /// Returns the wrapped task.
    #[must_use]
    pub fn target_task(&self) -> &Arc<dyn Task<K, R>> {
        &self.target
    }

    /// Returns the decorator.
    #[must_use]
    pub fn decorator(&self) -> &D {
        &self.decorator
    }
}

impl<K: NodeId, R: TaskOutput> DelegatingTask<K, R, Passthrough> {
    /// Wraps `target` without adding behavior.
    pub fn forwarding(target: Arc<dyn Task<K, R>>) -> Self {
        Self::new(target, Passthrough)
    }
}

impl<K: NodeId, R: TaskOutput> DelegatingTask<K, R, Timing> {
    /// Wraps `target` so that each execution is timed.
    pub fn timed(target: Arc<dyn Task<K, R>>) -> Self {
        Self::new(target, Timing::new())
    }
}

impl<K: NodeId, R: TaskOutput> DelegatingTask<K, R, Retry> {
    /// Wraps `target` so that failed executions are retried.
    pub fn retrying(target: Arc<dyn Task<K, R>>, config: RetryConfig) -> Self {
        Self::new(target, Retry::new(config))
    }
}

#[async_trait]
impl<K, R, D> Task<K, R> for DelegatingTask<K, R, D>
where
    K: NodeId,
    R: TaskOutput,
    D: TaskDecorator<K, R>,
{
    fn state(&self) -> &TaskState<K> {
        self.target.state()
    }

    fn id(&self) -> Option<K> {
        self.target.id()
    }

    fn set_id(&self, id: K) {
        self.target.set_id(id);
    }

    fn status(&self) -> ExecutionStatus {
        self.target.status()
    }

    fn transition_to(&self, status: ExecutionStatus) -> Result<(), TransitionError> {
        self.target.transition_to(status)
    }

    fn mark_success(&self) -> Result<(), TransitionError> {
        self.target.mark_success()
    }

    fn mark_errored(&self) -> Result<(), TransitionError> {
        self.target.mark_errored()
    }

    fn mark_skipped(&self) -> Result<(), TransitionError> {
        self.target.mark_skipped()
    }

    fn execution_behavior(&self) -> ExecutionBehavior {
        self.target.execution_behavior()
    }

    fn set_execution_behavior(&self, behavior: ExecutionBehavior) {
        self.target.set_execution_behavior(behavior);
    }

    fn should_consider_execution_error(&self) -> bool {
        self.target.should_consider_execution_error()
    }

    fn set_consider_execution_error(&self, consider: bool) {
        self.target.set_consider_execution_error(consider);
    }

    fn should_execute(&self, predecessors: &ExecutionResults<K, R>) -> bool {
        self.decorator.should_execute(&*self.target, predecessors)
    }

    async fn execute(&self) -> Result<R, TaskError> {
        self.decorator.execute(&*self.target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnTask;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Inner = Arc<dyn Task<i32, i32>>;

    fn setup() -> (Inner, DelegatingTask<i32, i32>) {
        let task: Inner = Arc::new(FnTask::new(|| Ok(0)));
        let delegating = DelegatingTask::forwarding(Arc::clone(&task));
        (task, delegating)
    }

    #[test]
    fn test_id() {
        let (task, delegating) = setup();
        delegating.set_id(1);
        assert_eq!(task.id(), delegating.id());
        assert_eq!(task.id(), Some(1));
    }

    #[test]
    fn test_errored() {
        let (task, delegating) = setup();
        delegating.mark_errored().unwrap();
        assert_eq!(task.status(), ExecutionStatus::Errored);
    }

    #[test]
    fn test_skipped() {
        let (task, delegating) = setup();
        delegating.mark_skipped().unwrap();
        assert_eq!(task.status(), ExecutionStatus::Skipped);
    }

    #[test]
    fn test_success() {
        let (task, delegating) = setup();
        delegating.mark_success().unwrap();
        assert_eq!(task.status(), ExecutionStatus::Success);
    }

    #[test]
    fn test_execution_behavior() {
        let (task, delegating) = setup();
        delegating.set_execution_behavior(ExecutionBehavior::NonTerminating);
        assert_eq!(task.execution_behavior(), ExecutionBehavior::NonTerminating);
        assert_eq!(delegating.execution_behavior(), task.execution_behavior());
    }

    #[test]
    fn test_consider_execution_error() {
        let (task, delegating) = setup();
        delegating.set_consider_execution_error(false);
        assert!(!task.should_consider_execution_error());
        assert_eq!(
            delegating.should_consider_execution_error(),
            delegating.target_task().should_consider_execution_error()
        );
    }

    #[test]
    fn test_get_status() {
        let (_task, delegating) = setup();
        delegating.mark_errored().unwrap();
        assert_eq!(delegating.status(), delegating.target_task().status());
    }

    #[test]
    fn test_should_execute() {
        let (_task, delegating) = setup();
        let preds = ExecutionResults::new();
        assert_eq!(
            delegating.should_execute(&preds),
            delegating.target_task().should_execute(&preds)
        );
    }

    #[test]
    fn test_transition_through_chain_happens_once() {
        let (task, delegating) = setup();
        let middle: Inner = Arc::new(delegating);
        let outer = DelegatingTask::timed(middle);
        outer.mark_success().unwrap();
        assert!(task.mark_errored().is_err());
        assert_eq!(outer.status(), ExecutionStatus::Success);
    }

    #[derive(Debug, Default)]
    struct Doubling {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TaskDecorator<i32, i32> for Doubling {
        async fn execute(&self, target: &dyn Task<i32, i32>) -> Result<i32, TaskError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            target.execute().await.map(|v| v * 2)
        }
    }

    #[tokio::test]
    async fn test_decorator_overrides_execute() {
        let inner: Inner = Arc::new(FnTask::new(|| Ok(21)));
        let task = DelegatingTask::new(inner, Doubling::default());

        assert_eq!(task.execute().await, Ok(42));
        assert_eq!(task.decorator().calls.load(Ordering::SeqCst), 1);
    }
}
