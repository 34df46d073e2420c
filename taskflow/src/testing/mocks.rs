//! Mock tasks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::{ExecutionBehavior, ExecutionResults, ExecutionStatus, NodeId, TaskOutput};
use crate::errors::{TaskError, TransitionError};
use crate::task::{ShouldExecuteFn, Task, TaskState};

/// One recorded execution of a task body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry<K> {
    /// The task's id.
    pub id: K,
    /// When the body started.
    pub started: Instant,
    /// When the body returned.
    pub finished: Instant,
}

/// Execution log shared between several tasks.
#[derive(Clone)]
pub struct Journal<K> {
    entries: Arc<Mutex<Vec<JournalEntry<K>>>>,
}

impl<K: NodeId> Journal<K> {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends an entry.
    pub fn record(&self, id: K, started: Instant, finished: Instant) {
        self.entries.lock().push(JournalEntry {
            id,
            started,
            finished,
        });
    }

    /// Returns all entries, in the order bodies finished.
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry<K>> {
        self.entries.lock().clone()
    }

    /// Returns the first entry for `id`.
    #[must_use]
    pub fn entry(&self, id: &K) -> Option<JournalEntry<K>> {
        self.entries.lock().iter().find(|e| &e.id == id).cloned()
    }

    /// Ids in the order their bodies finished.
    #[must_use]
    pub fn finish_order(&self) -> Vec<K> {
        self.entries.lock().iter().map(|e| e.id.clone()).collect()
    }

    /// Number of times `id` ran.
    #[must_use]
    pub fn runs_of(&self, id: &K) -> usize {
        self.entries.lock().iter().filter(|e| &e.id == id).count()
    }

    /// Returns true if nothing has run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K: NodeId> Default for Journal<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for Journal<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("entries", &*self.entries.lock())
            .finish()
    }
}

/// A task that returns a fixed value and records every call.
///
/// It also counts status change requests, which makes it possible to check
/// that a node left `PENDING` exactly once.
pub struct RecordingTask<K, R> {
    state: TaskState<K>,
    output: R,
    delay: Duration,
    calls: AtomicUsize,
    transitions: AtomicUsize,
    journal: Option<Journal<K>>,
    should_execute: Option<ShouldExecuteFn<K, R>>,
}

impl<K: NodeId, R: TaskOutput> RecordingTask<K, R> {
    /// Creates a task returning `output`.
    #[must_use]
    pub fn new(output: R) -> Self {
        Self {
            state: TaskState::new(),
            output,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            transitions: AtomicUsize::new(0),
            journal: None,
            should_execute: None,
        }
    }

    /// Sleeps for `delay` before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleeps for `ms` milliseconds before returning.
    #[must_use]
    pub fn with_delay_ms(self, ms: u64) -> Self {
        self.with_delay(Duration::from_millis(ms))
    }

    /// Logs every execution into `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: &Journal<K>) -> Self {
        self.journal = Some(journal.clone());
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

    /// Number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of status changes requested.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }
}

impl<K: fmt::Debug, R> fmt::Debug for RecordingTask<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTask")
            .field("state", &self.state)
            .field("delay", &self.delay)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> Task<K, R> for RecordingTask<K, R> {
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    fn transition_to(&self, status: ExecutionStatus) -> Result<(), TransitionError> {
        self.transitions.fetch_add(1, Ordering::SeqCst);
        self.state.transition_to(status)
    }

    fn should_execute(&self, predecessors: &ExecutionResults<K, R>) -> bool {
        self.should_execute
            .as_ref()
            .map_or(true, |predicate| predicate(predecessors))
    }

    async fn execute(&self) -> Result<R, TaskError> {
        let started = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let (Some(journal), Some(id)) = (&self.journal, self.id()) {
            journal.record(id, started, Instant::now());
        }
        Ok(self.output.clone())
    }
}

/// A task that always fails.
pub struct FailingTask<K, R> {
    state: TaskState<K>,
    error: String,
    delay: Duration,
    calls: AtomicUsize,
    _output: std::marker::PhantomData<fn() -> R>,
}

impl<K: NodeId, R: TaskOutput> FailingTask<K, R> {
    /// Creates a task failing with `error`.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            state: TaskState::new(),
            error: error.into(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            _output: std::marker::PhantomData,
        }
    }

    /// Creates a failing task whose error does not block dependents.
    #[must_use]
    pub fn non_terminating(error: impl Into<String>) -> Self {
        Self::new(error).with_behavior(ExecutionBehavior::NonTerminating)
    }

    /// Creates a failing task whose error is suppressed.
    #[must_use]
    pub fn ignored(error: impl Into<String>) -> Self {
        Self::new(error).with_consider_execution_error(false)
    }

    /// Sets the execution behavior.
    #[must_use]
    pub fn with_behavior(self, behavior: ExecutionBehavior) -> Self {
        self.state.set_behavior(behavior);
        self
    }

    /// Sets whether the error counts as a failure.
    #[must_use]
    pub fn with_consider_execution_error(self, consider: bool) -> Self {
        self.state.set_consider_execution_error(consider);
        self
    }

    /// Waits `ms` milliseconds before failing.
    #[must_use]
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Number of times `execute` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<K: fmt::Debug, R> fmt::Debug for FailingTask<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailingTask")
            .field("state", &self.state)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> Task<K, R> for FailingTask<K, R> {
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    async fn execute(&self) -> Result<R, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Err(TaskError::failed(self.error.clone()))
    }
}

/// A task that sleeps, then returns its value.
#[derive(Debug)]
pub struct SlowTask<K, R> {
    state: TaskState<K>,
    output: R,
    delay: Duration,
}

impl<K: NodeId, R: TaskOutput> SlowTask<K, R> {
    /// Creates a slow task.
    #[must_use]
    pub fn new(output: R, delay: Duration) -> Self {
        Self {
            state: TaskState::new(),
            output,
            delay,
        }
    }

    /// Creates a slow task with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(output: R, ms: u64) -> Self {
        Self::new(output, Duration::from_millis(ms))
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> Task<K, R> for SlowTask<K, R> {
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    async fn execute(&self) -> Result<R, TaskError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.output.clone())
    }
}

/// A task whose body panics.
#[derive(Debug)]
pub struct PanickingTask<K> {
    state: TaskState<K>,
    message: String,
}

impl<K: NodeId> PanickingTask<K> {
    /// Creates a task panicking with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            state: TaskState::new(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> Task<K, R> for PanickingTask<K> {
    fn state(&self) -> &TaskState<K> {
        &self.state
    }

    async fn execute(&self) -> Result<R, TaskError> {
        panic!("{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_task_journal() {
        let journal = Journal::new();
        let task = RecordingTask::new(5).with_delay_ms(5).with_journal(&journal);
        task.set_id("a");

        assert_eq!(task.execute().await, Ok(5));
        assert_eq!(task.call_count(), 1);
        let entry = journal.entry(&"a").unwrap();
        assert!(entry.finished - entry.started >= Duration::from_millis(5));
        assert_eq!(journal.runs_of(&"a"), 1);
    }

    #[test]
    fn test_recording_task_counts_transitions() {
        let task: RecordingTask<&str, ()> = RecordingTask::new(());
        task.mark_success().unwrap();
        assert!(task.mark_errored().is_err());
        assert_eq!(task.transition_count(), 2);
        assert_eq!(task.status(), ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_failing_task_policies() {
        let task: FailingTask<&str, ()> = FailingTask::non_terminating("nope");
        assert_eq!(task.execute().await, Err(TaskError::failed("nope")));
        assert_eq!(task.execution_behavior(), ExecutionBehavior::NonTerminating);
        assert!(task.should_consider_execution_error());

        let ignored: FailingTask<&str, ()> = FailingTask::ignored("quiet");
        assert!(!ignored.should_consider_execution_error());
    }
}
