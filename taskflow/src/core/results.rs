//! Per-node outcomes of a graph run.

use super::{ExecutionStatus, NodeId, TaskOutput};
use crate::errors::TaskError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Final outcome of a single node.
#[derive(Debug, Clone)]
pub struct ExecutionResult<K, R> {
    /// The node id.
    pub id: K,
    /// The terminal status.
    pub status: ExecutionStatus,
    /// The value produced, when the task returned normally.
    pub result: Option<R>,
    /// The error raised by the task, if any.
    ///
    /// Present for `ERRORED` nodes, and for `SUCCESS` nodes whose error was
    /// suppressed because the task does not consider execution errors.
    pub error: Option<TaskError>,
    /// When the task body started, if it ran.
    pub started_at: Option<DateTime<Utc>>,
    /// When the node reached its terminal status.
    pub finished_at: DateTime<Utc>,
}

impl<K, R> ExecutionResult<K, R> {
    /// Creates a success result carrying a value.
    #[must_use]
    pub fn success(id: K, result: R) -> Self {
        Self::new(id, ExecutionStatus::Success, Some(result), None)
    }

    /// Creates a success result whose task error was suppressed.
    #[must_use]
    pub fn suppressed(id: K, error: TaskError) -> Self {
        Self::new(id, ExecutionStatus::Success, None, Some(error))
    }

    /// Creates an errored result.
    #[must_use]
    pub fn errored(id: K, error: TaskError) -> Self {
        Self::new(id, ExecutionStatus::Errored, None, Some(error))
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(id: K) -> Self {
        Self::new(id, ExecutionStatus::Skipped, None, None)
    }

    fn new(id: K, status: ExecutionStatus, result: Option<R>, error: Option<TaskError>) -> Self {
        Self {
            id,
            status,
            result,
            error,
            started_at: None,
            finished_at: Utc::now(),
        }
    }

    /// Sets the start and finish timestamps of the task body.
    #[must_use]
    pub fn with_timing(mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.finished_at = finished_at;
        self
    }

    /// Returns true if the node succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the run time of the task body in milliseconds, if it ran.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.started_at
            .map(|start| (self.finished_at - start).num_milliseconds())
    }
}

/// Outcomes of a set of nodes, in the order they were recorded.
#[derive(Debug, Clone)]
pub struct ExecutionResults<K, R> {
    entries: Vec<ExecutionResult<K, R>>,
    index: HashMap<K, usize>,
}

impl<K: NodeId, R: TaskOutput> ExecutionResults<K, R> {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Records a result.
    ///
    /// Returns false, leaving the existing entry untouched, if the node
    /// already has a result.
    pub fn record(&mut self, result: ExecutionResult<K, R>) -> bool {
        if self.index.contains_key(&result.id) {
            return false;
        }
        self.index.insert(result.id.clone(), self.entries.len());
        self.entries.push(result);
        true
    }

    /// Returns the result for a node.
    #[must_use]
    pub fn get(&self, id: &K) -> Option<&ExecutionResult<K, R>> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Returns the status recorded for a node.
    #[must_use]
    pub fn status_of(&self, id: &K) -> Option<ExecutionStatus> {
        self.get(id).map(|r| r.status)
    }

    /// Returns the value produced by a node, if it succeeded with one.
    #[must_use]
    pub fn result_of(&self, id: &K) -> Option<&R> {
        self.get(id).and_then(|r| r.result.as_ref())
    }

    /// Returns true if the node has a recorded result.
    #[must_use]
    pub fn contains(&self, id: &K) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of recorded results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates results in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionResult<K, R>> {
        self.entries.iter()
    }

    /// Iterates results with the given status.
    pub fn with_status(
        &self,
        status: ExecutionStatus,
    ) -> impl Iterator<Item = &ExecutionResult<K, R>> {
        self.entries.iter().filter(move |r| r.status == status)
    }

    /// Ids of successful nodes.
    #[must_use]
    pub fn successes(&self) -> Vec<&K> {
        self.with_status(ExecutionStatus::Success).map(|r| &r.id).collect()
    }

    /// Ids of errored nodes.
    #[must_use]
    pub fn errored(&self) -> Vec<&K> {
        self.with_status(ExecutionStatus::Errored).map(|r| &r.id).collect()
    }

    /// Ids of skipped nodes.
    #[must_use]
    pub fn skipped(&self) -> Vec<&K> {
        self.with_status(ExecutionStatus::Skipped).map(|r| &r.id).collect()
    }

    /// Returns true if any node errored.
    #[must_use]
    pub fn any_errored(&self) -> bool {
        self.entries.iter().any(|r| r.status == ExecutionStatus::Errored)
    }

    /// Returns true if any node was skipped.
    #[must_use]
    pub fn any_skipped(&self) -> bool {
        self.entries.iter().any(|r| r.status == ExecutionStatus::Skipped)
    }

    /// Returns true if every recorded node succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(ExecutionResult::is_success)
    }

    /// Builds a new result set restricted to the given ids.
    #[must_use]
    pub fn select<'a>(&self, ids: impl IntoIterator<Item = &'a K>) -> Self {
        let mut selected = Self::new();
        for id in ids {
            if let Some(result) = self.get(id) {
                selected.record(result.clone());
            }
        }
        selected
    }

    /// Counts per status, suitable for logging or reporting.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        let count = |status| self.with_status(status).count();
        serde_json::json!({
            "total": self.len(),
            "success": count(ExecutionStatus::Success),
            "errored": count(ExecutionStatus::Errored),
            "skipped": count(ExecutionStatus::Skipped),
            "suppressed_errors": self
                .with_status(ExecutionStatus::Success)
                .filter(|r| r.error.is_some())
                .count(),
        })
    }
}

impl<K: NodeId, R: TaskOutput> Default for ExecutionResults<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: NodeId, R: TaskOutput> IntoIterator for ExecutionResults<K, R> {
    type Item = ExecutionResult<K, R>;
    type IntoIter = std::vec::IntoIter<ExecutionResult<K, R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
