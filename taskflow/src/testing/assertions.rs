//! Test assertions for graph runs.

use super::Journal;
use crate::core::{ExecutionResults, ExecutionStatus, NodeId, TaskOutput};

/// Asserts that `id` ended with the expected status.
pub fn assert_status<K: NodeId, R: TaskOutput>(
    results: &ExecutionResults<K, R>,
    id: &K,
    expected: ExecutionStatus,
) {
    let actual = results.status_of(id);
    assert_eq!(
        actual,
        Some(expected),
        "Expected {id:?} to be {expected}, got {actual:?}"
    );
}

/// Asserts that every listed node ended with the expected status.
pub fn assert_statuses<K: NodeId, R: TaskOutput>(
    results: &ExecutionResults<K, R>,
    expected: &[(K, ExecutionStatus)],
) {
    for (id, status) in expected {
        assert_status(results, id, *status);
    }
}

/// Asserts that every recorded node succeeded.
pub fn assert_all_succeeded<K: NodeId, R: TaskOutput>(results: &ExecutionResults<K, R>) {
    assert!(
        results.all_succeeded(),
        "Expected every node to succeed, errored: {:?}, skipped: {:?}",
        results.errored(),
        results.skipped()
    );
}

/// Asserts that `before` finished running before `after` started.
pub fn assert_ran_before<K: NodeId>(journal: &Journal<K>, before: &K, after: &K) {
    let first = journal
        .entry(before)
        .unwrap_or_else(|| panic!("{before:?} never ran"));
    let second = journal
        .entry(after)
        .unwrap_or_else(|| panic!("{after:?} never ran"));
    assert!(
        first.finished <= second.started,
        "Expected {before:?} to finish before {after:?} started"
    );
}

/// Asserts that `id` never ran.
pub fn assert_not_run<K: NodeId>(journal: &Journal<K>, id: &K) {
    assert_eq!(journal.runs_of(id), 0, "Expected {id:?} not to run");
}
