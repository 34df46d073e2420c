//! Testing utilities for taskflow graphs.
//!
//! This module provides:
//! - Mock tasks (recording, failing, slow, panicking)
//! - A shared execution journal for ordering checks
//! - Assertions over run results

mod assertions;
mod mocks;

pub use assertions::{
    assert_all_succeeded, assert_not_run, assert_ran_before, assert_status, assert_statuses,
};
pub use mocks::{
    FailingTask, Journal, JournalEntry, PanickingTask, RecordingTask, SlowTask,
};
