//! Timing decorator.

use super::TaskDecorator;
use crate::core::{NodeId, TaskOutput};
use crate::errors::TaskError;
use crate::observability::SpanTimer;
use crate::task::Task;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

/// Measures every execution of the wrapped task.
#[derive(Debug, Default)]
pub struct Timing {
    last: Mutex<Option<Duration>>,
    total: Mutex<Duration>,
}

impl Timing {
    /// Creates a new timing decorator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of the most recent execution.
    #[must_use]
    pub fn last_duration(&self) -> Option<Duration> {
        *self.last.lock()
    }

    /// Sum of all execution durations.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        *self.total.lock()
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> TaskDecorator<K, R> for Timing {
    async fn execute(&self, target: &dyn Task<K, R>) -> Result<R, TaskError> {
        let timer = SpanTimer::start(format!("{:?}", target.id()));
        let outcome = target.execute().await;
        let elapsed = timer.elapsed();

        *self.last.lock() = Some(elapsed);
        *self.total.lock() += elapsed;

        debug!(
            task = timer.name(),
            duration_ms = timer.elapsed_ms(),
            ok = outcome.is_ok(),
            "task execution timed"
        );

        outcome
    }
}
