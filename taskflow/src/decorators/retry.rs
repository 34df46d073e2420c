//! Retry decorator.
//!
//! A failed execution is retried until it succeeds or the attempt budget in
//! [`RetryConfig`] runs out. The pause between attempts grows according to a
//! [`BackoffStrategy`] and is randomized by a [`JitterStrategy`].

use super::TaskDecorator;
use crate::core::{NodeId, TaskOutput};
use crate::errors::TaskError;
use crate::task::Task;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// How the pause grows with each failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Doubles after every failure.
    #[default]
    Exponential,
    /// Grows by `base` after every failure.
    Linear,
    /// Always `base`.
    Constant,
}

impl BackoffStrategy {
    /// Pause in milliseconds after the `failure`-th failure (1-based), before capping.
    #[must_use]
    pub fn delay_ms(self, base_ms: u64, failure: usize) -> u64 {
        let steps = u32::try_from(failure.saturating_sub(1)).unwrap_or(u32::MAX);
        match self {
            Self::Exponential => base_ms.saturating_mul(2u64.saturating_pow(steps)),
            Self::Linear => base_ms.saturating_mul(u64::from(steps).saturating_add(1)),
            Self::Constant => base_ms,
        }
    }
}

/// Randomization applied on top of the backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Use the backoff as is.
    None,
    /// Anywhere between zero and the backoff.
    #[default]
    Full,
    /// At least half of the backoff.
    Equal,
    /// Between `base` and three times the previous pause.
    Decorrelated,
}

impl JitterStrategy {
    fn apply(self, delay: u64, config: &RetryConfig, previous: Option<u64>) -> u64 {
        let mut rng = rand::thread_rng();
        match self {
            Self::None => delay,
            Self::Full if delay == 0 => 0,
            Self::Full => rng.gen_range(0..=delay),
            Self::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rng.gen_range(0..=half)
                }
            }
            Self::Decorrelated => {
                let floor = config.base_delay_ms.min(config.max_delay_ms);
                let ceiling = previous
                    .unwrap_or(config.base_delay_ms)
                    .saturating_mul(3)
                    .min(config.max_delay_ms);
                if ceiling <= floor {
                    floor
                } else {
                    rng.gen_range(floor..=ceiling)
                }
            }
        }
    }
}

/// Attempt budget and pacing of a [`Retry`] decorator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts, the first one included. Zero behaves like one.
    pub max_attempts: usize,
    /// Base pause in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any pause, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth of the pause.
    pub backoff: BackoffStrategy,
    /// Randomization of the pause.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries right away, with no pause.
    #[must_use]
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff: BackoffStrategy::Constant,
            jitter: JitterStrategy::None,
        }
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base pause.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the pause cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Starts a fresh schedule for one execution.
    #[must_use]
    pub fn schedule(&self) -> RetrySchedule<'_> {
        RetrySchedule {
            config: self,
            failures: 0,
            previous: None,
        }
    }
}

/// Pauses for one execution of a retried task.
#[derive(Debug)]
pub struct RetrySchedule<'a> {
    config: &'a RetryConfig,
    failures: usize,
    previous: Option<u64>,
}

impl RetrySchedule<'_> {
    /// Number of failures recorded so far.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Records a failure and returns the pause before the next attempt, or
    /// `None` when the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.config.max_attempts {
            return None;
        }

        let config = self.config;
        let backoff = config
            .backoff
            .delay_ms(config.base_delay_ms, self.failures)
            .min(config.max_delay_ms);
        let delay = config.jitter.apply(backoff, config, self.previous);
        self.previous = Some(delay);
        Some(Duration::from_millis(delay))
    }
}

/// Re-runs the wrapped task when it returns an error.
///
/// Engine rejections are never retried. Panics are not caught here; they
/// surface through the engine as they would without the decorator.
#[derive(Debug)]
pub struct Retry {
    config: RetryConfig,
    attempts: AtomicUsize,
}

impl Retry {
    /// Creates a retry decorator.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the retry configuration.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total number of times the wrapped task was invoked.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K: NodeId, R: TaskOutput> TaskDecorator<K, R> for Retry {
    async fn execute(&self, target: &dyn Task<K, R>) -> Result<R, TaskError> {
        let mut schedule = self.config.schedule();

        loop {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let err = match target.execute().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_engine_failure() => return Err(err),
                Err(err) => err,
            };

            let Some(delay) = schedule.next_delay() else {
                warn!(
                    task = ?target.id(),
                    attempts = schedule.failures(),
                    error = %err,
                    "giving up on task"
                );
                return Err(err);
            };

            debug!(
                task = ?target.id(),
                failures = schedule.failures(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "task failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorators::DelegatingTask;
    use crate::task::FnTask;
    use std::sync::Arc;

    fn flaky(failures: usize) -> (Arc<AtomicUsize>, Arc<dyn Task<&'static str, usize>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let task: FnTask<&'static str, usize, _> = FnTask::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                anyhow::bail!("transient failure {n}");
            }
            Ok(n)
        });
        (calls, Arc::new(task))
    }

    fn delays(config: &RetryConfig) -> Vec<u128> {
        let mut schedule = config.schedule();
        std::iter::from_fn(|| schedule.next_delay())
            .map(|d| d.as_millis())
            .collect()
    }

    #[test]
    fn test_backoff_curves() {
        assert_eq!(BackoffStrategy::Exponential.delay_ms(100, 3), 400);
        assert_eq!(BackoffStrategy::Linear.delay_ms(50, 3), 150);
        assert_eq!(BackoffStrategy::Constant.delay_ms(50, 3), 50);
        assert_eq!(BackoffStrategy::Exponential.delay_ms(u64::MAX, 70), u64::MAX);
    }

    #[test]
    fn test_schedule_without_jitter() {
        let config = RetryConfig::new()
            .with_max_attempts(5)
            .with_base_delay_ms(100)
            .with_max_delay_ms(500)
            .with_jitter(JitterStrategy::None);

        assert_eq!(delays(&config), vec![100, 200, 400, 500]);
    }

    #[test]
    fn test_jitter_bounds() {
        let full = RetryConfig::new()
            .with_max_attempts(50)
            .with_base_delay_ms(10)
            .with_backoff(BackoffStrategy::Constant);
        assert!(delays(&full).iter().all(|d| *d <= 10));

        let equal = full.clone().with_jitter(JitterStrategy::Equal);
        assert!(delays(&equal).iter().all(|d| (5..=10).contains(d)));

        let decorrelated = full.with_jitter(JitterStrategy::Decorrelated).with_max_delay_ms(40);
        assert!(delays(&decorrelated).iter().all(|d| (10..=40).contains(d)));
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 5, "jitter": "equal"}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.backoff, BackoffStrategy::Exponential);
        assert_eq!(config.jitter, JitterStrategy::Equal);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (calls, inner) = flaky(2);
        let task = DelegatingTask::retrying(inner, RetryConfig::immediate(3));

        assert_eq!(task.execute().await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(task.decorator().attempts(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (calls, inner) = flaky(10);
        let task = DelegatingTask::retrying(
            inner,
            RetryConfig::new()
                .with_max_attempts(2)
                .with_base_delay_ms(1)
                .with_jitter(JitterStrategy::None),
        );

        let err = task.execute().await.unwrap_err();
        assert_eq!(err, TaskError::failed("transient failure 1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let (calls, inner) = flaky(1);
        let task = DelegatingTask::retrying(inner, RetryConfig::immediate(0));

        assert!(task.execute().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
