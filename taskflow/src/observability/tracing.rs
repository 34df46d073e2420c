//! Logging setup and timing helpers built on `tracing`.
//!
//! The library only emits events; installing a subscriber is left to the
//! application. [`init_tracing`] is a convenience for binaries, tests and
//! benchmarks:
//!
//! 1. the `TASKFLOW_LOG` environment variable is parsed as an `EnvFilter`
//!    directive (e.g. `"taskflow=debug"`)
//! 2. otherwise the level defaults to `info`
//!
//! Logs go to stderr.

use crate::errors::TaskflowError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "TASKFLOW_LOG";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Installs a global `tracing` subscriber.
///
/// # Errors
///
/// Returns a configuration error if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), TaskflowError> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| TaskflowError::Config(format!("failed to install tracing subscriber: {e}")))
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> Duration {
        self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("test_span");
        assert_eq!(timer.name(), "test_span");
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
        assert!(timer.finish() >= Duration::from_millis(10));
    }

    #[test]
    fn test_log_format_serialize() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), r#""json""#);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn test_init_tracing_twice_fails() {
        // The first call may race with other tests installing a subscriber,
        // but at most one call in the process can succeed.
        let first = init_tracing(LogFormat::Text);
        let second = init_tracing(LogFormat::Json);
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TaskflowError::Config(_))));
    }
}
