//! Executor configuration.

use crate::errors::TaskflowError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Environment variable overriding the worker pool size.
pub const POOL_SIZE_ENV_VAR: &str = "TASKFLOW_POOL_SIZE";

/// Environment variable overriding the executor name.
pub const NAME_ENV_VAR: &str = "TASKFLOW_NAME";

/// Settings for a [`DependentTasksExecutor`](super::DependentTasksExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Name attached to every run's tracing span.
    pub name: String,
    /// Maximum number of tasks running at once.
    pub pool_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: "taskflow".to_string(),
            pool_size: std::thread::available_parallelism().map_or(4, NonZeroUsize::get),
        }
    }
}

impl ExecutorConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Parses and validates a JSON config. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> Result<Self, TaskflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from defaults overridden by `TASKFLOW_POOL_SIZE` and
    /// `TASKFLOW_NAME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool size is not a positive integer.
    pub fn from_env() -> Result<Self, TaskflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TaskflowError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(POOL_SIZE_ENV_VAR) {
            config.pool_size = raw.trim().parse::<usize>().map_err(|e| {
                TaskflowError::Config(format!("{POOL_SIZE_ENV_VAR}={raw:?} is not a valid pool size: {e}"))
            })?;
        }
        if let Some(name) = lookup(NAME_ENV_VAR) {
            config.name = name;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the values.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool size is zero.
    pub fn validate(&self) -> Result<(), TaskflowError> {
        if self.pool_size == 0 {
            return Err(TaskflowError::Config("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
