use std::path::PathBuf;

use thiserror::Error;

/// Error returned by a [`ConfigSource`](crate::ConfigSource) or by
/// [`RunConfig::validate`](crate::RunConfig::validate).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `max_concurrent` must be at least one.
    #[error("max concurrency must be >= 1 (got {value})")]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// A zero poll interval would spin the dispatch loop.
    #[error("poll interval must be > 0")]
    InvalidPollInterval,

    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid JSON for a run configuration.
    #[error("invalid run configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidConcurrency { .. } => "config_invalid_concurrency",
            ConfigError::InvalidPollInterval => "config_invalid_poll_interval",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse(_) => "config_parse",
        }
    }
}
