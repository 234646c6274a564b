//! # Configuration sources.
//!
//! A [`ConfigSource`] is read exactly once, when a run starts. The loaded
//! [`RunConfig`] is validated before any task is admitted, so a malformed
//! configuration fails the start call instead of the run.
//!
//! Provided sources:
//! - [`RunConfig`] itself (a fixed value)
//! - [`JsonSource`] a JSON document, inline or on disk
//!
//! ## JSON shape
//! ```json
//! { "maxConcurrency": 3, "interLaunchDelayMs": 1500, "timeoutSec": 120, "maxRetries": 2 }
//! ```
//! Optional: `retryBackoffMs`, `pollIntervalMs`, `stopGraceSec`.

use std::path::PathBuf;

use crate::config::{
    ConfigError,
    run::{RawRunConfig, RunConfig},
};

/// Point-in-time provider of a [`RunConfig`].
pub trait ConfigSource: Send + Sync {
    /// Reads and validates the configuration.
    fn load(&self) -> Result<RunConfig, ConfigError>;
}

impl ConfigSource for RunConfig {
    fn load(&self) -> Result<RunConfig, ConfigError> {
        self.validate()?;
        Ok(self.clone())
    }
}

#[derive(Debug, Clone)]
enum Origin {
    Inline(String),
    File(PathBuf),
}

/// JSON-backed configuration source.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use batchvisor::{ConfigSource, JsonSource};
///
/// let src = JsonSource::inline(r#"{ "maxConcurrency": 2, "timeoutSec": 30 }"#);
/// let cfg = src.load().unwrap();
/// assert_eq!(cfg.max_concurrent, 2);
/// assert_eq!(cfg.timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct JsonSource {
    origin: Origin,
}

impl JsonSource {
    /// Source backed by an in-memory JSON document.
    pub fn inline(doc: impl Into<String>) -> Self {
        Self {
            origin: Origin::Inline(doc.into()),
        }
    }

    /// Source backed by a JSON file, read on every [`load`](ConfigSource::load).
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }

    fn parse(doc: &str) -> Result<RunConfig, ConfigError> {
        let raw: RawRunConfig = serde_json::from_str(doc)?;
        let cfg = RunConfig::from(raw);
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ConfigSource for JsonSource {
    fn load(&self) -> Result<RunConfig, ConfigError> {
        match &self.origin {
            Origin::Inline(doc) => Self::parse(doc),
            Origin::File(path) => {
                let doc = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::parse(&doc)
            }
        }
    }
}
