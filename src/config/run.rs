//! # Run configuration.
//!
//! [`RunConfig`] is the immutable snapshot a run is started with. It is read once
//! from a [`ConfigSource`](crate::ConfigSource) and shared (behind an `Arc`) by the
//! dispatch loop, every task runner and every executor attempt.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-attempt timeout
//! - `max_retries = 0` → one attempt only
//! - `launch_delay = 0s` → no pacing between launches
//! - `stop_grace = 0s` → in-flight attempts become `Stopped` as soon as stop is observed

use std::time::Duration;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::policies::RetryBackoff;

/// Parameters of one run.
///
/// ## Field semantics
/// - `max_concurrent`: slots available to runners (must be `>= 1`)
/// - `launch_delay`: pause after each launch before the dispatch loop continues
/// - `timeout`: per-attempt timeout (`0s` = unbounded)
/// - `max_retries`: retries after the first attempt
/// - `retry_backoff`: delay between a failed attempt and the next one
/// - `poll_interval`: re-check period of the dispatch loop while all slots are busy
/// - `stop_grace`: how long an in-flight attempt may keep running after stop
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Maximum number of runners holding a slot at once.
    pub max_concurrent: usize,

    /// Pause after each launch (pacing).
    pub launch_delay: Duration,

    /// Per-attempt timeout.
    ///
    /// - `Duration::ZERO` = the attempt may run forever
    /// - `> 0` = attempt is abandoned and classified as timeout after this long
    pub timeout: Duration,

    /// Number of retries after the first attempt fails.
    pub max_retries: u32,

    /// Delay policy between attempts.
    pub retry_backoff: RetryBackoff,

    /// Dispatch loop re-check period while no slot is free.
    pub poll_interval: Duration,

    /// Time given to an in-flight executor to settle after stop.
    ///
    /// A success inside the grace is kept; a failure or an expired grace
    /// settles the task as `Stopped`.
    pub stop_grace: Duration,
}

impl Default for RunConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 3`
    /// - `launch_delay = 0s`
    /// - `timeout = 0s` (unbounded)
    /// - `max_retries = 0`
    /// - `retry_backoff = 2s constant`
    /// - `poll_interval = 200ms`
    /// - `stop_grace = 10s`
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            launch_delay: Duration::ZERO,
            timeout: Duration::ZERO,
            max_retries: 0,
            retry_backoff: RetryBackoff::default(),
            poll_interval: Duration::from_millis(200),
            stop_grace: Duration::from_secs(10),
        }
    }
}

impl RunConfig {
    /// Returns the per-attempt timeout as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(d)` → attempt timer armed with `d`
    #[inline]
    pub fn attempt_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Total attempts a task may get (`max_retries + 1`).
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Rejects configurations a run cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent < 1 {
            return Err(ConfigError::InvalidConcurrency {
                value: self.max_concurrent,
            });
        }
        if self.poll_interval == Duration::ZERO {
            return Err(ConfigError::InvalidPollInterval);
        }
        Ok(())
    }
}

/// Wire form of [`RunConfig`] as produced by a settings store.
///
/// Every field is optional; missing fields take the [`RunConfig::default`] values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawRunConfig {
    #[serde(default = "default_max_concurrency")]
    max_concurrency: usize,

    #[serde(default)]
    inter_launch_delay_ms: u64,

    #[serde(default)]
    timeout_sec: u64,

    #[serde(default)]
    max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    #[serde(default = "default_stop_grace_sec")]
    stop_grace_sec: u64,
}

fn default_max_concurrency() -> usize {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_stop_grace_sec() -> u64 {
    10
}

impl From<RawRunConfig> for RunConfig {
    fn from(raw: RawRunConfig) -> Self {
        Self {
            max_concurrent: raw.max_concurrency,
            launch_delay: Duration::from_millis(raw.inter_launch_delay_ms),
            timeout: Duration::from_secs(raw.timeout_sec),
            max_retries: raw.max_retries,
            retry_backoff: RetryBackoff::constant(Duration::from_millis(raw.retry_backoff_ms)),
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            stop_grace: Duration::from_secs(raw.stop_grace_sec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.max_concurrent, 3);
        assert_eq!(cfg.poll_interval, Duration::from_millis(200));
        assert_eq!(cfg.retry_backoff.delay(1), Duration::from_secs(2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.attempt_timeout(), None);

        let cfg = RunConfig {
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(cfg.attempt_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_max_attempts() {
        let cfg = RunConfig {
            max_retries: 2,
            ..Default::default()
        };
        assert_eq!(cfg.max_attempts(), 3);
        assert_eq!(RunConfig::default().max_attempts(), 1);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let cfg = RunConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let cfg = RunConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPollInterval)
        ));
    }

    #[test]
    fn test_raw_defaults_match_config_defaults() {
        let raw: RawRunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(RunConfig::from(raw), RunConfig::default());
    }
}
