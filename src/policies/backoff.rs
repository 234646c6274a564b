//! # Retry backoff.
//!
//! [`RetryBackoff`] decides how long a runner waits between a failed attempt and
//! the next one. The delay before retry `n` (1-based) is
//! `first × factor^(n-1)`, clamped to `max`, then jittered.
//!
//! The default is a constant 2s with no jitter.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use batchvisor::{Jitter, RetryBackoff};
//!
//! let backoff = RetryBackoff {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(4),
//!     factor: 2.0,
//!     jitter: Jitter::None,
//! };
//!
//! assert_eq!(backoff.delay(1), Duration::from_millis(500));
//! assert_eq!(backoff.delay(2), Duration::from_secs(1));
//! assert_eq!(backoff.delay(10), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::Jitter;

/// Delay policy between attempts of the same task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryBackoff {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor per retry (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: Jitter,
}

impl Default for RetryBackoff {
    /// Constant 2s between attempts.
    fn default() -> Self {
        Self::constant(Duration::from_secs(2))
    }
}

impl RetryBackoff {
    /// Same delay before every retry, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: Jitter::None,
        }
    }

    /// Delay before retry number `retry` (1-based; `0` is treated as `1`).
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
