//! Retry delay policies.
//!
//! ## Contents
//! - [`RetryBackoff`] how long to wait before the next attempt (first / factor / max + jitter)
//! - [`Jitter`] randomization applied to that delay
//!
//! ## Wiring
//! ```text
//! RunConfig { max_retries, retry_backoff: RetryBackoff, .. }
//!      └─► core::runner::TaskRunner uses:
//!           - max_retries to decide retry/settle
//!           - retry_backoff.delay(retry) to pause before the next attempt
//! ```

mod backoff;
mod jitter;

pub use backoff::RetryBackoff;
pub use jitter::Jitter;
