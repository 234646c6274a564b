//! Error types used by the batchvisor runtime, its runners and executors.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors surfaced to the caller by [`Scheduler::start`](crate::Scheduler::start)
//!   and [`RunHandle::join_within`](crate::RunHandle::join_within).
//! - [`ExecutorError`]: what a worker executor reports when one attempt fails.
//! - [`AttemptError`]: the classified failure of one attempt, as seen by the runner.
//!
//! Each provides `as_label` (stable snake_case label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// # Errors produced by the scheduler itself.
///
/// These are the only failures that leave the scheduler as errors. Everything an
/// executor does wrong is converted into a task status instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Run configuration could not be loaded or is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two tasks in the same run share an id.
    #[error("duplicate task id {id:?} in run")]
    DuplicateTask {
        /// The repeated id.
        id: String,
    },

    /// The previous run still has a live dispatch loop or in-flight runners.
    #[error("previous run is still active ({active} runner(s) in flight)")]
    RunInProgress {
        /// Runners still holding a slot.
        active: usize,
    },

    /// Runners did not settle within the grace period given to `join_within`.
    #[error("grace {grace:?} exceeded; unsettled: {unsettled:?}")]
    GraceExceeded {
        /// The grace duration that elapsed.
        grace: Duration,
        /// Ids of tasks that had not reached a terminal status.
        unsettled: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchvisor::RuntimeError;
    ///
    /// let err = RuntimeError::DuplicateTask { id: "acc-1".into() };
    /// assert_eq!(err.as_label(), "runtime_duplicate_task");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::DuplicateTask { .. } => "runtime_duplicate_task",
            RuntimeError::RunInProgress { .. } => "runtime_run_in_progress",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Failure reported by a worker executor for one attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The attempt failed; the reason is shown to the status sink.
    #[error("{reason}")]
    Failed {
        /// Opaque, human-readable reason.
        reason: String,
    },

    /// The executor observed the attempt's cancellation token and unwound.
    #[error("cancelled")]
    Cancelled,
}

impl ExecutorError {
    /// Shorthand for [`ExecutorError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        ExecutorError::Failed {
            reason: reason.into(),
        }
    }
}

impl From<String> for ExecutorError {
    fn from(reason: String) -> Self {
        ExecutorError::Failed { reason }
    }
}

impl From<&str> for ExecutorError {
    fn from(reason: &str) -> Self {
        ExecutorError::failed(reason)
    }
}

/// # Classified failure of a single attempt.
///
/// `Stopped` always takes precedence over every other kind and is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The run was stopped by the caller.
    #[error("stopped")]
    Stopped,

    /// The per-task timer elapsed before the executor settled.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The executor reported a failure.
    #[error("{reason}")]
    Executor {
        /// Reason reported by the executor.
        reason: String,
    },

    /// Anything not otherwise recognized (executor panic, aborted invocation).
    #[error("{reason}")]
    Unclassified {
        /// Raw reason, surfaced verbatim.
        reason: String,
    },
}

impl AttemptError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchvisor::AttemptError;
    /// use std::time::Duration;
    ///
    /// let err = AttemptError::Timeout { timeout: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "attempt_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AttemptError::Stopped => "attempt_stopped",
            AttemptError::Timeout { .. } => "attempt_timeout",
            AttemptError::Executor { .. } => "attempt_failed",
            AttemptError::Unclassified { .. } => "attempt_unclassified",
        }
    }

    /// Everything except [`AttemptError::Stopped`] may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Stopped)
    }

    /// True for [`AttemptError::Stopped`].
    pub fn is_stopped(&self) -> bool {
        matches!(self, AttemptError::Stopped)
    }
}

impl From<ExecutorError> for AttemptError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Failed { reason } => AttemptError::Executor { reason },
            ExecutorError::Cancelled => AttemptError::Stopped,
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(boxed.as_ref()), "owned boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_executor_error_classification() {
        assert_eq!(
            AttemptError::from(ExecutorError::failed("login rejected")),
            AttemptError::Executor {
                reason: "login rejected".into()
            }
        );
        assert_eq!(
            AttemptError::from(ExecutorError::Cancelled),
            AttemptError::Stopped
        );
    }

    #[test]
    fn test_only_stopped_is_final() {
        assert!(!AttemptError::Stopped.is_retryable());
        assert!(
            AttemptError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(AttemptError::Executor { reason: "x".into() }.is_retryable());
        assert!(AttemptError::Unclassified { reason: "x".into() }.is_retryable());
    }

    #[test]
    fn test_reasons_are_surfaced_verbatim() {
        let err = AttemptError::Unclassified {
            reason: "executor panicked: index out of bounds".into(),
        };
        assert_eq!(err.to_string(), "executor panicked: index out of bounds");
        assert_eq!(ExecutorError::from("bad token").to_string(), "bad token");
    }
}
