//! # Events emitted during a run.
//!
//! [`EventKind`] classifies events in two groups:
//! - **Run events**: start, stop request, completion, stop acknowledgement
//! - **Task events**: status changes and timeout hits
//!
//! The [`Event`] struct carries the optional metadata (task id, status, message,
//! attempt token, retry number, delays).
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases
//! monotonically. Status changes of one run are published in board order, so
//! every sink observes them in `seq` order.
//!
//! ## Example
//! ```rust
//! use batchvisor::{Event, EventKind, TaskStatus};
//!
//! let ev = Event::new(EventKind::StatusChanged)
//!     .with_task("acc-1")
//!     .with_status(TaskStatus::Retrying)
//!     .with_message("login failed")
//!     .with_retry(1);
//!
//! assert_eq!(ev.task.as_ref().map(|t| t.as_str()), Some("acc-1"));
//! assert_eq!(ev.message(), "login failed");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::{AttemptId, TaskId, TaskStatus};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run events ===
    /// Run accepted; every task is about to be announced as `Waiting`.
    ///
    /// Sets:
    /// - `message`: summary (task count, concurrency)
    RunStarted,

    /// Stop was requested by the caller (published once per run).
    StopRequested,

    /// Queue drained and every runner finished.
    RunCompleted,

    /// Dispatch loop exited because of stop; runners may still be unwinding.
    RunStopped,

    // === Task events ===
    /// A task changed status (or reported progress while `Running`).
    ///
    /// Sets:
    /// - `task`, `status`, `message`, `attempt`
    /// - `retry`: retry number of the attempt (0 = first attempt)
    /// - `delay_ms`: backoff before the next attempt (`Retrying` only)
    /// - `failure`: failure label (`Retrying`, `Error`, `Stopped`)
    StatusChanged,

    /// The per-attempt timer fired before the executor settled.
    ///
    /// Sets:
    /// - `task`, `attempt`, `retry`
    /// - `timeout_ms`: the configured timeout
    TimeoutHit,
}

/// Run event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task the event is about.
    pub task: Option<TaskId>,
    /// New status (for `StatusChanged`).
    pub status: Option<TaskStatus>,
    /// Human-readable detail.
    pub message: Option<Arc<str>>,
    /// Attempt token of the writer.
    pub attempt: Option<AttemptId>,
    /// Retry number (0 = first attempt).
    pub retry: Option<u32>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Backoff delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Failure label, see [`AttemptError::as_label`](crate::AttemptError::as_label).
    pub failure: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            status: None,
            message: None,
            attempt: None,
            retry: None,
            timeout_ms: None,
            delay_ms: None,
            failure: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: impl Into<TaskId>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a status.
    #[inline]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a message.
    #[inline]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the writer's attempt token.
    #[inline]
    pub fn with_attempt(mut self, attempt: AttemptId) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a retry number.
    #[inline]
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Attaches a failure label.
    #[inline]
    pub fn with_failure(mut self, label: &'static str) -> Self {
        self.failure = Some(label);
        self
    }

    /// Message or empty string.
    #[inline]
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// True for events that end a run's dispatch loop.
    #[inline]
    pub fn is_run_end(&self) -> bool {
        matches!(self.kind, EventKind::RunCompleted | EventKind::RunStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::RunStarted);
        let b = Event::new(EventKind::RunStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_compact_durations_saturate() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn test_run_end() {
        assert!(Event::new(EventKind::RunCompleted).is_run_end());
        assert!(Event::new(EventKind::RunStopped).is_run_end());
        assert!(!Event::new(EventKind::StopRequested).is_run_end());
    }
}
