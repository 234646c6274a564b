//! # Task status and attempt identity.
//!
//! ## Lifecycle
//! ```text
//! Waiting ──► Running ──► Success
//!   │           │  ▲  └──► Error
//!   │           │  │  └──► Stopped
//!   │           ▼  │
//!   │        Retrying ───► Error | Stopped
//!   └──────────────────────► Stopped   (never launched)
//! ```
//! `Running → Running` carries progress messages within one attempt.
//! Terminal statuses accept no further updates.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Status of a task as seen by status sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Queued, not launched yet.
    Waiting,
    /// An attempt is in flight.
    Running,
    /// The last attempt failed; waiting out the retry backoff.
    Retrying,
    /// The executor succeeded.
    Success,
    /// Retry budget exhausted.
    Error,
    /// Cancelled by the caller.
    Stopped,
}

impl TaskStatus {
    /// True for `Success`, `Error` and `Stopped`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Error | TaskStatus::Stopped
        )
    }

    /// True while the task occupies a slot (`Running` or `Retrying`).
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Retrying)
    }

    /// Whether `self → next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match (self, next) {
            (Waiting, Running | Stopped) => true,
            (Running, Running | Retrying | Success | Error | Stopped) => true,
            (Retrying, Running | Error | Stopped) => true,
            _ => false,
        }
    }

    /// Short lowercase label.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskStatus::Waiting => "waiting",
            TaskStatus::Running => "running",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_label())
    }
}

/// Attempt tokens are unique for the lifetime of the process.
static ATTEMPT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Token identifying one attempt of one task.
///
/// The task board only applies an update when the writer's token is the task's
/// current one, so a superseded attempt can never overwrite a newer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Token held by a task before its first attempt.
    pub const INITIAL: AttemptId = AttemptId(0);

    /// Allocates a fresh token.
    pub(crate) fn next() -> Self {
        AttemptId(ATTEMPT_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value (for logs).
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
