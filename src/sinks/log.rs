//! # LogSink: run events as `tracing` records
//!
//! Maps every [`Event`] onto a `tracing` level with structured fields. Install a
//! `tracing` subscriber (e.g. `tracing-subscriber` `fmt` + `EnvFilter`) to see them.
//!
//! | Event                        | Level   |
//! |------------------------------|---------|
//! | `StatusChanged` → Waiting    | trace   |
//! | `StatusChanged` → Running    | info    |
//! | `StatusChanged` → Retrying   | debug   |
//! | `StatusChanged` → Success    | info    |
//! | `StatusChanged` → Stopped    | info    |
//! | `StatusChanged` → Error      | error   |
//! | `TimeoutHit`                 | warn    |
//! | run start / stop / completion| info    |

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::events::{Event, EventKind};
use crate::sinks::StatusSink;
use crate::tasks::{TaskId, TaskStatus};

/// Built-in sink writing run events through `tracing`.
#[derive(Default)]
pub struct LogSink;

impl LogSink {
    /// Construct a new [`LogSink`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn message_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::RunStarted => "run started",
        EventKind::StopRequested => "stop requested",
        EventKind::RunCompleted => "run completed (queue drained, no active runners)",
        EventKind::RunStopped => "run stopped (admission halted)",
        EventKind::StatusChanged => "task status changed",
        EventKind::TimeoutHit => "attempt exceeded its configured timeout",
    }
}

fn log_status(e: &Event, status: TaskStatus) {
    let task = e.task.as_ref().map(TaskId::as_str).unwrap_or("unknown");
    let attempt = e.attempt.map(|a| a.get()).unwrap_or(0);
    let retry = e.retry.unwrap_or(0);
    let message = e.message();

    match status {
        TaskStatus::Waiting => trace!(task, "{message}"),
        TaskStatus::Running => info!(task, attempt, retry, "{message}"),
        TaskStatus::Retrying => debug!(
            task,
            attempt,
            retry,
            delay_ms = e.delay_ms.unwrap_or(0),
            failure = e.failure.unwrap_or("unknown"),
            "{message}",
        ),
        TaskStatus::Success => info!(task, attempt, retry, "{message}"),
        TaskStatus::Stopped => info!(task, attempt, "{message}"),
        TaskStatus::Error => error!(
            task,
            attempt,
            retry,
            failure = e.failure.unwrap_or("unknown"),
            "{message}",
        ),
    }
}

#[async_trait]
impl StatusSink for LogSink {
    async fn on_status(&self, task: &TaskId, status: TaskStatus, message: &str) {
        info!(task = task.as_str(), status = status.as_label(), "{message}");
    }

    async fn on_event(&self, e: &Event) {
        let msg = message_for(e.kind);

        match e.kind {
            EventKind::RunStarted => info!(detail = e.message(), "{msg}"),
            EventKind::StopRequested => info!("{msg}"),
            EventKind::RunCompleted => info!(detail = e.message(), "{msg}"),
            EventKind::RunStopped => info!(detail = e.message(), "{msg}"),
            EventKind::TimeoutHit => warn!(
                task = e.task.as_ref().map(TaskId::as_str).unwrap_or("unknown"),
                retry = e.retry.unwrap_or(0),
                timeout_ms = e.timeout_ms.unwrap_or(0),
                "{msg}",
            ),
            EventKind::StatusChanged => match e.status {
                Some(status) => log_status(e, status),
                None => debug!("{msg}"),
            },
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
