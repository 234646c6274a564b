//! # Task board: the single writer of task state.
//!
//! Every status/message change of a run goes through [`TaskBoard`]. A write is
//! applied only when:
//! 1. the writer presents the task's current [`AttemptId`],
//! 2. the task is not terminal,
//! 3. the edge is allowed by [`TaskStatus::can_transition_to`].
//!
//! Rejected writes are dropped with a `debug` record. Accepted writes are
//! published on the run's bus while the board lock is held, so sinks observe
//! per-task changes in exactly the order they were applied.
//!
//! ```text
//! runner/attempt ──► apply(id, attempt, change)
//!                        ├─ stale attempt   ─► dropped
//!                        ├─ terminal task   ─► dropped
//!                        ├─ illegal edge    ─► dropped
//!                        └─ ok ─► entry updated ─► Bus::publish(StatusChanged)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::error::AttemptError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{AttemptId, TaskId, TaskStatus};

/// Point-in-time view of one task.
#[derive(Clone, Debug)]
pub struct TaskSnapshot<O> {
    /// Task identity.
    pub id: TaskId,
    /// Last applied status.
    pub status: TaskStatus,
    /// Last applied message.
    pub message: String,
    /// Token of the current (or last) attempt.
    pub attempt: AttemptId,
    /// Retry number of the current (or last) attempt.
    pub retries: u32,
    /// Classified failure for `Error`/`Stopped` tasks.
    pub failure: Option<AttemptError>,
    /// Executor output for `Success` tasks.
    pub output: Option<O>,
}

struct Entry<O> {
    status: TaskStatus,
    message: Arc<str>,
    attempt: AttemptId,
    retries: u32,
    failure: Option<AttemptError>,
    output: Option<O>,
}

/// One requested write.
struct Change<O> {
    status: TaskStatus,
    message: Arc<str>,
    progress: bool,
    delay: Option<Duration>,
    failure: Option<AttemptError>,
    output: Option<O>,
}

impl<O> Change<O> {
    fn to(status: TaskStatus, message: impl Into<Arc<str>>) -> Self {
        Self {
            status,
            message: message.into(),
            progress: false,
            delay: None,
            failure: None,
            output: None,
        }
    }
}

/// Mutex-protected state of every task of one run.
pub(crate) struct TaskBoard<O> {
    entries: Mutex<HashMap<TaskId, Entry<O>>>,
    order: Vec<TaskId>,
    bus: Bus,
}

impl<O> TaskBoard<O> {
    /// Creates the board with every task `Waiting`. Ids must be unique.
    pub fn new(ids: Vec<TaskId>, bus: Bus) -> Self {
        let entries = ids
            .iter()
            .map(|id| {
                let entry = Entry {
                    status: TaskStatus::Waiting,
                    message: Arc::from("queued"),
                    attempt: AttemptId::INITIAL,
                    retries: 0,
                    failure: None,
                    output: None,
                };
                (id.clone(), entry)
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
            order: ids,
            bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Entry<O>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publishes the initial `Waiting` status of every task, in caller order.
    pub fn announce(&self) {
        let entries = self.lock();
        for id in &self.order {
            if let Some(entry) = entries.get(id) {
                self.bus.publish(
                    Event::new(EventKind::StatusChanged)
                        .with_task(id.clone())
                        .with_status(entry.status)
                        .with_message(Arc::clone(&entry.message))
                        .with_attempt(entry.attempt),
                );
            }
        }
    }

    /// Assigns a fresh attempt token to `id` and records its retry number.
    ///
    /// Returns `None` when the task is unknown or already terminal.
    pub fn begin_attempt(&self, id: &TaskId, retry: u32) -> Option<AttemptId> {
        let mut entries = self.lock();
        let entry = entries.get_mut(id)?;
        if entry.status.is_terminal() {
            return None;
        }
        entry.attempt = AttemptId::next();
        entry.retries = retry;
        Some(entry.attempt)
    }

    /// `Waiting | Retrying → Running` at the start of an attempt.
    pub fn running(&self, id: &TaskId, attempt: AttemptId, message: impl Into<Arc<str>>) -> bool {
        self.apply(id, attempt, Change::to(TaskStatus::Running, message))
    }

    /// Progress message of the current attempt (`Running → Running`).
    pub fn report(&self, id: &TaskId, attempt: AttemptId, message: impl Into<Arc<str>>) -> bool {
        let mut change = Change::to(TaskStatus::Running, message);
        change.progress = true;
        self.apply(id, attempt, change)
    }

    /// `Running → Retrying` after a retryable failure.
    pub fn retrying(
        &self,
        id: &TaskId,
        attempt: AttemptId,
        err: &AttemptError,
        delay: Duration,
    ) -> bool {
        let mut change = Change::to(TaskStatus::Retrying, err.to_string());
        change.delay = Some(delay);
        change.failure = Some(err.clone());
        self.apply(id, attempt, change)
    }

    /// `Running → Success` with the executor's output.
    pub fn succeed(
        &self,
        id: &TaskId,
        attempt: AttemptId,
        output: O,
        message: impl Into<Arc<str>>,
    ) -> bool {
        let mut change = Change::to(TaskStatus::Success, message);
        change.output = Some(output);
        self.apply(id, attempt, change)
    }

    /// Terminal failure: `Stopped` for [`AttemptError::Stopped`], `Error` otherwise.
    pub fn fail(
        &self,
        id: &TaskId,
        attempt: AttemptId,
        err: AttemptError,
        message: impl Into<Arc<str>>,
    ) -> bool {
        let status = if err.is_stopped() {
            TaskStatus::Stopped
        } else {
            TaskStatus::Error
        };
        let mut change = Change::to(status, message);
        change.failure = Some(err);
        self.apply(id, attempt, change)
    }

    /// `Waiting → Stopped` for a task that was never launched.
    pub fn stop_pending(&self, id: &TaskId) -> bool {
        self.fail(
            id,
            AttemptId::INITIAL,
            AttemptError::Stopped,
            "stopped before launch",
        )
    }

    fn apply(&self, id: &TaskId, attempt: AttemptId, change: Change<O>) -> bool {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(id) else {
            debug!(task = %id, "update for unknown task dropped");
            return false;
        };

        if entry.attempt != attempt {
            debug!(
                task = %id,
                attempt = %attempt,
                current = %entry.attempt,
                status = %change.status,
                "stale update dropped",
            );
            return false;
        }
        if entry.status.is_terminal()
            || !entry.status.can_transition_to(change.status)
            || (change.progress && entry.status != TaskStatus::Running)
        {
            debug!(
                task = %id,
                attempt = %attempt,
                from = %entry.status,
                to = %change.status,
                "illegal transition dropped",
            );
            return false;
        }

        entry.status = change.status;
        entry.message = change.message;
        if !change.progress {
            entry.failure = change.failure;
        }
        if let Some(output) = change.output {
            entry.output = Some(output);
        }

        let mut ev = Event::new(EventKind::StatusChanged)
            .with_task(id.clone())
            .with_status(entry.status)
            .with_message(Arc::clone(&entry.message))
            .with_attempt(attempt)
            .with_retry(entry.retries);
        if let Some(delay) = change.delay {
            ev = ev.with_delay(delay);
        }
        if let Some(failure) = &entry.failure {
            ev = ev.with_failure(failure.as_label());
        }
        self.bus.publish(ev);
        true
    }

    /// Current status of `id`.
    #[cfg(test)]
    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.lock().get(id).map(|e| e.status)
    }

    /// Ids of tasks that have not reached a terminal status, in caller order.
    pub fn unsettled(&self) -> Vec<TaskId> {
        let entries = self.lock();
        self.order
            .iter()
            .filter(|id| entries.get(*id).is_some_and(|e| !e.status.is_terminal()))
            .cloned()
            .collect()
    }

    /// Moves every entry out as a snapshot (outputs included), in caller order.
    pub fn take_snapshot(&self) -> Vec<TaskSnapshot<O>> {
        let mut entries = self.lock();
        self.order
            .iter()
            .filter_map(|id| {
                entries.get_mut(id).map(|e| TaskSnapshot {
                    id: id.clone(),
                    status: e.status,
                    message: e.message.to_string(),
                    attempt: e.attempt,
                    retries: e.retries,
                    failure: e.failure.clone(),
                    output: e.output.take(),
                })
            })
            .collect()
    }
}

impl<O: Clone> TaskBoard<O> {
    /// Copies every entry, in caller order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot<O>> {
        let entries = self.lock();
        self.order
            .iter()
            .filter_map(|id| entries.get(id).map(|e| Self::view(id, e)))
            .collect()
    }

    /// Copies one entry.
    pub fn get(&self, id: &str) -> Option<TaskSnapshot<O>> {
        let entries = self.lock();
        entries
            .get_key_value(id)
            .map(|(id, e)| Self::view(id, e))
    }

    fn view(id: &TaskId, e: &Entry<O>) -> TaskSnapshot<O> {
        TaskSnapshot {
            id: id.clone(),
            status: e.status,
            message: e.message.to_string(),
            attempt: e.attempt,
            retries: e.retries,
            failure: e.failure.clone(),
            output: e.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::SinkSet;

    fn board(ids: &[&str]) -> (TaskBoard<u32>, Bus) {
        let bus = Bus::new(64, Arc::new(SinkSet::new(Vec::new())));
        let ids = ids.iter().map(|s| TaskId::from(*s)).collect();
        (TaskBoard::new(ids, bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (board, bus) = board(&["a"]);
        let mut rx = bus.subscribe();
        let id = TaskId::from("a");

        let attempt = board.begin_attempt(&id, 0).unwrap();
        assert!(board.running(&id, attempt, "attempt started"));
        assert!(board.report(&id, attempt, "logged in"));
        assert!(board.succeed(&id, attempt, 7, "done"));

        let snap = board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Success);
        assert_eq!(snap.output, Some(7));
        assert_eq!(snap.message, "done");

        let mut seen = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            seen.push((ev.status.unwrap(), ev.message().to_string()));
        }
        assert_eq!(
            seen,
            vec![
                (TaskStatus::Running, "attempt started".to_string()),
                (TaskStatus::Running, "logged in".to_string()),
                (TaskStatus::Success, "done".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_attempt_is_dropped() {
        let (board, _bus) = board(&["a"]);
        let id = TaskId::from("a");

        let first = board.begin_attempt(&id, 0).unwrap();
        assert!(board.running(&id, first, "attempt 1"));
        let err = AttemptError::Timeout {
            timeout: Duration::from_secs(5),
        };
        assert!(board.retrying(&id, first, &err, Duration::from_secs(2)));

        // late progress of the abandoned attempt while retrying
        assert!(!board.report(&id, first, "late"));

        let second = board.begin_attempt(&id, 1).unwrap();
        assert!(board.running(&id, second, "attempt 2"));
        assert!(!board.succeed(&id, first, 1, "late success"));
        assert!(!board.report(&id, first, "late progress"));

        let snap = board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Running);
        assert_eq!(snap.message, "attempt 2");
        assert_eq!(snap.retries, 1);
    }

    #[tokio::test]
    async fn test_no_write_after_terminal() {
        let (board, _bus) = board(&["a"]);
        let id = TaskId::from("a");
        let attempt = board.begin_attempt(&id, 0).unwrap();
        assert!(board.running(&id, attempt, "go"));
        assert!(board.fail(&id, attempt, AttemptError::Stopped, "stopped"));

        assert!(!board.succeed(&id, attempt, 1, "too late"));
        assert!(board.begin_attempt(&id, 1).is_none());
        assert_eq!(board.status(&id), Some(TaskStatus::Stopped));
        assert_eq!(
            board.get("a").unwrap().failure,
            Some(AttemptError::Stopped)
        );
    }

    #[tokio::test]
    async fn test_stop_pending_and_unsettled() {
        let (board, _bus) = board(&["a", "b", "c"]);
        let b = TaskId::from("b");
        let attempt = board.begin_attempt(&b, 0).unwrap();
        assert!(board.running(&b, attempt, "go"));

        assert!(board.stop_pending(&TaskId::from("a")));
        // already launched: the INITIAL token no longer matches
        assert!(!board.stop_pending(&b));

        let unsettled: Vec<_> = board.unsettled().iter().map(|t| t.to_string()).collect();
        assert_eq!(unsettled, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_waiting_cannot_succeed_directly() {
        let (board, _bus) = board(&["a"]);
        let id = TaskId::from("a");
        let attempt = board.begin_attempt(&id, 0).unwrap();
        assert!(!board.succeed(&id, attempt, 1, "skipped running"));
        assert_eq!(board.status(&id), Some(TaskStatus::Waiting));
    }

    #[tokio::test]
    async fn test_take_snapshot_moves_outputs() {
        let (board, _bus) = board(&["a"]);
        let id = TaskId::from("a");
        let attempt = board.begin_attempt(&id, 0).unwrap();
        board.running(&id, attempt, "go");
        board.succeed(&id, attempt, 9, "ok");

        let taken = board.take_snapshot();
        assert_eq!(taken[0].output, Some(9));
        assert_eq!(board.get("a").unwrap().output, None);
    }
}
