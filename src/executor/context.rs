//! # Per-attempt context handed to the executor.
//!
//! [`AttemptContext`] carries everything an executor may need about the attempt
//! it is running: task id, attempt token, retry number, the run configuration and
//! a cancellation token. The token is cancelled when:
//! - the per-attempt timer fires,
//! - the caller stops the run.
//!
//! Executors should poll [`AttemptContext::is_cancelled`] (or await
//! [`AttemptContext::cancelled`]) and unwind with
//! [`ExecutorError::Cancelled`](crate::ExecutorError::Cancelled).

use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::config::RunConfig;
use crate::tasks::{AttemptId, TaskBoard, TaskId};

/// Sink for progress messages of the current attempt.
pub(crate) trait Report: Send + Sync + 'static {
    fn report(&self, task: &TaskId, attempt: AttemptId, message: Arc<str>) -> bool;
}

impl<O: Send + 'static> Report for TaskBoard<O> {
    fn report(&self, task: &TaskId, attempt: AttemptId, message: Arc<str>) -> bool {
        TaskBoard::report(self, task, attempt, message)
    }
}

/// Context of one executor attempt.
#[derive(Clone)]
pub struct AttemptContext {
    task: TaskId,
    attempt: AttemptId,
    retry: u32,
    config: Arc<RunConfig>,
    token: CancellationToken,
    reporter: Arc<dyn Report>,
}

impl AttemptContext {
    pub(crate) fn new(
        task: TaskId,
        attempt: AttemptId,
        retry: u32,
        config: Arc<RunConfig>,
        token: CancellationToken,
        reporter: Arc<dyn Report>,
    ) -> Self {
        Self {
            task,
            attempt,
            retry,
            config,
            token,
            reporter,
        }
    }

    /// Task this attempt belongs to.
    pub fn task(&self) -> &TaskId {
        &self.task
    }

    /// Token of this attempt.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Retry number (0 = first attempt).
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// Shared run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Cancellation token of this attempt.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the attempt was abandoned (timeout or stop).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the attempt is abandoned.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Publishes a progress message (`Running` status, new message).
    ///
    /// Returns `false` when the message was dropped because this attempt is no
    /// longer the task's current one (superseded, timed out, settled).
    pub fn report(&self, message: impl Into<Arc<str>>) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.reporter
            .report(&self.task, self.attempt, message.into())
    }
}

impl std::fmt::Debug for AttemptContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptContext")
            .field("task", &self.task)
            .field("attempt", &self.attempt)
            .field("retry", &self.retry)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}
