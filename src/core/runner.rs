//! # TaskRunner: retry loop of one task.
//!
//! Drives one task from `Waiting` to a terminal status while holding its slot.
//!
//! ```text
//! loop {
//!   ├─► attempt = board.begin_attempt(retry)      (fresh token)
//!   ├─► stop set?            ─► Stopped, exit
//!   ├─► publish Running
//!   ├─► run_attempt()
//!   │     ├─ Ok               ─► Success, exit
//!   │     ├─ Err(e), retryable, budget ─► Retrying(e), sleep(backoff) (stop cuts it short), continue
//!   │     ├─ Err(e), retryable, no budget ─► Error(e), exit
//!   │     └─ Err(Stopped)     ─► Stopped, exit
//! }
//! drop(slot)                                   (on every exit path)
//! ```
//!
//! ## Rules
//! - Attempts of one task run **sequentially**.
//! - `Stopped` is never retried.
//! - A task is retried at most `max_retries` times.

use std::sync::Arc;

use tokio::{select, time};
use tracing::{debug, info, warn};

use crate::core::{attempt::run_attempt, context::RunContext, slots::SlotGuard};
use crate::error::AttemptError;
use crate::executor::Executor;
use crate::tasks::Task;

/// Runs `task` to a terminal status. `slot` is released when this returns.
pub(crate) async fn run_task<E: Executor>(
    run: Arc<RunContext<E>>,
    task: Task<E::Payload>,
    slot: SlotGuard,
) {
    let _slot = slot;
    let id = task.id().clone();
    let max_retries = run.config.max_retries;
    let mut retry: u32 = 0;

    loop {
        let Some(attempt) = run.board.begin_attempt(&id, retry) else {
            warn!(task = %id, "task settled outside its runner");
            return;
        };

        if run.stop.is_set() {
            run.board
                .fail(&id, attempt, AttemptError::Stopped, "stopped before attempt");
            debug!(task = %id, retry, "stop observed before attempt");
            return;
        }

        let started = if retry == 0 {
            "attempt started".to_string()
        } else {
            format!("retry {retry}/{max_retries} started")
        };
        run.board.running(&id, attempt, started);
        debug!(task = %id, attempt = %attempt, retry, "attempt started");

        match run_attempt(&run, &task, attempt, retry).await {
            Ok(output) => {
                run.board.succeed(&id, attempt, output, "completed");
                info!(task = %id, retry, "task succeeded");
                return;
            }
            Err(err) if err.is_retryable() && retry < max_retries => {
                retry += 1;
                let delay = run.config.retry_backoff.delay(retry);
                run.board.retrying(&id, attempt, &err, delay);
                debug!(
                    task = %id,
                    retry,
                    delay = ?delay,
                    reason = %err,
                    "retry scheduled after failure",
                );

                select! {
                    _ = time::sleep(delay) => {}
                    _ = run.stop.cancelled() => {}
                }
            }
            Err(err) if err.is_retryable() => {
                let attempts = run.config.max_attempts();
                let message = format!("{err} (after {attempts} attempt(s))");
                warn!(
                    task = %id,
                    attempts,
                    failure = err.as_label(),
                    reason = %err,
                    "task failed",
                );
                run.board.fail(&id, attempt, err, message);
                return;
            }
            Err(err) => {
                info!(task = %id, retry, failure = err.as_label(), "task stopped");
                run.board.fail(&id, attempt, err, "stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::config::RunConfig;
    use crate::core::test_support::context;
    use crate::error::ExecutorError;
    use crate::executor::{AttemptContext, ExecutorFn};
    use crate::policies::RetryBackoff;
    use crate::tasks::TaskStatus;

    fn flaky(fail_first: u32, calls: Arc<AtomicU32>) -> impl Executor<Payload = (), Output = u32> {
        ExecutorFn::new(move |_: Arc<()>, _ctx: AttemptContext| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < fail_first {
                    Err(ExecutorError::failed(format!("login failed #{n}")))
                } else {
                    Ok(n)
                }
            }
        })
    }

    fn retries(max: u32) -> RunConfig {
        RunConfig {
            max_retries: max,
            retry_backoff: RetryBackoff::constant(Duration::from_secs(2)),
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let (run, mut tasks) = context(flaky(2, calls.clone()), retries(2), vec![Task::new("a", ())]);
        let slot = run.slots.try_acquire().unwrap();

        run_task(Arc::clone(&run), tasks.remove(0), slot).await;

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Success);
        assert_eq!(snap.retries, 2);
        assert_eq!(snap.output, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(run.slots.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let (run, mut tasks) =
            context(flaky(u32::MAX, calls.clone()), retries(3), vec![Task::new("a", ())]);
        let slot = run.slots.try_acquire().unwrap();

        let started = time::Instant::now();
        run_task(Arc::clone(&run), tasks.remove(0), slot).await;

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Error);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(snap.message, "login failed #3 (after 4 attempt(s))");
        assert_eq!(
            snap.failure,
            Some(AttemptError::Executor {
                reason: "login failed #3".into()
            })
        );
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_backoff_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut cfg = retries(5);
        cfg.retry_backoff = RetryBackoff::constant(Duration::from_secs(60));
        let (run, mut tasks) = context(flaky(u32::MAX, calls.clone()), cfg, vec![Task::new("a", ())]);
        let slot = run.slots.try_acquire().unwrap();

        let stop = run.stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(10)).await;
            stop.request();
        });
        run_task(Arc::clone(&run), tasks.remove(0), slot).await;

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Stopped);
        assert_eq!(snap.failure, Some(AttemptError::Stopped));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_and_timeout_share_the_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let exec = {
            let calls = Arc::clone(&calls);
            ExecutorFn::new(move |_: Arc<()>, _ctx: AttemptContext| {
                let calls = Arc::clone(&calls);
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => panic!("driver crashed"),
                        1 => {
                            std::future::pending::<()>().await;
                            Ok(0)
                        }
                        n => Ok::<u32, ExecutorError>(n),
                    }
                }
            })
        };
        let mut cfg = retries(2);
        cfg.timeout = Duration::from_secs(5);
        let (run, mut tasks) = context(exec, cfg, vec![Task::new("a", ())]);
        let slot = run.slots.try_acquire().unwrap();

        run_task(Arc::clone(&run), tasks.remove(0), slot).await;

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Success);
        assert_eq!(snap.retries, 2);
        assert_eq!(snap.output, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_message_counts_every_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let cfg = retries(1);
        let attempts = cfg.max_attempts();
        let (run, mut tasks) = context(flaky(u32::MAX, calls.clone()), cfg, vec![Task::new("a", ())]);
        let slot = run.slots.try_acquire().unwrap();

        run_task(Arc::clone(&run), tasks.remove(0), slot).await;

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.status, TaskStatus::Error);
        assert_eq!(calls.load(Ordering::SeqCst), attempts);
        assert_eq!(snap.message, "login failed #1 (after 2 attempt(s))");
    }
}
