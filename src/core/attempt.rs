//! # One attempt of one task.
//!
//! Races the executor invocation against the per-attempt timer and the run's
//! stop signal, then classifies the outcome.
//!
//! ```text
//! spawn(executor.execute(payload, ctx)) ──┐
//!                                         ├─ finished ──► classify(result)
//! timer(timeout) ─────────────────────────┼─ fired    ──► cancel token, TimeoutHit, detach
//! stop.cancelled() ───────────────────────┘─ stopping ──► wait up to stop_grace, else Stopped
//! ```
//!
//! ## Rules
//! - The invocation runs on its own tokio task (panic isolation).
//! - A timed-out invocation is **not awaited**; its late result is discarded
//!   and its late progress reports are rejected by the attempt guard.
//! - `Stopped` takes precedence over every other failure.
//! - A success observed within `stop_grace` after stop is kept.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::{select, time};
use tracing::{debug, warn};

use crate::core::context::RunContext;
use crate::core::stop::StopSignal;
use crate::error::{AttemptError, ExecutorError, panic_message};
use crate::events::{Event, EventKind};
use crate::executor::{AttemptContext, Executor, Report};
use crate::tasks::{AttemptId, Task};

type Invocation<O> = JoinHandle<Result<O, ExecutorError>>;

/// What ended the race.
enum Settled<O> {
    Finished(Result<Result<O, ExecutorError>, JoinError>),
    Stopping,
    TimedOut(Duration),
}

/// Executes one attempt of `task` and classifies its outcome.
pub(crate) async fn run_attempt<E: Executor>(
    run: &RunContext<E>,
    task: &Task<E::Payload>,
    attempt: AttemptId,
    retry: u32,
) -> Result<E::Output, AttemptError> {
    let token = run.stop.child_token();
    let reporter: Arc<dyn Report> = run.board.clone();
    let ctx = AttemptContext::new(
        task.id().clone(),
        attempt,
        retry,
        Arc::clone(&run.config),
        token.clone(),
        reporter,
    );

    let executor = Arc::clone(&run.executor);
    let payload = task.payload_arc();
    let mut invocation: Invocation<E::Output> =
        tokio::spawn(async move { executor.execute(payload, ctx).await });

    let timeout = run.config.attempt_timeout();
    let timer = async {
        match timeout {
            Some(dur) => {
                time::sleep(dur).await;
                dur
            }
            None => future::pending().await,
        }
    };
    tokio::pin!(timer);

    let settled = select! {
        biased;
        res = &mut invocation => Settled::Finished(res),
        _ = run.stop.cancelled() => Settled::Stopping,
        dur = &mut timer => Settled::TimedOut(dur),
    };

    match settled {
        Settled::Finished(res) => classify(res, &run.stop),
        Settled::TimedOut(dur) => {
            token.cancel();
            warn!(task = %task.id(), attempt = %attempt, retry, timeout = ?dur, "attempt timed out");
            run.bus.publish(
                Event::new(EventKind::TimeoutHit)
                    .with_task(task.id().clone())
                    .with_attempt(attempt)
                    .with_retry(retry)
                    .with_timeout(dur),
            );
            // detached: the invocation keeps running until it observes its token
            drop(invocation);
            if run.stop.is_set() {
                Err(AttemptError::Stopped)
            } else {
                Err(AttemptError::Timeout { timeout: dur })
            }
        }
        Settled::Stopping => settle_after_stop(invocation, run.config.stop_grace).await,
    }
}

/// Gives a cancelled invocation up to `grace` to settle.
async fn settle_after_stop<O>(
    mut invocation: Invocation<O>,
    grace: Duration,
) -> Result<O, AttemptError> {
    if grace.is_zero() {
        return Err(AttemptError::Stopped);
    }
    match time::timeout(grace, &mut invocation).await {
        Ok(Ok(Ok(output))) => Ok(output),
        Ok(_) => Err(AttemptError::Stopped),
        Err(_elapsed) => {
            debug!(grace = ?grace, "invocation did not settle within stop grace");
            Err(AttemptError::Stopped)
        }
    }
}

/// Maps a finished invocation to the attempt outcome.
fn classify<O>(
    res: Result<Result<O, ExecutorError>, JoinError>,
    stop: &StopSignal,
) -> Result<O, AttemptError> {
    match res {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(_)) | Err(_) if stop.is_set() => Err(AttemptError::Stopped),
        Ok(Err(ExecutorError::Cancelled)) => Err(AttemptError::Unclassified {
            reason: "executor cancelled without a stop request".into(),
        }),
        Ok(Err(err)) => Err(AttemptError::from(err)),
        Err(join_err) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            Err(AttemptError::Unclassified {
                reason: format!("executor panicked: {}", panic_message(payload.as_ref())),
            })
        }
        Err(_) => Err(AttemptError::Unclassified {
            reason: "executor invocation aborted".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::config::RunConfig;
    use crate::core::test_support::context;
    use crate::executor::ExecutorFn;
    use crate::tasks::TaskStatus;

    fn begin<E: Executor>(run: &RunContext<E>, task: &Task<E::Payload>) -> AttemptId {
        let attempt = run.board.begin_attempt(task.id(), 0).unwrap();
        run.board.running(task.id(), attempt, "attempt started");
        attempt
    }

    #[tokio::test(start_paused = true)]
    async fn test_success() {
        let exec = ExecutorFn::new(|n: Arc<u32>, _ctx: AttemptContext| async move {
            Ok::<_, ExecutorError>(*n * 2)
        });
        let (run, tasks) = context(exec, RunConfig::default(), vec![Task::new("a", 21)]);
        let attempt = begin(&run, &tasks[0]);
        assert_eq!(run_attempt(&run, &tasks[0], attempt, 0).await, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_invocation() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&observed);
        let exec = ExecutorFn::new(move |_: Arc<()>, ctx: AttemptContext| {
            let flag = Arc::clone(&flag);
            async move {
                ctx.cancelled().await;
                flag.store(true, Ordering::SeqCst);
                // keeps going after cancellation; must not be awaited
                time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, ExecutorError>(())
            }
        });
        let cfg = RunConfig {
            timeout: Duration::from_secs(5),
            ..RunConfig::default()
        };
        let (run, tasks) = context(exec, cfg, vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);

        let started = time::Instant::now();
        let res = run_attempt(&run, &tasks[0], attempt, 0).await;
        assert_eq!(
            res,
            Err(AttemptError::Timeout {
                timeout: Duration::from_secs(5)
            })
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(60));

        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_unclassified() {
        let exec = ExecutorFn::new(|_: Arc<()>, _ctx: AttemptContext| async move {
            if true {
                panic!("selector not found");
            }
            Ok::<_, ExecutorError>(())
        });
        let (run, tasks) = context(exec, RunConfig::default(), vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);
        assert_eq!(
            run_attempt(&run, &tasks[0], attempt, 0).await,
            Err(AttemptError::Unclassified {
                reason: "executor panicked: selector not found".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_with_zero_grace() {
        let exec = ExecutorFn::new(|_: Arc<()>, _ctx: AttemptContext| async move {
            time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ExecutorError>(())
        });
        let cfg = RunConfig {
            stop_grace: Duration::ZERO,
            ..RunConfig::default()
        };
        let (run, tasks) = context(exec, cfg, vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);

        let stop = run.stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            stop.request();
        });
        assert_eq!(
            run_attempt(&run, &tasks[0], attempt, 0).await,
            Err(AttemptError::Stopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_within_grace_is_kept() {
        let exec = ExecutorFn::new(|_: Arc<()>, _ctx: AttemptContext| async move {
            time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ExecutorError>("done")
        });
        let cfg = RunConfig {
            stop_grace: Duration::from_secs(60),
            ..RunConfig::default()
        };
        let (run, tasks) = context(exec, cfg, vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);

        let stop = run.stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            stop.request();
        });
        assert_eq!(run_attempt(&run, &tasks[0], attempt, 0).await, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_executor_after_stop_is_stopped() {
        let exec = ExecutorFn::new(|_: Arc<()>, ctx: AttemptContext| async move {
            ctx.cancelled().await;
            Err::<(), _>(ExecutorError::Cancelled)
        });
        let (run, tasks) = context(exec, RunConfig::default(), vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);

        let stop = run.stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            stop.request();
        });
        assert_eq!(
            run_attempt(&run, &tasks[0], attempt, 0).await,
            Err(AttemptError::Stopped)
        );
        assert_eq!(run.board.status(tasks[0].id()), Some(TaskStatus::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_reaches_board() {
        let exec = ExecutorFn::new(|_: Arc<()>, ctx: AttemptContext| async move {
            assert!(ctx.report("two-factor prompt"));
            Ok::<_, ExecutorError>(())
        });
        let (run, tasks) = context(exec, RunConfig::default(), vec![Task::new("a", ())]);
        let attempt = begin(&run, &tasks[0]);
        run_attempt(&run, &tasks[0], attempt, 0).await.unwrap();

        let snap = run.board.get("a").unwrap();
        assert_eq!(snap.message, "two-factor prompt");
    }
}
