//! # Handle and report of a started run.
//!
//! [`RunHandle`] is returned by [`Scheduler::start`](crate::Scheduler::start). It
//! is the only way to stop, observe and collect a run.
//!
//! ## Waiting
//! ```text
//! wait()         ─► dispatch loop finished (Completed | Stopped); runners may still unwind
//! join()         ─► wait() + every runner settled + sinks drained ─► RunReport
//! join_within(g) ─► join() bounded by g, else GraceExceeded{unsettled}
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::core::context::RunContext;
use crate::core::signals::wait_for_shutdown_signal;
use crate::core::stop::StopSignal;
use crate::error::RuntimeError;
use crate::events::Event;
use crate::executor::Executor;
use crate::tasks::{TaskSnapshot, TaskStatus};

/// How the dispatch loop of a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Queue drained and every runner finished.
    Completed,
    /// Stop was requested; queued tasks were never launched.
    Stopped,
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunReport<O> {
    /// How the dispatch loop ended.
    pub outcome: RunOutcome,
    /// Every task in caller order, with outputs moved in.
    pub tasks: Vec<TaskSnapshot<O>>,
    /// Highest number of concurrently active runners.
    pub peak_concurrency: usize,
    /// Time from start to the last runner settling.
    pub elapsed: Duration,
}

impl<O> RunReport<O> {
    /// Number of tasks that ended in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    /// True when every task succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Success)
    }
}

/// Control handle of one run.
pub struct RunHandle<E: Executor> {
    run: Arc<RunContext<E>>,
    outcome: watch::Receiver<Option<RunOutcome>>,
    started: Instant,
}

impl<E: Executor> RunHandle<E> {
    pub(crate) fn new(
        run: Arc<RunContext<E>>,
        outcome: watch::Receiver<Option<RunOutcome>>,
    ) -> Self {
        Self {
            run,
            outcome,
            started: Instant::now(),
        }
    }

    /// Requests stop. Returns immediately; idempotent.
    ///
    /// Admission halts, runners abort before their next attempt and in-flight
    /// attempt tokens are cancelled.
    pub fn stop(&self) {
        self.run.stop.request();
    }

    /// True once stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.run.stop.is_set()
    }

    /// Runners currently holding a slot.
    pub fn active(&self) -> usize {
        self.run.slots.active()
    }

    /// Run configuration in effect.
    pub fn config(&self) -> &RunConfig {
        &self.run.config
    }

    /// Receiver of every subsequent run event.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.run.bus.subscribe()
    }

    /// Outcome of the dispatch loop, if it already ended.
    pub fn outcome(&self) -> Option<RunOutcome> {
        *self.outcome.borrow()
    }

    /// Waits for the dispatch loop to end.
    ///
    /// After `Stopped`, runners that were in flight may still be settling.
    pub async fn wait(&self) -> RunOutcome {
        let mut rx = self.outcome.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(RunOutcome::Stopped),
            Err(_closed) => RunOutcome::Stopped,
        }
    }

    /// Waits for the whole run to settle and returns its report.
    pub async fn join(self) -> RunReport<E::Output> {
        let outcome = self.wait().await;
        self.run.slots.idle().await;
        self.finish(outcome).await
    }

    /// Like [`join`](Self::join), bounded by `grace`.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] with the ids of unsettled tasks.
    pub async fn join_within(self, grace: Duration) -> Result<RunReport<E::Output>, RuntimeError> {
        let settled = time::timeout(grace, async {
            let outcome = self.wait().await;
            self.run.slots.idle().await;
            outcome
        })
        .await;

        match settled {
            Ok(outcome) => Ok(self.finish(outcome).await),
            Err(_elapsed) => {
                let unsettled: Vec<String> = self
                    .run
                    .board
                    .unsettled()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                warn!(grace = ?grace, unsettled = unsettled.len(), "run did not settle within grace");
                Err(RuntimeError::GraceExceeded { grace, unsettled })
            }
        }
    }

    /// Stops the run on the first termination signal (SIGINT/SIGTERM/SIGQUIT, Ctrl-C).
    ///
    /// The listener exits on its own once the dispatch loop has ended.
    pub fn stop_on_signal(&self) -> JoinHandle<()> {
        let stop = self.run.stop.clone();
        let mut outcome = self.outcome.clone();

        tokio::spawn(async move {
            select_signal_or_end(&stop, &mut outcome).await;
        })
    }

    async fn finish(self, outcome: RunOutcome) -> RunReport<E::Output> {
        self.run.bus.sinks().flush().await;
        let report = RunReport {
            outcome,
            tasks: self.run.board.take_snapshot(),
            peak_concurrency: self.run.slots.peak(),
            elapsed: self.started.elapsed(),
        };
        info!(
            outcome = ?report.outcome,
            success = report.count(TaskStatus::Success),
            error = report.count(TaskStatus::Error),
            stopped = report.count(TaskStatus::Stopped),
            peak = report.peak_concurrency,
            "run settled",
        );
        report
    }
}

impl<E: Executor> RunHandle<E>
where
    E::Output: Clone,
{
    /// Copies the current state of every task, in caller order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot<E::Output>> {
        self.run.board.snapshot()
    }

    /// Copies the current state of one task.
    pub fn task(&self, id: &str) -> Option<TaskSnapshot<E::Output>> {
        self.run.board.get(id)
    }
}

async fn select_signal_or_end(
    stop: &StopSignal,
    outcome: &mut watch::Receiver<Option<RunOutcome>>,
) {
    tokio::select! {
        res = wait_for_shutdown_signal() => match res {
            Ok(()) => {
                info!("termination signal received");
                stop.request();
            }
            Err(e) => warn!(error = %e, "signal handlers unavailable"),
        },
        _ = outcome.wait_for(Option::is_some) => {}
    }
}
