//! # Scheduler: entry point of the crate.
//!
//! A [`Scheduler`] owns the worker executor and the status sinks. Each call to
//! [`Scheduler::start`] reads the configuration once, materializes the tasks on
//! a fresh task board and spawns the dispatch loop.
//!
//! ## Start sequence
//! ```text
//! start(source, tasks)
//!   ├─► source.load()               (ConfigError → RuntimeError::Config)
//!   ├─► reject duplicate ids        (RuntimeError::DuplicateTask)
//!   ├─► reject overlapping run      (RuntimeError::RunInProgress)
//!   ├─► new SinkSet + Bus + TaskBoard + SlotController + StopSignal
//!   ├─► publish RunStarted, then Waiting for every task (caller order)
//!   └─► spawn Dispatcher::run()     ─► RunHandle
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use batchvisor::{
//!     AttemptContext, ExecutorError, ExecutorFn, RunConfig, Scheduler, Task, TaskStatus,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exec = ExecutorFn::new(|email: Arc<String>, ctx: AttemptContext| async move {
//!         ctx.report("signing in");
//!         Ok::<_, ExecutorError>(email.to_uppercase())
//!     });
//!     let scheduler = Scheduler::builder(exec).build();
//!
//!     let tasks = vec![
//!         Task::new("acc-1", "a@example.com".to_string()),
//!         Task::new("acc-2", "b@example.com".to_string()),
//!     ];
//!     let run = scheduler.start(&RunConfig::default(), tasks)?;
//!     let report = run.join().await;
//!     assert_eq!(report.count(TaskStatus::Success), 2);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ConfigSource;
use crate::core::{
    builder::SchedulerBuilder,
    context::RunContext,
    dispatch::Dispatcher,
    run::{RunHandle, RunOutcome},
    slots::SlotController,
    stop::StopSignal,
};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::executor::Executor;
use crate::sinks::{SinkSet, StatusSink};
use crate::tasks::{Task, TaskBoard, TaskId};

/// Liveness of the most recent run.
struct LastRun {
    slots: Arc<SlotController>,
    outcome: watch::Receiver<Option<RunOutcome>>,
}

impl LastRun {
    /// Active slot count while the run is still going.
    ///
    /// A dispatch loop that died without reporting (closed sender) counts as
    /// finished.
    fn busy(&self) -> Option<usize> {
        let active = self.slots.active();
        let finished = self.outcome.borrow().is_some() || self.outcome.has_changed().is_err();
        if !finished || active > 0 {
            Some(active)
        } else {
            None
        }
    }
}

/// Bounded-concurrency task scheduler.
pub struct Scheduler<E: Executor> {
    executor: Arc<E>,
    sinks: Vec<Arc<dyn StatusSink>>,
    bus_capacity: usize,
    last: Mutex<Option<LastRun>>,
}

impl<E: Executor> Scheduler<E> {
    /// Returns a builder around `executor`.
    pub fn builder(executor: E) -> SchedulerBuilder<E> {
        SchedulerBuilder::new(executor)
    }

    pub(crate) fn new_internal(
        executor: Arc<E>,
        sinks: Vec<Arc<dyn StatusSink>>,
        bus_capacity: usize,
    ) -> Self {
        Self {
            executor,
            sinks,
            bus_capacity,
            last: Mutex::new(None),
        }
    }

    /// Starts a run over `tasks` (admitted in the given order).
    ///
    /// Returns as soon as the dispatch loop is spawned. Must be called from
    /// within a tokio runtime. An empty task list completes immediately.
    ///
    /// # Errors
    /// - [`RuntimeError::Config`] if the source fails to load or validate
    /// - [`RuntimeError::DuplicateTask`] if two tasks share an id
    /// - [`RuntimeError::RunInProgress`] if the previous run has not settled
    pub fn start<S>(&self, source: &S, tasks: Vec<Task<E::Payload>>) -> Result<RunHandle<E>, RuntimeError>
    where
        S: ConfigSource + ?Sized,
    {
        let config = Arc::new(source.load()?);

        let mut seen: HashSet<&TaskId> = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(task.id()) {
                return Err(RuntimeError::DuplicateTask {
                    id: task.id().to_string(),
                });
            }
        }
        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id().clone()).collect();

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = last.as_ref().and_then(LastRun::busy) {
            return Err(RuntimeError::RunInProgress { active });
        }

        let sinks = Arc::new(SinkSet::new(self.sinks.clone()));
        let bus = Bus::new(self.bus_capacity, sinks);
        let slots = SlotController::new(config.max_concurrent);
        let run = Arc::new(RunContext {
            config: Arc::clone(&config),
            executor: Arc::clone(&self.executor),
            board: Arc::new(TaskBoard::new(ids, bus.clone())),
            slots: Arc::clone(&slots),
            stop: StopSignal::new(bus.clone()),
            bus: bus.clone(),
        });

        info!(
            tasks = tasks.len(),
            sinks = run.bus.sinks().len(),
            max_concurrent = config.max_concurrent,
            timeout = ?config.timeout,
            max_retries = config.max_retries,
            "run starting",
        );
        bus.publish(Event::new(EventKind::RunStarted).with_message(format!(
            "{} task(s), max {} concurrent",
            tasks.len(),
            config.max_concurrent
        )));
        run.board.announce();

        let (tx, rx) = watch::channel(None);
        *last = Some(LastRun {
            slots,
            outcome: rx.clone(),
        });
        drop(last);

        let dispatcher = Dispatcher::new(Arc::clone(&run), tasks, tx);
        tokio::spawn(async move {
            let outcome = dispatcher.run().await;
            debug!(outcome = ?outcome, "dispatch loop exited");
        });

        Ok(RunHandle::new(run, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_run_busy_until_outcome() {
        let (tx, rx) = watch::channel(None);
        let last = LastRun {
            slots: SlotController::new(2),
            outcome: rx,
        };
        assert_eq!(last.busy(), Some(0));

        tx.send_replace(Some(RunOutcome::Completed));
        assert_eq!(last.busy(), None);
    }

    #[test]
    fn test_last_run_idle_when_dispatch_died() {
        let (tx, rx) = watch::channel(None);
        let last = LastRun {
            slots: SlotController::new(2),
            outcome: rx,
        };
        drop(tx);
        assert_eq!(last.busy(), None);
    }

    #[test]
    fn test_last_run_busy_while_slots_held() {
        let (tx, rx) = watch::channel(None);
        let slots = SlotController::new(2);
        let last = LastRun {
            slots: Arc::clone(&slots),
            outcome: rx,
        };
        let guard = slots.try_acquire();
        drop(tx);
        assert_eq!(last.busy(), Some(1));

        drop(guard);
        assert_eq!(last.busy(), None);
    }
}
