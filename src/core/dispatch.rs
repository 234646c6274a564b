//! # Dispatch loop.
//!
//! Single control loop of a run: admits queued tasks into runners under the slot
//! cap, paces launches, and reports how the run ended.
//!
//! ```text
//! loop {
//!   ├─ stop set                        ─► exit Stopped
//!   ├─ queue empty && active == 0      ─► exit Completed
//!   ├─ queue non-empty && slot free    ─► pop head, spawn runner, sleep(launch_delay) (stop cuts it short)
//!   └─ otherwise                       ─► wait: slot release | poll_interval | stop
//! }
//! Stopped: tasks still queued ─► Stopped ("stopped before launch"), publish RunStopped
//! Completed:                   ─► publish RunCompleted
//! ```
//!
//! ## Rules
//! - Admission is FIFO in caller order.
//! - Pacing applies only after an actual launch.
//! - `RunCompleted` / `RunStopped` is published exactly once per run.
//! - In-flight runners are never awaited here; they release their slots on their own.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::{select, time};
use tracing::{debug, info};

use crate::core::context::RunContext;
use crate::core::run::RunOutcome;
use crate::core::runner::run_task;
use crate::events::{Event, EventKind};
use crate::executor::Executor;
use crate::tasks::Task;

pub(crate) struct Dispatcher<E: Executor> {
    run: Arc<RunContext<E>>,
    pending: VecDeque<Task<E::Payload>>,
    outcome: watch::Sender<Option<RunOutcome>>,
}

impl<E: Executor> Dispatcher<E> {
    pub fn new(
        run: Arc<RunContext<E>>,
        tasks: Vec<Task<E::Payload>>,
        outcome: watch::Sender<Option<RunOutcome>>,
    ) -> Self {
        Self {
            run,
            pending: tasks.into(),
            outcome,
        }
    }

    /// Runs the loop to its end and publishes the outcome.
    pub async fn run(mut self) -> RunOutcome {
        let mut launched: usize = 0;

        let outcome = loop {
            if self.run.stop.is_set() {
                break RunOutcome::Stopped;
            }
            if self.pending.is_empty() && self.run.slots.active() == 0 {
                break RunOutcome::Completed;
            }

            let released = self.run.slots.released();
            tokio::pin!(released);
            released.as_mut().enable();

            if !self.pending.is_empty() {
                if let Some(slot) = self.run.slots.try_acquire() {
                    if let Some(task) = self.pending.pop_front() {
                        debug!(
                            task = %task.id(),
                            active = self.run.slots.active(),
                            queued = self.pending.len(),
                            "launching runner",
                        );
                        tokio::spawn(run_task(Arc::clone(&self.run), task, slot));
                        launched += 1;
                        self.pace().await;
                    }
                    continue;
                }
            }

            select! {
                _ = &mut released => {}
                _ = time::sleep(self.run.config.poll_interval) => {}
                _ = self.run.stop.cancelled() => {}
            }
        };

        match outcome {
            RunOutcome::Completed => {
                info!(launched, "run completed");
                self.run.bus.publish(
                    Event::new(EventKind::RunCompleted)
                        .with_message(format!("{launched} task(s) finished")),
                );
            }
            RunOutcome::Stopped => {
                let never_launched = self.pending.len();
                for task in self.pending.drain(..) {
                    self.run.board.stop_pending(task.id());
                }
                info!(
                    launched,
                    never_launched,
                    in_flight = self.run.slots.active(),
                    "run stopped",
                );
                self.run.bus.publish(
                    Event::new(EventKind::RunStopped).with_message(format!(
                        "{launched} launched, {never_launched} never launched"
                    )),
                );
            }
        }

        let _ = self.outcome.send(Some(outcome));
        outcome
    }

    /// Inter-launch pacing; interrupted by stop.
    async fn pace(&self) {
        let delay = self.run.config.launch_delay;
        if delay.is_zero() {
            return;
        }
        select! {
            _ = time::sleep(delay) => {}
            _ = self.run.stop.cancelled() => {}
        }
    }
}
