//! Runtime core: dispatch, runners and run lifecycle.
//!
//! The public API from this module is [`Scheduler`] (with [`SchedulerBuilder`])
//! and the [`RunHandle`] / [`RunReport`] it hands out.
//!
//! Internal modules:
//! - [`slots`]: concurrency cap, slot guards released on drop;
//! - [`stop`]: one-way run-scoped stop flag;
//! - [`dispatch`]: admission loop with pacing;
//! - [`runner`]: retry loop of one task;
//! - [`attempt`]: one executor invocation raced against timeout and stop;
//! - [`signals`]: cross-platform termination signals.

mod attempt;
mod builder;
mod context;
mod dispatch;
mod run;
mod runner;
mod scheduler;
mod signals;
mod slots;
mod stop;

pub use builder::SchedulerBuilder;
pub use run::{RunHandle, RunOutcome, RunReport};
pub use scheduler::Scheduler;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::{context::RunContext, slots::SlotController, stop::StopSignal};
    use crate::config::RunConfig;
    use crate::events::Bus;
    use crate::executor::Executor;
    use crate::sinks::SinkSet;
    use crate::tasks::{Task, TaskBoard};

    /// Builds a run context without spawning a dispatch loop.
    pub fn context<E: Executor>(
        executor: E,
        config: RunConfig,
        tasks: Vec<Task<E::Payload>>,
    ) -> (Arc<RunContext<E>>, Vec<Task<E::Payload>>) {
        let bus = Bus::new(1024, Arc::new(SinkSet::new(Vec::new())));
        let ids = tasks.iter().map(|t| t.id().clone()).collect();
        let slots = SlotController::new(config.max_concurrent);
        let run = RunContext {
            config: Arc::new(config),
            executor: Arc::new(executor),
            board: Arc::new(TaskBoard::new(ids, bus.clone())),
            slots,
            stop: StopSignal::new(bus.clone()),
            bus,
        };
        (Arc::new(run), tasks)
    }
}
