//! Shared state of one run.

use std::sync::Arc;

use crate::config::RunConfig;
use crate::core::{slots::SlotController, stop::StopSignal};
use crate::events::Bus;
use crate::executor::Executor;
use crate::tasks::TaskBoard;

/// Everything the dispatch loop and the runners of one run share.
///
/// Replaces process-wide mutable state: a new run gets a new context.
pub(crate) struct RunContext<E: Executor> {
    pub config: Arc<RunConfig>,
    pub executor: Arc<E>,
    pub board: Arc<TaskBoard<E::Output>>,
    pub slots: Arc<SlotController>,
    pub stop: StopSignal,
    pub bus: Bus,
}
