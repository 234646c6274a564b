use std::sync::Arc;

use crate::{
    core::scheduler::Scheduler,
    executor::Executor,
    sinks::StatusSink,
};

/// Default capacity of a run's broadcast ring.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Builder for constructing a [`Scheduler`] with optional features.
pub struct SchedulerBuilder<E: Executor> {
    executor: E,
    sinks: Vec<Arc<dyn StatusSink>>,
    bus_capacity: usize,
}

impl<E: Executor> SchedulerBuilder<E> {
    /// Creates a new builder around the worker executor.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            sinks: Vec::new(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Sets the status sinks (replaces any previously added).
    ///
    /// Each run gets one dedicated worker with a bounded queue per sink.
    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn StatusSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Adds one status sink.
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds the built-in [`LogSink`](crate::LogSink).
    #[cfg(feature = "logging")]
    pub fn with_log_sink(self) -> Self {
        self.with_sink(Arc::new(crate::sinks::LogSink::new()))
    }

    /// Capacity of the broadcast ring behind [`RunHandle::subscribe`](crate::RunHandle::subscribe).
    ///
    /// Lagging receivers skip the oldest events. Clamped to at least 1.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity.max(1);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> Scheduler<E> {
        Scheduler::new_internal(Arc::new(self.executor), self.sinks, self.bus_capacity)
    }
}
