//! Run events: types and the internal bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - `Bus` publish point that feeds sinks and broadcast subscribers
//!
//! ## Quick reference
//! - **Publishers**: `TaskBoard` (status changes), `run_attempt` (timeouts),
//!   `Dispatcher` (run completion/stop), `StopSignal` (stop request),
//!   `Scheduler::start` (run start).
//! - **Consumers**: the run's `SinkSet` and `RunHandle::subscribe()` receivers.

mod bus;
mod event;

pub(crate) use bus::Bus;
pub use event::{Event, EventKind};
