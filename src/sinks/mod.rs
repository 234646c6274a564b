//! Status sinks: observers of a run.
//!
//! ## Contents
//! - [`StatusSink`] the extension trait (`on_status`, optional `on_event`)
//! - [`StatusFn`] closure-backed sink
//! - `SinkSet` per-run fan-out with per-sink queues and panic isolation
//! - [`LogSink`] `tracing` writer (feature `logging`)
//!
//! ```text
//! Bus::publish ──► SinkSet ──► [queue] ──► worker ──► sink.on_event()
//!                                                        └─► on_status() (StatusChanged)
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod sink;
mod status_fn;

#[cfg(feature = "logging")]
pub use log::LogSink;
pub(crate) use set::SinkSet;
pub use sink::StatusSink;
pub use status_fn::StatusFn;
