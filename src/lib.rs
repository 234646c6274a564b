//! # batchvisor
//!
//! **Batchvisor** is a bounded-concurrency task scheduler for Rust.
//!
//! It drives many independent, long-running and unreliable worker operations
//! (browser sessions against remote accounts, for example) from a caller-selected
//! work set: a global concurrency cap, launch pacing, per-attempt timeout,
//! retry with backoff, cooperative stop and live status reporting.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ConfigSource ──load()──► RunConfig (immutable for the run)
//!                                │
//!   Vec<Task<P>> ──► Scheduler::start() ──► RunHandle (stop / wait / join / snapshot)
//!                                │
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  RunContext (one per run)                                         │
//! │  - SlotController (cap, active count, peak)                       │
//! │  - StopSignal     (one-way flag, parent of every attempt token)   │
//! │  - TaskBoard      (status/message guarded by AttemptId)           │
//! │  - Bus            (SinkSet + broadcast)                           │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//!   Dispatcher ── FIFO, slot free? ──► spawn TaskRunner ── sleep(launch_delay)
//!                                          │
//!                          ┌───────────────┴───────────────┐
//!                          ▼                               ▼
//!                 run_attempt(): spawn executor     Retrying ─► backoff ─► again
//!                 race timer / stop                 Success | Error | Stopped
//!                          │
//!                          ▼
//!        TaskBoard ──► Bus ──► SinkSet ──► [queue] ──► StatusSink workers
//!                          └──► broadcast ──► RunHandle::subscribe()
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Waiting ──► Running ──► Success
//!   │           │  ▲  ├─► Error     (retry budget exhausted)
//!   │           │  │  └─► Stopped   (stop requested)
//!   │           ▼  │
//!   │        Retrying ──► Error | Stopped
//!   └──────────────────► Stopped    (never launched)
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types / traits                          |
//! |-------------------|---------------------------------------------------------|---------------------------------------------|
//! | **Scheduling**    | Start, stop, observe and collect a run.                 | [`Scheduler`], [`RunHandle`], [`RunReport`] |
//! | **Executors**     | The opaque worker operation run per attempt.            | [`Executor`], [`ExecutorFn`], [`AttemptContext`] |
//! | **Sinks**         | Live status updates and run events.                     | [`StatusSink`], [`StatusFn`], [`Event`]     |
//! | **Policies**      | Retry delay between attempts.                           | [`RetryBackoff`], [`Jitter`]                |
//! | **Configuration** | Run parameters read once per start.                     | [`RunConfig`], [`ConfigSource`], [`JsonSource`] |
//! | **Errors**        | Typed errors for the runtime and attempts.              | [`RuntimeError`], [`AttemptError`], [`ExecutorError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogSink`], writing run events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use batchvisor::{
//!     AttemptContext, ExecutorError, ExecutorFn, JsonSource, Scheduler, StatusFn, StatusSink,
//!     Task, TaskId, TaskStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exec = ExecutorFn::new(|login: Arc<String>, ctx: AttemptContext| async move {
//!         if ctx.is_cancelled() {
//!             return Err(ExecutorError::Cancelled);
//!         }
//!         ctx.report(format!("signing in as {login}"));
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         Ok::<_, ExecutorError>(login.len())
//!     });
//!
//!     let grid: Arc<dyn StatusSink> =
//!         StatusFn::arc("grid", |task: &TaskId, status: TaskStatus, msg: &str| {
//!             println!("{task:>8} {status:<8} {msg}");
//!         });
//!
//!     let scheduler = Scheduler::builder(exec).with_sink(grid).build();
//!     let config = JsonSource::inline(r#"{ "maxConcurrency": 2, "timeoutSec": 30, "maxRetries": 1 }"#);
//!
//!     let tasks = (1..=4)
//!         .map(|n| Task::new(format!("acc-{n}"), format!("user{n}@example.com")))
//!         .collect();
//!     let run = scheduler.start(&config, tasks)?;
//!     let report = run.join().await;
//!
//!     assert!(report.all_succeeded());
//!     assert!(report.peak_concurrency <= 2);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod executor;
mod policies;
mod sinks;
mod tasks;

// ---- Public re-exports ----

pub use config::{ConfigError, ConfigSource, JsonSource, RunConfig};
pub use core::{RunHandle, RunOutcome, RunReport, Scheduler, SchedulerBuilder};
pub use error::{AttemptError, ExecutorError, RuntimeError};
pub use events::{Event, EventKind};
pub use executor::{AttemptContext, Executor, ExecutorFn};
pub use policies::{Jitter, RetryBackoff};
pub use sinks::{StatusFn, StatusSink};
pub use tasks::{AttemptId, Task, TaskId, TaskSnapshot, TaskStatus};

// Built-in `tracing` sink.
// Disable with: `default-features = false`
#[cfg(feature = "logging")]
pub use sinks::LogSink;
