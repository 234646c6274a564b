//! # Status sink trait
//!
//! `StatusSink` is the extension point for observing a run: a UI grid, a log, a
//! results file. Each sink is driven by a dedicated worker fed by its own queue,
//! owned by the run's sink set.
//!
//! ## Contract
//! - Implementations may be slow; they never block runners or other sinks.
//! - Every status update reaches every sink, in publish order. A slow sink
//!   lags behind instead of losing updates.
//! - A sink must not start or stop runs from inside a callback.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use batchvisor::{StatusSink, TaskId, TaskStatus};
//!
//! struct Grid;
//!
//! #[async_trait]
//! impl StatusSink for Grid {
//!     async fn on_status(&self, task: &TaskId, status: TaskStatus, message: &str) {
//!         // update the row for `task`...
//!         let _ = (task, status, message);
//!     }
//!     fn name(&self) -> &'static str { "grid" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::tasks::{TaskId, TaskStatus};

/// Receiver of task status updates.
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    /// Handles one status update of `task`.
    async fn on_status(&self, task: &TaskId, status: TaskStatus, message: &str);

    /// Handles any run event.
    ///
    /// The default forwards `StatusChanged` events to [`on_status`](Self::on_status)
    /// and ignores run-level events. Override to observe run start/stop/completion.
    async fn on_event(&self, event: &Event) {
        if event.kind != EventKind::StatusChanged {
            return;
        }
        if let (Some(task), Some(status)) = (event.task.as_ref(), event.status) {
            self.on_status(task, status, event.message()).await;
        }
    }

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
