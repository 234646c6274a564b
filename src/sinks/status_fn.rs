//! # Function-backed sink (`StatusFn`)
//!
//! [`StatusFn`] wraps a plain closure `Fn(&TaskId, TaskStatus, &str)` so simple
//! observers do not need a dedicated type.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use batchvisor::{StatusFn, StatusSink, TaskId, TaskStatus};
//!
//! let sink: Arc<dyn StatusSink> = StatusFn::arc("print", |task: &TaskId, status: TaskStatus, msg: &str| {
//!     println!("{task}: {status} {msg}");
//! });
//! assert_eq!(sink.name(), "print");
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::sinks::StatusSink;
use crate::tasks::{TaskId, TaskStatus};

/// Closure-backed [`StatusSink`].
pub struct StatusFn<F> {
    name: &'static str,
    f: F,
}

impl<F> StatusFn<F>
where
    F: Fn(&TaskId, TaskStatus, &str) + Send + Sync + 'static,
{
    /// Creates a sink calling `f` for every status update.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the sink and returns it as a shared handle.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> StatusSink for StatusFn<F>
where
    F: Fn(&TaskId, TaskStatus, &str) + Send + Sync + 'static,
{
    async fn on_status(&self, task: &TaskId, status: TaskStatus, message: &str) {
        (self.f)(task, status, message);
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
