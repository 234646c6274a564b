//! Worker executors.
//!
//! This module provides:
//! - [`Executor`] trait performing one attempt of one task
//! - [`ExecutorFn`] closure-backed executor
//! - [`AttemptContext`] what an attempt knows about itself (token, config, progress reporting)

mod context;
#[allow(clippy::module_inception)]
mod executor;
mod executor_fn;

pub(crate) use context::Report;
pub use context::AttemptContext;
pub use executor::Executor;
pub use executor_fn::ExecutorFn;
