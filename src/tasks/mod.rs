//! # Tasks and their state.
//!
//! This module provides the task-related types:
//! - [`Task`] / [`TaskId`] one unit of work and its identity
//! - [`TaskStatus`] / [`AttemptId`] lifecycle status and attempt token
//! - [`TaskSnapshot`] inspection view of one task
//! - `TaskBoard` the guarded, mutex-protected state of a run

mod board;
mod status;
mod task;

pub(crate) use board::TaskBoard;
pub use board::TaskSnapshot;
pub use status::{AttemptId, TaskStatus};
pub use task::{Task, TaskId};
