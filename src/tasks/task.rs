//! # Task: one schedulable unit of work.
//!
//! A [`Task`] binds a stable [`TaskId`] (an account identifier, for example) to
//! an opaque payload handed to the executor on every attempt. The payload is
//! shared as `Arc<P>`: the caller owns it, the scheduler only reads it.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a task, unique within a run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Borrows the id as `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Input of one unit of work.
///
/// # Example
/// ```
/// use batchvisor::Task;
///
/// let task = Task::new("acc-42", ("user@example.com", "hunter2"));
/// assert_eq!(task.id().as_str(), "acc-42");
/// assert_eq!(task.payload().0, "user@example.com");
/// ```
pub struct Task<P> {
    id: TaskId,
    payload: Arc<P>,
}

impl<P> Task<P> {
    /// Creates a task owning `payload`.
    pub fn new(id: impl Into<TaskId>, payload: P) -> Self {
        Self::shared(id, Arc::new(payload))
    }

    /// Creates a task from an already shared payload.
    pub fn shared(id: impl Into<TaskId>, payload: Arc<P>) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Task identity.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Borrowed payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Shared handle to the payload (one clone per attempt).
    pub fn payload_arc(&self) -> Arc<P> {
        Arc::clone(&self.payload)
    }
}

impl<P> Clone for Task<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<P> fmt::Debug for Task<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_id_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(TaskId::from("acc-1"), 1);
        assert_eq!(map.get("acc-1"), Some(&1));
    }

    #[test]
    fn test_clone_shares_payload() {
        let task = Task::new("acc-1", vec![1, 2, 3]);
        let copy = task.clone();
        assert!(Arc::ptr_eq(&task.payload_arc(), &copy.payload_arc()));
    }
}
