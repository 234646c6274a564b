//! # Worker executor abstraction.
//!
//! An [`Executor`] performs one attempt of one task: given the task's payload and
//! an [`AttemptContext`], it eventually succeeds with an output or fails with an
//! [`ExecutorError`]. It may take arbitrarily long; the scheduler abandons it on
//! timeout or stop by cancelling the context's token.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::executor::AttemptContext;

/// # Asynchronous, abandon-able worker operation.
///
/// Each call runs on its own tokio task. A panic is caught and classified as an
/// unclassified attempt failure.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use batchvisor::{AttemptContext, Executor, ExecutorError};
///
/// struct Login;
///
/// #[async_trait]
/// impl Executor for Login {
///     type Payload = (String, String);
///     type Output = String;
///
///     async fn execute(
///         &self,
///         creds: Arc<Self::Payload>,
///         ctx: AttemptContext,
///     ) -> Result<String, ExecutorError> {
///         if ctx.is_cancelled() {
///             return Err(ExecutorError::Cancelled);
///         }
///         ctx.report("signing in");
///         Ok(format!("session for {}", creds.0))
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Input of one task.
    type Payload: Send + Sync + 'static;
    /// Result of a successful attempt.
    type Output: Send + 'static;

    /// Runs one attempt.
    ///
    /// Implementations should observe `ctx` cancellation and return
    /// [`ExecutorError::Cancelled`] promptly.
    async fn execute(
        &self,
        payload: Arc<Self::Payload>,
        ctx: AttemptContext,
    ) -> Result<Self::Output, ExecutorError>;
}
