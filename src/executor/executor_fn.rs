//! # Function-backed executor (`ExecutorFn`)
//!
//! [`ExecutorFn`] wraps a closure `Fn(Arc<P>, AttemptContext) -> Fut`, producing a
//! fresh future per attempt. State shared across attempts must be captured
//! explicitly (e.g. an `Arc<...>` moved into the closure).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use batchvisor::{AttemptContext, ExecutorError, ExecutorFn};
//!
//! let exec = ExecutorFn::new(|email: Arc<String>, ctx: AttemptContext| async move {
//!     if ctx.is_cancelled() {
//!         return Err(ExecutorError::Cancelled);
//!     }
//!     Ok::<_, ExecutorError>(email.len())
//! });
//! # let _ = exec;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExecutorError;
use crate::executor::{AttemptContext, Executor};

/// Closure-backed [`Executor`].
pub struct ExecutorFn<P, O, F> {
    f: F,
    _marker: PhantomData<fn(Arc<P>) -> O>,
}

impl<P, O, F> ExecutorFn<P, O, F> {
    /// Wraps `f`.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(Arc<P>, AttemptContext) -> Fut,
        Fut: Future<Output = Result<O, ExecutorError>>,
    {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<P, O, F, Fut> Executor for ExecutorFn<P, O, F>
where
    P: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(Arc<P>, AttemptContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ExecutorError>> + Send + 'static,
{
    type Payload = P;
    type Output = O;

    async fn execute(&self, payload: Arc<P>, ctx: AttemptContext) -> Result<O, ExecutorError> {
        (self.f)(payload, ctx).await
    }
}
