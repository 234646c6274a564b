//! # Global stop signal of a run.
//!
//! One-way, run-scoped flag backed by a [`CancellationToken`]. Every attempt
//! token is a child of it, so requesting stop also cancels in-flight executors.
//! A new run gets a new signal; the flag is never reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::info;

use crate::events::{Bus, Event, EventKind};

/// Cooperative cancellation observed by the dispatch loop and every runner.
#[derive(Clone)]
pub(crate) struct StopSignal {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
    bus: Bus,
}

impl StopSignal {
    pub fn new(bus: Bus) -> Self {
        Self {
            token: CancellationToken::new(),
            requested: Arc::new(AtomicBool::new(false)),
            bus,
        }
    }

    /// Sets the flag. Idempotent: only the first call publishes `StopRequested`.
    ///
    /// Returns `true` for the call that actually set it.
    pub fn request(&self) -> bool {
        if self.requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!("stop requested");
        self.bus.publish(Event::new(EventKind::StopRequested));
        self.token.cancel();
        true
    }

    /// True once stop was requested.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once stop was requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Token for one attempt; cancelled by stop or individually (timeout).
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
