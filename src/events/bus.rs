//! # Event bus of one run.
//!
//! [`Bus`] is the single publish point of a run. Each published event is handed
//! to two consumers:
//! - the run's [`SinkSet`] (per-sink queues, non-blocking)
//! - a [`tokio::sync::broadcast`] channel for [`RunHandle::subscribe`](crate::RunHandle::subscribe)
//!
//! ## Architecture
//! ```text
//! Publishers (many):                       Consumers:
//!   TaskBoard ──┐                      ┌──► SinkSet ──► sink workers
//!   Runner    ──┼──► Bus::publish ─────┤
//!   Dispatch  ──┤                      └──► broadcast ──► RunHandle::subscribe()
//!   StopSignal──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never awaits.
//! - **Fire-and-forget**: broadcast receivers that lag skip the oldest events;
//!   nothing is persisted.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::Event;
use crate::sinks::SinkSet;

/// Publish point shared by every component of a run.
///
/// Cheap to clone (two `Arc`-backed handles).
#[derive(Clone)]
pub(crate) struct Bus {
    tx: broadcast::Sender<Arc<Event>>,
    sinks: Arc<SinkSet>,
}

impl Bus {
    /// Creates a bus over `sinks` with a broadcast ring of `capacity` (min 1).
    pub fn new(capacity: usize, sinks: Arc<SinkSet>) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx, sinks }
    }

    /// Publishes an event to all sinks and broadcast receivers.
    pub fn publish(&self, ev: Event) {
        let ev = Arc::new(ev);
        self.sinks.emit_arc(Arc::clone(&ev));
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Event>> {
        self.tx.subscribe()
    }

    /// The run's sink set.
    pub fn sinks(&self) -> &Arc<SinkSet> {
        &self.sinks
    }
}
