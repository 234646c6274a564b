//! # Non-blocking event fan-out to multiple sinks.
//!
//! Provides [`SinkSet`]: distributes run events to every sink without blocking
//! the publisher (task runners, dispatch loop).
//!
//! ## Architecture
//! ```text
//! emit_arc(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► sink1.on_event()
//!     │   (unbounded)        └──────► panic → logged, worker continues
//!     ├──► [queue 2] ──► worker 2 ──► sink2.on_event()
//!     └──► [queue N] ──► worker N ──► sinkN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-sink FIFO**: each sink sees events in publish order
//! - **No cross-sink ordering**: sink A may handle event N while B handles N+5
//! - **No loss**: queues are unbounded, a slow sink lags behind but sees every
//!   update of the run (the backlog is bounded by the run's own event count)
//! - **Isolation**: a slow or panicking sink doesn't affect others or the run
//! - **Flush**: [`SinkSet::flush`] waits until every event emitted before the
//!   call has been handled by every sink

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use crate::error::panic_message;
use crate::events::Event;
use crate::sinks::StatusSink;

/// Item of a sink queue.
enum Envelope {
    Event(Arc<Event>),
    Flush(oneshot::Sender<()>),
}

/// Per-sink channel metadata.
struct SinkChannel {
    name: &'static str,
    sender: mpsc::UnboundedSender<Envelope>,
}

/// Fan-out coordinator for the sinks of one run.
///
/// Workers exit once the set is dropped and their queues drain.
pub(crate) struct SinkSet {
    channels: Vec<SinkChannel>,
}

impl SinkSet {
    /// Creates a new set and spawns one worker task per sink.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn StatusSink>>) -> Self {
        let mut channels = Vec::with_capacity(sinks.len());

        for sink in sinks {
            let name = sink.name();
            let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();

            tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    match envelope {
                        Envelope::Event(ev) => {
                            let fut = sink.on_event(ev.as_ref());
                            if let Err(panic_err) =
                                std::panic::AssertUnwindSafe(fut).catch_unwind().await
                            {
                                error!(
                                    sink = sink.name(),
                                    info = %panic_message(panic_err.as_ref()),
                                    "status sink panicked",
                                );
                            }
                        }
                        Envelope::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            });
            channels.push(SinkChannel { name, sender: tx });
        }
        Self { channels }
    }

    /// Emits a pre-allocated `Arc<Event>` to all sinks (non-blocking).
    pub fn emit_arc(&self, event: Arc<Event>) {
        for channel in &self.channels {
            if channel
                .sender
                .send(Envelope::Event(Arc::clone(&event)))
                .is_err()
            {
                warn!(sink = channel.name, seq = event.seq, "event dropped: worker closed");
            }
        }
    }

    /// Waits until every sink has handled all events emitted before this call.
    pub async fn flush(&self) {
        for channel in &self.channels {
            let (ack, done) = oneshot::channel();
            if channel.sender.send(Envelope::Flush(ack)).is_ok() {
                let _ = done.await;
            }
        }
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::events::EventKind;
    use crate::tasks::{TaskId, TaskStatus};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, TaskStatus)>>,
    }

    #[async_trait]
    impl StatusSink for Recorder {
        async fn on_status(&self, task: &TaskId, status: TaskStatus, _message: &str) {
            self.seen.lock().unwrap().push((task.to_string(), status));
        }
    }

    struct Panicky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusSink for Panicky {
        async fn on_status(&self, _task: &TaskId, _status: TaskStatus, _message: &str) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first call explodes");
            }
        }
    }

    fn status(task: &str, status: TaskStatus) -> Arc<Event> {
        Arc::new(
            Event::new(EventKind::StatusChanged)
                .with_task(task)
                .with_status(status),
        )
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let set = SinkSet::new(vec![a.clone(), b.clone()]);

        set.emit_arc(status("acc-1", TaskStatus::Waiting));
        set.emit_arc(status("acc-1", TaskStatus::Running));
        set.emit_arc(status("acc-1", TaskStatus::Success));
        set.flush().await;

        let expected = vec![
            ("acc-1".to_string(), TaskStatus::Waiting),
            ("acc-1".to_string(), TaskStatus::Running),
            ("acc-1".to_string(), TaskStatus::Success),
        ];
        assert_eq!(*a.seen.lock().unwrap(), expected);
        assert_eq!(*b.seen.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_run_events_are_not_status_updates() {
        let rec = Arc::new(Recorder::default());
        let set = SinkSet::new(vec![rec.clone()]);

        set.emit_arc(Arc::new(Event::new(EventKind::RunCompleted)));
        set.flush().await;

        assert!(rec.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_sink_keeps_worker_alive() {
        let sink = Arc::new(Panicky {
            calls: AtomicUsize::new(0),
        });
        let set = SinkSet::new(vec![sink.clone()]);

        set.emit_arc(status("acc-1", TaskStatus::Running));
        set.emit_arc(status("acc-1", TaskStatus::Success));
        set.flush().await;

        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_set_flushes_immediately() {
        let set = SinkSet::new(Vec::new());
        assert_eq!(set.len(), 0);
        set.emit_arc(status("acc-1", TaskStatus::Running));
        set.flush().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_larger_than_any_queue_is_delivered() {
        struct Slow(AtomicUsize);

        #[async_trait]
        impl StatusSink for Slow {
            async fn on_status(&self, _task: &TaskId, _status: TaskStatus, _message: &str) {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let sink = Arc::new(Slow(AtomicUsize::new(0)));
        let set = SinkSet::new(vec![sink.clone()]);

        for n in 0..5000 {
            set.emit_arc(status(&format!("acc-{n}"), TaskStatus::Waiting));
        }
        set.flush().await;

        assert_eq!(sink.0.load(Ordering::SeqCst), 5000);
    }
}
