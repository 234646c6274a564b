//! # Worker slot controller.
//!
//! Enforces the concurrency cap of a run. A runner holds a [`SlotGuard`] for its
//! whole lifetime; the guard gives the slot back on drop, on every exit path
//! (including panics and aborts).
//!
//! ```text
//! try_acquire() ── active < max ──► Some(SlotGuard) ── drop ──► active -= 1, notify
//!              └─ active == max ──► None
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::sync::futures::Notified;

/// Atomic slot counter with release notification.
pub(crate) struct SlotController {
    max: usize,
    active: AtomicUsize,
    peak: AtomicUsize,
    released: Notify,
}

impl SlotController {
    /// Creates a controller with `max` slots (min 1).
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            max: max.max(1),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            released: Notify::new(),
        })
    }

    /// Takes a slot if one is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(current + 1, Ordering::Relaxed);
                    return Some(SlotGuard {
                        slots: Arc::clone(self),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Slots currently held.
    #[inline]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Highest number of slots held at once.
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Future completing at the next slot release.
    ///
    /// Call `enable()` on the pinned future before re-checking state to not miss
    /// a release that happens in between.
    pub fn released(&self) -> Notified<'_> {
        self.released.notified()
    }

    /// Completes once no slot is held.
    pub async fn idle(&self) {
        loop {
            let released = self.released();
            tokio::pin!(released);
            released.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            released.await;
        }
    }

    fn release(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        self.released.notify_waiters();
    }
}

/// One held slot; released on drop.
pub(crate) struct SlotGuard {
    slots: Arc<SlotController>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cap_is_enforced() {
        let slots = SlotController::new(2);
        let a = slots.try_acquire().unwrap();
        let _b = slots.try_acquire().unwrap();
        assert!(slots.try_acquire().is_none());
        assert_eq!(slots.active(), 2);

        drop(a);
        assert_eq!(slots.active(), 1);
        assert!(slots.try_acquire().is_some());
        assert_eq!(slots.peak(), 2);
    }

    #[test]
    fn test_zero_is_clamped() {
        let slots = SlotController::new(0);
        assert!(slots.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_waits_for_release() {
        let slots = SlotController::new(1);
        let guard = slots.try_acquire().unwrap();

        let waiter = {
            let slots = Arc::clone(&slots);
            tokio::spawn(async move { slots.idle().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(slots.active(), 0);
    }

    #[tokio::test]
    async fn test_guard_released_on_panic() {
        let slots = SlotController::new(1);
        let guard = slots.try_acquire().unwrap();
        let res = tokio::spawn(async move {
            let _guard = guard;
            panic!("runner exploded");
        })
        .await;
        assert!(res.is_err());
        assert_eq!(slots.active(), 0);
    }
}
