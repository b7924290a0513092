//! Cancellable timer slots backed by tokio tasks.
//!
//! Each slot holds at most one task. Arming a slot aborts whatever it held.
//! A task that finishes on its own calls [`TimerSlot::release`] with the
//! generation it was armed with, so a newer task is never dropped by an
//! older one.

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
struct SlotInner {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub(crate) struct TimerSlot {
    inner: Mutex<SlotInner>,
}

impl TimerSlot {
    /// Replace the pending task. `spawn` receives the new generation.
    pub(crate) fn arm<F>(&self, spawn: F)
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut inner = self.inner.lock();
        if let Some(previous) = inner.handle.take() {
            previous.abort();
        }
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        inner.handle = Some(spawn(generation));
    }

    /// Arm only when nothing is pending. Returns whether a task was spawned.
    pub(crate) fn arm_if_idle<F>(&self, spawn: F) -> bool
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut inner = self.inner.lock();
        if inner.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        inner.handle = Some(spawn(generation));
        true
    }

    /// Abort the pending task, if any.
    pub(crate) fn cancel(&self) -> bool {
        match self.inner.lock().handle.take() {
            Some(handle) => {
                handle.abort();
                true
            },
            None => false,
        }
    }

    /// Forget the handle without aborting, if it still belongs to `generation`.
    pub(crate) fn release(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.handle.take().is_some()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.inner.lock().handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.get_mut().handle.take() {
            handle.abort();
        }
    }
}

/// Every task a connection manager owns.
#[derive(Default)]
pub(crate) struct Timers {
    pub(crate) reconnect: TimerSlot,
    pub(crate) breaker_reset: TimerSlot,
    pub(crate) qr_abandon: TimerSlot,
    pub(crate) keep_alive: TimerSlot,
    pub(crate) health_touch: TimerSlot,
    pub(crate) event_pump: TimerSlot,
}

impl Timers {
    /// Cancel everything. Returns how many tasks were aborted.
    pub(crate) fn cancel_all(&self) -> usize {
        [
            &self.reconnect,
            &self.breaker_reset,
            &self.qr_abandon,
            &self.keep_alive,
            &self.health_touch,
            &self.event_pump,
        ]
        .into_iter()
        .filter(|slot| slot.cancel())
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_arm_replaces_pending_task() {
        let fired = Arc::new(AtomicU32::new(0));
        let slot = TimerSlot::default();

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            slot.arm(|_| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    fired.fetch_add(1, Ordering::SeqCst);
                })
            });
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_if_idle_and_cancel() {
        let slot = TimerSlot::default();
        let spawn = |_| tokio::spawn(std::future::pending::<()>());

        assert!(slot.arm_if_idle(spawn));
        assert!(!slot.arm_if_idle(spawn));
        assert!(slot.is_active());

        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert!(!slot.is_active());
        assert!(slot.arm_if_idle(spawn));
    }

    #[tokio::test]
    async fn test_release_ignores_stale_generation() {
        let slot = TimerSlot::default();
        let mut first = 0;
        slot.arm(|generation| {
            first = generation;
            tokio::spawn(std::future::pending::<()>())
        });
        slot.arm(|_| tokio::spawn(std::future::pending::<()>()));

        assert!(!slot.release(first));
        assert!(slot.is_active());
    }
}
