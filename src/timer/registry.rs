//! Slot-keyed timer registry with cancel-and-replace semantics
//!
//! Each slot holds at most one pending timer. Arming an occupied slot
//! supersedes the previous timer; the superseded action never runs.
//! `arm` and `cancel` may be called concurrently from the polling loop
//! and from session-event handlers; per-slot bookkeeping is serialized
//! under one mutex so a cancel racing a near-simultaneous fire cannot
//! both run the stale action and leave the slot marked live.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Names a deferred action with at most one pending timer at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Revert speaking feedback to the neutral listening indication
    ReturnToListening,
    /// End of error feedback, after which the machine returns to idle
    ErrorFeedback,
}

impl std::fmt::Display for TimerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerSlot::ReturnToListening => write!(f, "ReturnToListening"),
            TimerSlot::ErrorFeedback => write!(f, "ErrorFeedback"),
        }
    }
}

/// Bookkeeping for one armed slot
struct SlotEntry {
    /// Monotonic arm counter; a fire only runs if its generation is current
    generation: u64,
    handle: JoinHandle<()>,
}

/// Registry of slot-keyed one-shot timers
pub struct TimerRegistry {
    slots: Arc<Mutex<HashMap<TimerSlot, SlotEntry>>>,
    next_generation: AtomicU64,
}

impl TimerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Arm `slot` to run `action` after `duration`
    ///
    /// Cancels any timer already pending for the slot. The action fires
    /// exactly once or not at all: a later `arm` or a `cancel` before
    /// expiry prevents it from running. If cancellation is requested
    /// after the fire has already passed its liveness check, the action
    /// completes; callers must treat the effect as advisory and re-check
    /// state.
    pub fn arm<F>(&self, slot: TimerSlot, duration: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Hold the lock across remove + spawn + insert so the new fire
        // task cannot observe the map before its own entry is present.
        let mut slots = self.slots.lock().expect("timer lock poisoned");

        if let Some(previous) = slots.remove(&slot) {
            previous.handle.abort();
            debug!(%slot, "timer re-armed, previous canceled");
        } else {
            debug!(%slot, ?duration, "timer armed");
        }

        let handle = tokio::spawn({
            let slots = Arc::clone(&self.slots);
            async move {
                tokio::time::sleep(duration).await;

                // Run only if this arm is still the current one for the slot.
                let current = {
                    let mut slots = slots.lock().expect("timer lock poisoned");
                    match slots.get(&slot) {
                        Some(entry) if entry.generation == generation => {
                            slots.remove(&slot);
                            true
                        }
                        _ => false,
                    }
                };

                if current {
                    trace!(%slot, generation, "timer fired");
                    action();
                } else {
                    trace!(%slot, generation, "superseded timer discarded");
                }
            }
        });

        slots.insert(slot, SlotEntry { generation, handle });
    }

    /// Cancel the pending timer for `slot`, if any
    ///
    /// Returns `true` if a timer was pending. After this returns, the
    /// slot's action will not run unless it had already started.
    pub fn cancel(&self, slot: TimerSlot) -> bool {
        let mut slots = self.slots.lock().expect("timer lock poisoned");
        match slots.remove(&slot) {
            Some(entry) => {
                entry.handle.abort();
                debug!(%slot, "timer canceled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer (shutdown path)
    pub fn cancel_all(&self) {
        let mut slots = self.slots.lock().expect("timer lock poisoned");
        for (slot, entry) in slots.drain() {
            entry.handle.abort();
            debug!(%slot, "timer canceled at shutdown");
        }
    }

    /// Check whether a timer is pending for `slot`
    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.slots
            .lock()
            .expect("timer lock poisoned")
            .contains_key(&slot)
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_action(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&fired),
        );
        assert!(registry.is_armed(TimerSlot::ReturnToListening));

        tokio::time::sleep(Duration::from_millis(150)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.is_armed(TimerSlot::ReturnToListening));

        // Never fires again
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous() {
        let registry = TimerRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&first),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&second),
        );

        // Past the first deadline: the superseded action must not run
        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(registry.is_armed(TimerSlot::ReturnToListening));

        // Past the second deadline: only the replacement fires
        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&fired),
        );
        assert!(registry.cancel(TimerSlot::ReturnToListening));
        assert!(!registry.is_armed(TimerSlot::ReturnToListening));

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_empty_slot_is_noop() {
        let registry = TimerRegistry::new();
        assert!(!registry.cancel(TimerSlot::ErrorFeedback));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_independent() {
        let registry = TimerRegistry::new();
        let listening = Arc::new(AtomicUsize::new(0));
        let error = Arc::new(AtomicUsize::new(0));

        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&listening),
        );
        registry.arm(
            TimerSlot::ErrorFeedback,
            Duration::from_millis(300),
            counter_action(&error),
        );

        registry.cancel(TimerSlot::ReturnToListening);
        tokio::time::sleep(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;

        assert_eq!(listening.load(Ordering::SeqCst), 0);
        assert_eq!(error.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        registry.arm(
            TimerSlot::ReturnToListening,
            Duration::from_millis(100),
            counter_action(&fired),
        );
        registry.arm(
            TimerSlot::ErrorFeedback,
            Duration::from_millis(100),
            counter_action(&fired),
        );
        registry.cancel_all();

        assert!(!registry.is_armed(TimerSlot::ReturnToListening));
        assert!(!registry.is_armed(TimerSlot::ErrorFeedback));

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_rearms_fire_exactly_once() {
        let registry = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            registry.arm(
                TimerSlot::ReturnToListening,
                Duration::from_millis(100),
                counter_action(&fired),
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
