//! Live subscriber accounting.

use crate::bus::{Bus, OverflowPolicy, Tap, TapId};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts attached item sessions and broadcasts every change.
///
/// Adjusting the count and pushing the new value happen under one lock, so
/// the count bus carries changes in the exact order they occurred and a
/// watcher never sees the count move backward. A watcher that falls behind
/// loses its oldest queued changes rather than its tap; the newest count is
/// always kept.
pub struct SubscriberRegistry {
    /// Authoritative count; held while pushing.
    count: Mutex<u64>,
    /// Mirror of `count` for lock-free reads.
    current: AtomicU64,
    /// Count bus.
    bus: Bus<u64>,
}

impl SubscriberRegistry {
    /// Create a registry at zero whose watchers buffer up to `capacity`
    /// changes.
    pub fn new(capacity: usize) -> Self {
        Self {
            count: Mutex::new(0),
            current: AtomicU64::new(0),
            bus: Bus::with_policy("subscriber_count", capacity, OverflowPolicy::DropOldest),
        }
    }

    /// Record an attach. Returns the new count.
    pub fn increment(&self) -> u64 {
        let mut count = self.count.lock();
        *count += 1;
        self.current.store(*count, Ordering::SeqCst);
        self.notify(*count);
        *count
    }

    /// Record a detach. Returns the new count.
    pub fn decrement(&self) -> u64 {
        let mut count = self.count.lock();
        if *count == 0 {
            tracing::warn!("Subscriber count decrement below zero ignored");
            return 0;
        }
        *count -= 1;
        self.current.store(*count, Ordering::SeqCst);
        self.notify(*count);
        *count
    }

    /// Count at the instant of call.
    pub fn current_value(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Open a count watcher.
    ///
    /// Returns the count together with a tap that carries every change after
    /// it, with nothing missed or repeated in between.
    pub fn watch(&self) -> Result<(u64, Tap<u64>)> {
        let count = self.count.lock();
        let tap = self.bus.tap()?;
        Ok((*count, tap))
    }

    /// Remove a count watcher.
    pub fn unwatch(&self, id: TapId) -> bool {
        self.bus.untap(id)
    }

    /// Number of open count watchers.
    pub fn watcher_count(&self) -> usize {
        self.bus.tap_count()
    }

    /// Close the count bus. Counting continues; changes are no longer pushed.
    pub fn close(&self) -> bool {
        self.bus.close()
    }

    pub fn is_closed(&self) -> bool {
        self.bus.is_closed()
    }

    fn notify(&self, value: u64) {
        if self.bus.publish(value).is_err() {
            tracing::debug!(subscribers = value, "Count bus closed, change not broadcast");
        }
    }
}
