//! Bounded multicast bus.

use crate::error::{HubError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{OverflowPolicy, PublishReport, Tap, TapId};

/// Sending side of one tap.
struct TapSlot<T> {
    sender: Sender<T>,
    /// Second handle on the tap queue, held only under `DropOldest` so the
    /// bus can discard the oldest value to make room. It keeps the queue
    /// connected, so such taps must be removed with `untap`.
    evict: Option<Receiver<T>>,
}

/// Internal bus state.
struct BusInner<T> {
    /// Active taps by ID.
    taps: HashMap<TapId, TapSlot<T>>,
    /// Taps removed for overflow whose owner has not yet asked why.
    overflowed: HashSet<TapId>,
    /// Set once by `close`.
    closed: bool,
}

/// Fans each published value out to every open tap.
///
/// Publishes on one bus are serialized, so every tap sees values in publish
/// order. Publishing never blocks on a slow tap.
pub struct Bus<T> {
    /// Name used in log output.
    name: &'static str,
    /// Queue capacity of each tap.
    capacity: usize,
    /// What happens to a tap whose queue is full.
    policy: OverflowPolicy,
    /// Counter for generating tap IDs.
    next_tap: AtomicU64,
    inner: Mutex<BusInner<T>>,
}

impl<T: Clone> Bus<T> {
    /// Create an open bus whose taps each buffer up to `capacity` values and
    /// are disconnected when full.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self::with_policy(name, capacity, OverflowPolicy::Disconnect)
    }

    /// Create an open bus with an explicit overflow policy.
    pub fn with_policy(name: &'static str, capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            name,
            capacity,
            policy,
            next_tap: AtomicU64::new(1),
            inner: Mutex::new(BusInner {
                taps: HashMap::new(),
                overflowed: HashSet::new(),
                closed: false,
            }),
        }
    }

    /// Open a new tap. It receives values published after this call returns.
    pub fn tap(&self) -> Result<Tap<T>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(HubError::Closed);
        }

        let id = TapId(self.next_tap.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.capacity);
        let evict = match self.policy {
            OverflowPolicy::DropOldest => Some(receiver.clone()),
            OverflowPolicy::Disconnect => None,
        };
        inner.taps.insert(id, TapSlot { sender, evict });

        Ok(Tap { id, receiver })
    }

    /// Remove a tap. Returns false if it was already gone.
    pub fn untap(&self, id: TapId) -> bool {
        let mut inner = self.inner.lock();
        inner.overflowed.remove(&id);
        let removed = inner.taps.remove(&id).is_some();
        if removed {
            tracing::debug!(bus = self.name, tap = %id, "Tap removed");
        }
        removed
    }

    /// Whether `id` was removed because its queue filled up. Answers true
    /// once; the record is cleared by the call.
    pub fn take_overflowed(&self, id: TapId) -> bool {
        self.inner.lock().overflowed.remove(&id)
    }

    /// Push a value to every open tap.
    ///
    /// Full taps are handled per the bus policy and taps whose receiver is
    /// gone are removed; the rest still get the value. Fails only when the
    /// bus is closed.
    pub fn publish(&self, value: T) -> Result<PublishReport> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.closed {
            return Err(HubError::Closed);
        }

        let mut report = PublishReport::default();
        let overflowed = &mut inner.overflowed;
        inner.taps.retain(|id, slot| {
            let rejected = match slot.sender.try_send(value.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    return true;
                }
                Err(TrySendError::Disconnected(_)) => {
                    report.disconnected += 1;
                    return false;
                }
                Err(TrySendError::Full(rejected)) => rejected,
            };

            if let Some(evict) = &slot.evict {
                // Publishes are serialized, so one eviction always makes room.
                let _ = evict.try_recv();
                if slot.sender.try_send(rejected).is_ok() {
                    report.delivered += 1;
                    report.coalesced += 1;
                    return true;
                }
            }

            tracing::warn!(
                bus = self.name,
                tap = %id,
                capacity = self.capacity,
                "Tap buffer full, dropping slow tap"
            );
            report.overflowed.push(*id);
            overflowed.insert(*id);
            false
        });

        Ok(report)
    }

    /// Close the bus. Returns false if it was already closed.
    ///
    /// Every tap is removed; values already queued can still be drained.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        inner.closed = true;
        let taps = inner.taps.len();
        inner.taps.clear();

        tracing::debug!(bus = self.name, taps, "Bus closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of open taps.
    pub fn tap_count(&self) -> usize {
        self.inner.lock().taps.len()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}
