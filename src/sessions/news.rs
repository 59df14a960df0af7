//! Item sessions: backlog replay followed by the live tail.

use crate::bus::{Bus, Tap, TapId};
use crate::registry::SubscriberRegistry;
use crate::types::Item;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{Cancel, CancelHandle, SessionId, SessionState, TerminationReason, Wait};

/// Lifecycle state guarded together so a transition and its reason agree.
struct Lifecycle {
    state: SessionState,
    reason: Option<TerminationReason>,
}

/// Session state shared between the stream and its cancel handles.
pub(crate) struct ItemSession {
    id: SessionId,
    tap_id: TapId,
    lifecycle: Mutex<Lifecycle>,
    items: Arc<Bus<Item>>,
    registry: Arc<SubscriberRegistry>,
}

impl ItemSession {
    fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    fn termination(&self) -> Option<TerminationReason> {
        self.lifecycle.lock().reason.clone()
    }

    /// `Init -> Replaying`, counting the subscriber.
    fn attach(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != SessionState::Init {
                return;
            }
            lifecycle.state = SessionState::Replaying;
        }

        let total = self.registry.increment();
        tracing::info!(session = %self.id, subscribers = total, "Subscriber connected");
    }

    /// `Replaying -> Live`. No-op in any other state.
    fn go_live(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == SessionState::Replaying {
            lifecycle.state = SessionState::Live;
        }
    }

    /// Move to `Terminated`. Only the first call has any effect.
    fn terminate(&self, reason: TerminationReason) -> bool {
        let previous = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == SessionState::Terminated {
                return false;
            }
            let previous = lifecycle.state;
            lifecycle.state = SessionState::Terminated;
            lifecycle.reason = Some(reason.clone());
            previous
        };

        // Dropping the sender wakes a receiver blocked on the tap.
        self.items.untap(self.tap_id);

        let remaining = if previous.is_attached() {
            self.registry.decrement()
        } else {
            self.registry.current_value()
        };

        match reason {
            TerminationReason::Cancelled => {
                tracing::info!(session = %self.id, subscribers = remaining, "Subscriber disconnected");
            }
            TerminationReason::DeliveryFailed(ref error) => {
                tracing::error!(
                    session = %self.id,
                    subscribers = remaining,
                    error = %error,
                    "Subscriber stream failed"
                );
            }
            _ => {
                tracing::info!(
                    session = %self.id,
                    subscribers = remaining,
                    reason = %reason,
                    "Subscriber stream terminated"
                );
            }
        }

        true
    }
}

impl Cancel for ItemSession {
    fn cancel(&self) -> bool {
        self.terminate(TerminationReason::Cancelled)
    }

    fn is_terminated(&self) -> bool {
        self.state() == SessionState::Terminated
    }
}

/// One subscriber's view of the item feed.
///
/// Yields every item that was in the store when the session attached, then
/// every item published afterward, in publish order. The stream never ends
/// on its own: it ends on cancel, delivery failure, overflow or hub shutdown.
///
/// Prefer ending a session explicitly with [`ItemStream::cancel`] or a
/// [`CancelHandle`]. Dropping a live stream cancels it as a fallback.
pub struct ItemStream {
    session: Arc<ItemSession>,
    replay: std::vec::IntoIter<Item>,
    tap: Tap<Item>,
}

impl ItemStream {
    /// Build a session from a backlog snapshot and a tap opened at the same
    /// point, and count it as attached.
    pub(crate) fn attach(
        id: SessionId,
        backlog: Vec<Item>,
        tap: Tap<Item>,
        items: Arc<Bus<Item>>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        let session = Arc::new(ItemSession {
            id,
            tap_id: tap.id,
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Init,
                reason: None,
            }),
            items,
            registry,
        });

        session.attach();
        if backlog.is_empty() {
            session.go_live();
        }

        Self {
            session,
            replay: backlog.into_iter(),
            tap,
        }
    }

    pub fn id(&self) -> SessionId {
        self.session.id
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Why the session ended, if it has.
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.session.termination()
    }

    /// Backlog items not yet yielded.
    pub fn replay_remaining(&self) -> usize {
        self.replay.len()
    }

    /// Handle that can end this session from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.session.clone())
    }

    /// Receive the next item (blocking).
    pub fn recv(&mut self) -> Result<Item, TerminationReason> {
        match self.poll(Wait::Forever)? {
            Some(item) => Ok(item),
            // Forever only returns once something arrives or the tap closes.
            None => Err(self.ended()),
        }
    }

    /// Receive with timeout. `Ok(None)` means nothing arrived in time.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Item>, TerminationReason> {
        self.poll(Wait::Until(Instant::now() + timeout))
    }

    /// Try to receive an item (non-blocking).
    pub fn try_recv(&mut self) -> Result<Option<Item>, TerminationReason> {
        self.poll(Wait::Never)
    }

    /// End the session. Returns true if this call ended it.
    pub fn cancel(&mut self) -> bool {
        self.session.terminate(TerminationReason::Cancelled)
    }

    /// End the session because an item could not be handed to the
    /// transport. Returns true if this call ended it.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        self.session
            .terminate(TerminationReason::DeliveryFailed(error.into()))
    }

    /// Pump items into `sink` until the session ends.
    ///
    /// A sink error ends only this session, with
    /// [`TerminationReason::DeliveryFailed`].
    pub fn drive<F, E>(mut self, mut sink: F) -> TerminationReason
    where
        F: FnMut(&Item) -> Result<(), E>,
        E: fmt::Display,
    {
        loop {
            let item = match self.recv() {
                Ok(item) => item,
                Err(reason) => return reason,
            };

            if let Err(e) = sink(&item) {
                tracing::debug!(session = %self.session.id, item_id = %item.id, "Sink rejected item");
                self.fail(e.to_string());
                return self.ended();
            }
        }
    }

    fn poll(&mut self, wait: Wait) -> Result<Option<Item>, TerminationReason> {
        if let Some(reason) = self.session.termination() {
            return Err(reason);
        }

        if let Some(item) = self.replay.next() {
            if self.replay.len() == 0 {
                self.session.go_live();
            }
            return Ok(Some(item));
        }

        match wait.recv(&self.tap.receiver) {
            Ok(received) => {
                // A concurrent cancel wins over an item that raced it.
                if let Some(reason) = self.session.termination() {
                    return Err(reason);
                }
                Ok(received)
            }
            Err(()) => Err(self.on_disconnect()),
        }
    }

    /// The tap went away without this session terminating it.
    fn on_disconnect(&self) -> TerminationReason {
        let reason = if self.session.items.take_overflowed(self.session.tap_id) {
            TerminationReason::Overflow
        } else {
            TerminationReason::Shutdown
        };
        self.session.terminate(reason);
        self.ended()
    }

    fn ended(&self) -> TerminationReason {
        self.session
            .termination()
            .unwrap_or(TerminationReason::Cancelled)
    }
}

impl Iterator for ItemStream {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        self.recv().ok()
    }
}

impl Drop for ItemStream {
    fn drop(&mut self) {
        if self.session.terminate(TerminationReason::Cancelled) {
            tracing::debug!(session = %self.session.id, "Item stream dropped while attached");
        }
    }
}

impl fmt::Debug for ItemStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStream")
            .field("id", &self.session.id)
            .field("state", &self.session.state())
            .field("replay_remaining", &self.replay.len())
            .finish()
    }
}
