//! Subscriber count watchers.

use crate::bus::{Tap, TapId};
use crate::registry::SubscriberRegistry;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{Cancel, CancelHandle, SessionId, TerminationReason, Wait};

/// Watcher state shared between the stream and its cancel handles.
pub(crate) struct CountWatch {
    id: SessionId,
    tap_id: TapId,
    reason: Mutex<Option<TerminationReason>>,
    registry: Arc<SubscriberRegistry>,
}

impl CountWatch {
    fn termination(&self) -> Option<TerminationReason> {
        self.reason.lock().clone()
    }

    fn terminate(&self, reason: TerminationReason) -> bool {
        {
            let mut current = self.reason.lock();
            if current.is_some() {
                return false;
            }
            *current = Some(reason.clone());
        }

        self.registry.unwatch(self.tap_id);
        tracing::debug!(session = %self.id, reason = %reason, "Count watcher disconnected");
        true
    }
}

impl Cancel for CountWatch {
    fn cancel(&self) -> bool {
        self.terminate(TerminationReason::Cancelled)
    }

    fn is_terminated(&self) -> bool {
        self.reason.lock().is_some()
    }
}

/// Live view of the subscriber count.
///
/// Yields the count as it was when the watcher opened, then every later
/// change. Consecutive equal values are collapsed into one. Watchers are not
/// subscribers themselves and never change the count.
pub struct CountStream {
    watch: Arc<CountWatch>,
    /// Fresh count captured at open, not yet yielded.
    initial: Option<u64>,
    last: Option<u64>,
    tap: Tap<u64>,
}

impl CountStream {
    pub(crate) fn open(
        id: SessionId,
        initial: u64,
        tap: Tap<u64>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        tracing::debug!(session = %id, subscribers = initial, "Count watcher connected");

        Self {
            watch: Arc::new(CountWatch {
                id,
                tap_id: tap.id,
                reason: Mutex::new(None),
                registry,
            }),
            initial: Some(initial),
            last: None,
            tap,
        }
    }

    pub fn id(&self) -> SessionId {
        self.watch.id
    }

    /// Why the watcher ended, if it has.
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.watch.termination()
    }

    /// Handle that can end this watcher from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.watch.clone())
    }

    /// Receive the next count (blocking).
    pub fn recv(&mut self) -> Result<u64, TerminationReason> {
        match self.poll(Wait::Forever)? {
            Some(count) => Ok(count),
            None => Err(self.ended()),
        }
    }

    /// Receive with timeout. `Ok(None)` means no change arrived in time.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<u64>, TerminationReason> {
        self.poll(Wait::Until(Instant::now() + timeout))
    }

    /// Try to receive a count (non-blocking).
    pub fn try_recv(&mut self) -> Result<Option<u64>, TerminationReason> {
        self.poll(Wait::Never)
    }

    /// End the watcher. Returns true if this call ended it.
    pub fn cancel(&mut self) -> bool {
        self.watch.terminate(TerminationReason::Cancelled)
    }

    fn poll(&mut self, wait: Wait) -> Result<Option<u64>, TerminationReason> {
        if let Some(reason) = self.watch.termination() {
            return Err(reason);
        }

        if let Some(count) = self.initial.take() {
            self.last = Some(count);
            return Ok(Some(count));
        }

        loop {
            match wait.recv(&self.tap.receiver) {
                Ok(Some(count)) => {
                    if let Some(reason) = self.watch.termination() {
                        return Err(reason);
                    }
                    if self.last == Some(count) {
                        continue;
                    }
                    self.last = Some(count);
                    return Ok(Some(count));
                }
                Ok(None) => return Ok(None),
                Err(()) => return Err(self.on_disconnect()),
            }
        }
    }

    /// Count taps coalesce instead of overflowing, so only a close
    /// disconnects one.
    fn on_disconnect(&self) -> TerminationReason {
        self.watch.terminate(TerminationReason::Shutdown);
        self.ended()
    }

    fn ended(&self) -> TerminationReason {
        self.watch
            .termination()
            .unwrap_or(TerminationReason::Cancelled)
    }
}

impl Iterator for CountStream {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.recv().ok()
    }
}

impl Drop for CountStream {
    fn drop(&mut self) {
        self.watch.terminate(TerminationReason::Cancelled);
    }
}

impl fmt::Debug for CountStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountStream")
            .field("id", &self.watch.id)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(registry: &Arc<SubscriberRegistry>) -> CountStream {
        let (initial, tap) = registry.watch().unwrap();
        CountStream::open(SessionId(1), initial, tap, Arc::clone(registry))
    }

    #[test]
    fn test_initial_value_then_changes() {
        let registry = Arc::new(SubscriberRegistry::new(16));
        registry.increment();

        let mut stream = open(&registry);
        assert_eq!(stream.try_recv().unwrap(), Some(1));
        assert_eq!(stream.try_recv().unwrap(), None);

        registry.increment();
        registry.decrement();
        assert_eq!(stream.try_recv().unwrap(), Some(2));
        assert_eq!(stream.try_recv().unwrap(), Some(1));
    }

    #[test]
    fn test_watchers_do_not_count() {
        let registry = Arc::new(SubscriberRegistry::new(16));
        let _a = open(&registry);
        let _b = open(&registry);

        assert_eq!(registry.current_value(), 0);
        assert_eq!(registry.watcher_count(), 2);
    }

    #[test]
    fn test_cancel_handle_ends_watcher() {
        let registry = Arc::new(SubscriberRegistry::new(16));
        let mut stream = open(&registry);
        let handle = stream.cancel_handle();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_terminated());
        assert_eq!(stream.try_recv(), Err(TerminationReason::Cancelled));
        assert_eq!(registry.watcher_count(), 0);
    }

    #[test]
    fn test_repeat_left_by_coalescing_is_skipped() {
        let registry = Arc::new(SubscriberRegistry::new(2));
        let mut stream = open(&registry);

        // Queue holds [1, 0]; the next push evicts the 1, leaving [0, 1]
        registry.increment();
        registry.decrement();
        registry.increment();

        assert_eq!(stream.try_recv().unwrap(), Some(0));
        assert_eq!(stream.try_recv().unwrap(), Some(1));
        assert_eq!(stream.try_recv().unwrap(), None);
        assert!(stream.termination_reason().is_none());
    }

    #[test]
    fn test_lagging_watcher_is_not_dropped() {
        let registry = Arc::new(SubscriberRegistry::new(4));
        let mut stream = open(&registry);

        for _ in 0..300 {
            registry.increment();
            registry.decrement();
        }

        let observed: Vec<u64> = std::iter::from_fn(|| stream.try_recv().unwrap()).collect();
        assert_eq!(observed.first(), Some(&0));
        assert_eq!(observed.last(), Some(&0));
        assert!(stream.termination_reason().is_none());
        assert_eq!(registry.watcher_count(), 1);
    }

    #[test]
    fn test_close_ends_with_shutdown() {
        let registry = Arc::new(SubscriberRegistry::new(16));
        let mut stream = open(&registry);
        assert_eq!(stream.try_recv().unwrap(), Some(0));

        registry.close();
        assert_eq!(
            stream.recv_timeout(Duration::from_millis(100)),
            Err(TerminationReason::Shutdown)
        );
    }
}
