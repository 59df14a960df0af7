//! Main Hub struct tying all components together.

use crate::bus::Bus;
use crate::error::{HubError, Result};
use crate::items::{IdGenerator, ItemStore};
use crate::registry::SubscriberRegistry;
use crate::sessions::{CountStream, ItemStream, SessionId};
use crate::types::{Item, ItemId, ItemInput, Timestamp};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Hub configuration.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Max buffered items per item subscriber before it is dropped.
    /// Default: 1024
    pub item_buffer_size: usize,

    /// Max buffered count changes per count watcher before it is dropped.
    /// Default: 256
    pub count_buffer_size: usize,

    /// Items published when the hub is created, in order.
    pub seed: Vec<SeedItem>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            item_buffer_size: 1024,
            count_buffer_size: 256,
            seed: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Append the default welcome items to the seed list.
    pub fn with_welcome_items(mut self) -> Self {
        self.seed.extend(welcome_items());
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.item_buffer_size == 0 {
            return Err(HubError::InvalidConfig(
                "item_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.count_buffer_size == 0 {
            return Err(HubError::InvalidConfig(
                "count_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// An item published at startup, backdated by `age`.
#[derive(Clone, Debug)]
pub struct SeedItem {
    pub input: ItemInput,
    pub age: Duration,
}

impl SeedItem {
    pub fn new(input: ItemInput, age: Duration) -> Self {
        Self { input, age }
    }
}

/// The two introductory items a fresh news feed starts with.
pub fn welcome_items() -> Vec<SeedItem> {
    vec![
        SeedItem::new(
            ItemInput::new(
                "Welcome to News Broadcasting",
                "This is a Server-Sent Events (SSE) based news broadcasting system. \
                 Subscribe to receive real-time news updates!",
                "Technology",
                "System Admin",
            ),
            Duration::from_secs(2 * 60 * 60),
        ),
        SeedItem::new(
            ItemInput::new(
                "Spring Boot WebFlux SSE Implementation",
                "This application demonstrates real-time news broadcasting using Spring Boot \
                 WebFlux and Server-Sent Events. New subscribers will receive all existing \
                 news immediately upon connection.",
                "Technology",
                "Development Team",
            ),
            Duration::from_secs(60 * 60),
        ),
    ]
}

/// Hub statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HubStats {
    pub item_count: usize,
    pub subscriber_count: u64,
    /// Open taps on the item bus.
    pub item_taps: usize,
    pub count_watchers: usize,
    pub closed: bool,
}

/// The broadcast hub.
///
/// Provides a unified interface for:
/// - Publishing items (stored forever and pushed to live subscribers)
/// - Opening item streams (backlog replay, then live tail)
/// - Reading and watching the live subscriber count
///
/// All methods take `&self` and are safe to call from any thread; share the
/// hub with `Arc<Hub>`. Publishing and opening an item stream are serialized
/// against each other; receiving, cancelling and count reads are not.
pub struct Hub {
    /// Hub configuration.
    config: HubConfig,

    ids: IdGenerator,

    store: ItemStore,

    /// Item bus, shared with item streams for untap on termination.
    items: Arc<Bus<Item>>,

    /// Subscriber registry and count bus.
    registry: Arc<SubscriberRegistry>,

    /// Counter for generating session IDs.
    next_session: AtomicU64,

    /// Makes "append + publish" and "snapshot + tap" atomic with respect to
    /// each other, so no item is lost or duplicated at the replay/live seam.
    write_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Hub {
    /// Create a hub with the default configuration.
    pub fn new() -> Self {
        Self::build(HubConfig::default())
    }

    /// Create a hub with a custom configuration, publishing its seed items.
    pub fn with_config(config: HubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: HubConfig) -> Self {
        let hub = Self {
            ids: IdGenerator::new(),
            store: ItemStore::new(),
            items: Arc::new(Bus::new("items", config.item_buffer_size)),
            registry: Arc::new(SubscriberRegistry::new(config.count_buffer_size)),
            next_session: AtomicU64::new(1),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            config,
        };

        for seed in hub.config.seed.clone() {
            let _lock = hub.write_lock.lock();
            hub.append_and_broadcast(seed.input, Timestamp::ago(seed.age));
        }
        if !hub.config.seed.is_empty() {
            tracing::info!(items = hub.store.len(), "Initialized with seed items");
        }

        hub
    }

    /// Get the hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // --- Items ---

    /// Publish an item.
    ///
    /// Assigns the id and timestamp, appends to the store and pushes to every
    /// live subscriber. Fails with [`HubError::Closed`] after shutdown.
    pub fn publish(&self, input: ItemInput) -> Result<Item> {
        let _lock = self.write_lock.lock();
        if self.is_closed() {
            return Err(HubError::Closed);
        }

        Ok(self.append_and_broadcast(input, Timestamp::now()))
    }

    /// Caller must hold `write_lock`.
    fn append_and_broadcast(&self, input: ItemInput, published_at: Timestamp) -> Item {
        let item = input.into_item(self.ids.next_id(), published_at);
        self.store.append(item.clone());

        match self.items.publish(item.clone()) {
            Ok(report) => {
                tracing::info!(
                    item_id = %item.id,
                    title = %item.title,
                    delivered = report.delivered,
                    "New item published"
                );
                if !report.overflowed.is_empty() {
                    tracing::warn!(
                        item_id = %item.id,
                        dropped = report.overflowed.len(),
                        "Failed to emit item to some subscribers"
                    );
                }
            }
            Err(e) => {
                // Stored regardless; future subscribers still get it by replay.
                tracing::warn!(item_id = %item.id, error = %e, "Failed to emit item to subscribers");
            }
        }

        item
    }

    /// All items published so far, in publish order.
    pub fn list_all(&self) -> Vec<Item> {
        self.store.snapshot()
    }

    /// Look up an item by id.
    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.store.get(id)
    }

    /// Open an item stream: every item published so far, then every item
    /// published afterward.
    ///
    /// The subscriber is counted from this call until the stream ends.
    pub fn subscribe_to_items(&self) -> Result<ItemStream> {
        let (backlog, tap) = {
            let _lock = self.write_lock.lock();
            if self.is_closed() {
                return Err(HubError::Closed);
            }
            (self.store.snapshot(), self.items.tap()?)
        };

        Ok(ItemStream::attach(
            self.next_session_id(),
            backlog,
            tap,
            Arc::clone(&self.items),
            Arc::clone(&self.registry),
        ))
    }

    // --- Subscriber count ---

    /// Number of item streams currently attached.
    pub fn current_subscriber_count(&self) -> u64 {
        self.registry.current_value()
    }

    /// Open a count stream: the current count, then every change.
    pub fn subscribe_to_count(&self) -> Result<CountStream> {
        if self.is_closed() {
            return Err(HubError::Closed);
        }

        let (initial, tap) = self.registry.watch()?;
        Ok(CountStream::open(
            self.next_session_id(),
            initial,
            tap,
            Arc::clone(&self.registry),
        ))
    }

    // --- Lifecycle ---

    /// Close both buses. Returns false if the hub was already shut down.
    ///
    /// Open streams end with [`TerminationReason::Shutdown`] once they have
    /// drained what was already queued. The count bus closes first, so those
    /// final detaches are counted but not broadcast.
    ///
    /// [`TerminationReason::Shutdown`]: crate::sessions::TerminationReason::Shutdown
    pub fn shutdown(&self) -> bool {
        let _lock = self.write_lock.lock();
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.registry.close();
        self.items.close();

        tracing::info!(
            items = self.store.len(),
            subscribers = self.registry.current_value(),
            "Hub shut down"
        );
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get hub statistics.
    pub fn stats(&self) -> HubStats {
        HubStats {
            item_count: self.store.len(),
            subscriber_count: self.registry.current_value(),
            item_taps: self.items.tap_count(),
            count_watchers: self.registry.watcher_count(),
            closed: self.is_closed(),
        }
    }

    fn next_session_id(&self) -> SessionId {
        SessionId(self.next_session.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
