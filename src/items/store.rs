//! Append-only in-memory item store.

use crate::types::{Item, ItemId};
use parking_lot::RwLock;

/// Ordered, append-only sequence of published items.
///
/// Insertion order is publish order. Items are never removed; the store grows
/// for the life of the process.
pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl ItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }

    /// Append an item to the end of the store.
    pub fn append(&self, item: Item) {
        self.items.write().push(item);
    }

    /// Copy of the store as it stands now.
    ///
    /// Later appends never show up in a snapshot that was already taken.
    pub fn snapshot(&self) -> Vec<Item> {
        self.items.read().clone()
    }

    /// Look up an item by id.
    pub fn get(&self, id: ItemId) -> Option<Item> {
        let items = self.items.read();
        // Ids are assigned in append order, so the list is sorted by id.
        items
            .binary_search_by_key(&id, |item| item.id)
            .ok()
            .map(|idx| items[idx].clone())
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}
