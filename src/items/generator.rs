//! Monotonic item id generator.

use crate::types::ItemId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing item ids, starting at 1.
///
/// Safe under concurrent callers: no two calls ever observe the same id.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a generator whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create a generator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Return a fresh id.
    pub fn next_id(&self) -> ItemId {
        ItemId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// The id the next call will return.
    pub fn peek(&self) -> ItemId {
        ItemId(self.next.load(Ordering::SeqCst))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let generator = IdGenerator::new();
        assert_eq!(generator.next_id(), ItemId(1));
        assert_eq!(generator.next_id(), ItemId(2));
        assert_eq!(generator.peek(), ItemId(3));
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let generator = Arc::new(IdGenerator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || (0..500).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.join().unwrap();
            // Per-thread ids are strictly increasing
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(id), "duplicate id {:?}", id);
            }
        }

        assert_eq!(seen.len(), 4000);
        assert_eq!(generator.peek(), ItemId(4001));
    }
}
