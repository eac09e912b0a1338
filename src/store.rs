//! Singleton instance store
//!
//! One `OnceCell` per singleton key. The cell doubles as the per-key creation
//! lock: concurrent first requests for the same key block on the cell while a
//! single thread builds the instance, and every read after publication is a
//! plain atomic load.

use crate::{AnyValue, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Per-key creation cell
type Slot = Arc<OnceCell<AnyValue>>;

/// Thread-safe cache of finished singleton instances
pub(crate) struct SingletonStore {
    slots: DashMap<Arc<str>, Slot, RandomState>,
}

impl SingletonStore {
    /// Create new empty store.
    ///
    /// Uses 8 shards; singleton counts are small and slots are created up
    /// front at finalization, so the map is almost read-only.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Pre-create empty slots so resolution never has to insert
    pub fn prepare<'a>(&self, keys: impl IntoIterator<Item = &'a Arc<str>>) {
        for key in keys {
            self.slots
                .entry(Arc::clone(key))
                .or_insert_with(|| Arc::new(OnceCell::new()));
        }
    }

    /// Published instance for `key`, if any
    #[inline]
    pub fn get(&self, key: &str) -> Option<AnyValue> {
        self.slots.get(key).and_then(|slot| slot.value().get().cloned())
    }

    /// Return the published instance or build it with `create`.
    ///
    /// `create` runs at most once per key across all threads unless it fails;
    /// a failed build publishes nothing and the next request retries.
    pub fn get_or_try_create<F>(&self, key: &Arc<str>, create: F) -> Result<AnyValue>
    where
        F: FnOnce() -> Result<AnyValue>,
    {
        let slot = self.slot(key);
        slot.get_or_try_init(create).cloned()
    }

    /// Check if `key` has a published instance
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of published instances
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().get().is_some()).count()
    }

    fn slot(&self, key: &Arc<str>) -> Slot {
        if let Some(slot) = self.slots.get(&**key) {
            return Arc::clone(slot.value());
        }
        // Clone out of the map so no shard lock is held while building
        let slot = self
            .slots
            .entry(Arc::clone(key))
            .or_insert_with(|| Arc::new(OnceCell::new()));
        Arc::clone(slot.value())
    }
}

impl Default for SingletonStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SingletonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonStore")
            .field("published", &self.len())
            .finish()
    }
}
