//! Backing maps for memoized functions.
//!
//! A memoized function stores one [`Slot`] per key. The map decides how long
//! values are retained:
//!
//! | Map | Retention |
//! |-----|-----------|
//! | [`StrongMap`] | for the lifetime of the function (default) |
//! | [`WeakValueMap`] | while some caller still holds the value |
//!
//! Both maps are sharded `DashMap`s, so operations on different keys rarely
//! contend and a lookup of a finished key never takes the session lock.

use crate::error::StorageError;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Per-key state of a memoized function.
#[derive(Clone, Debug)]
pub enum Slot<V> {
    Computing,
    RecursionDetected,
    Value(V),
    Failed(StorageError),
}

/// Concurrent associative storage for memoized slots.
pub trait CacheMap<K, V>: Send + Sync {
    /// Current slot for `key`; `None` if absent or reclaimed.
    fn get(&self, key: &K) -> Option<Slot<V>>;
    fn insert(&self, key: K, slot: Slot<V>);
    fn remove(&self, key: &K);
    /// Number of stored entries, including ones that may have been reclaimed.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// StrongMap
// =============================================================================

/// Keeps every value until the owning function is dropped.
pub struct StrongMap<K, V> {
    entries: DashMap<K, Slot<V>>,
}

impl<K: Eq + Hash, V> StrongMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Default for StrongMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheMap<K, V> for StrongMap<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Slot<V>> {
        self.entries.get(key).map(|slot| slot.clone())
    }

    fn insert(&self, key: K, slot: Slot<V>) {
        self.entries.insert(key, slot);
    }

    fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// WeakValueMap
// =============================================================================

/// Values that can be held weakly by a [`WeakValueMap`].
pub trait Reclaimable: Clone {
    type Weak: Clone + Send + Sync;

    fn downgrade(&self) -> Self::Weak;
    fn upgrade(weak: &Self::Weak) -> Option<Self>;
}

impl<U: ?Sized + Send + Sync> Reclaimable for Arc<U> {
    type Weak = Weak<U>;

    fn downgrade(&self) -> Weak<U> {
        Arc::downgrade(self)
    }

    fn upgrade(weak: &Weak<U>) -> Option<Self> {
        weak.upgrade()
    }
}

/// A cached absence is kept strongly; a present value is held weakly.
impl<U: ?Sized + Send + Sync> Reclaimable for Option<Arc<U>> {
    type Weak = Option<Weak<U>>;

    fn downgrade(&self) -> Option<Weak<U>> {
        self.as_ref().map(Arc::downgrade)
    }

    fn upgrade(weak: &Option<Weak<U>>) -> Option<Self> {
        match weak {
            None => Some(None),
            Some(weak) => weak.upgrade().map(Some),
        }
    }
}

/// Entry count a [`WeakValueMap`] may reach before inserts start purging.
pub const WEAK_MAP_PURGE_THRESHOLD: usize = 64;

/// Holds values weakly: once no caller keeps a value alive its entry counts as
/// absent and the next lookup recomputes it.
///
/// Inserts purge reclaimed entries whenever the map outgrows its purge mark.
/// The mark then moves to twice the surviving size, so purging stays
/// amortized constant per insert.
pub struct WeakValueMap<K, V: Reclaimable> {
    entries: DashMap<K, Slot<V::Weak>>,
    purge_mark: AtomicUsize,
}

impl<K: Eq + Hash, V: Reclaimable> WeakValueMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            purge_mark: AtomicUsize::new(WEAK_MAP_PURGE_THRESHOLD),
        }
    }

    /// Drop entries whose values have been reclaimed.
    pub fn purge(&self) {
        self.entries
            .retain(|_, slot| !matches!(slot, Slot::Value(weak) if V::upgrade(weak).is_none()));
    }
}

impl<K: Eq + Hash, V: Reclaimable> Default for WeakValueMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheMap<K, V> for WeakValueMap<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Reclaimable + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Slot<V>> {
        let slot = self.entries.get(key)?;
        match &*slot {
            Slot::Computing => Some(Slot::Computing),
            Slot::RecursionDetected => Some(Slot::RecursionDetected),
            Slot::Failed(error) => Some(Slot::Failed(error.clone())),
            Slot::Value(weak) => V::upgrade(weak).map(Slot::Value),
        }
    }

    fn insert(&self, key: K, slot: Slot<V>) {
        let slot = match slot {
            Slot::Computing => Slot::Computing,
            Slot::RecursionDetected => Slot::RecursionDetected,
            Slot::Failed(error) => Slot::Failed(error),
            Slot::Value(value) => Slot::Value(value.downgrade()),
        };
        self.entries.insert(key, slot);
        if self.entries.len() > self.purge_mark.load(Ordering::Relaxed) {
            self.purge();
            let mark = (self.entries.len() * 2).max(WEAK_MAP_PURGE_THRESHOLD);
            self.purge_mark.store(mark, Ordering::Relaxed);
        }
    }

    fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[path = "../tests/cache_map_tests.rs"]
mod tests;
