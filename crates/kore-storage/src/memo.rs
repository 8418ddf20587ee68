//! Key-indexed families of lazy cells.
//!
//! A [`MemoizedFunction`] keeps one [`Slot`] per key in its [`CacheMap`]. The
//! slot plays the role a lazy cell's state plays for [`LazyValue`]: a cold
//! key is marked `Computing` under the session lock, computed, and then
//! replaced by its value or failure. A finished key is served straight from
//! the map.
//!
//! [`LazyValue`]: crate::LazyValue

use crate::cache_map::{CacheMap, Slot};
use crate::error::StorageResult;
use crate::manager::ManagerCore;
use crate::storage_trace::{self, CellKind};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

type Compute<K, V> = Box<dyn Fn(&K) -> StorageResult<V> + Send + Sync>;
type OnRecursion<K, V> = Box<dyn Fn(&K, bool) -> StorageResult<V> + Send + Sync>;

/// Slot bookkeeping shared by [`MemoizedFunction`] and [`KeyedCache`].
struct MemoCore<K, V> {
    manager: Arc<ManagerCore>,
    map: Box<dyn CacheMap<K, V>>,
    on_recursion: Option<OnRecursion<K, V>>,
}

impl<K, V> MemoCore<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn finished(&self, key: &K) -> Option<StorageResult<V>> {
        match self.map.get(key)? {
            Slot::Value(value) => Some(Ok(value)),
            Slot::Failed(error) => Some(Err(error)),
            Slot::Computing | Slot::RecursionDetected => None,
        }
    }

    fn get_or_compute(&self, key: &K, compute: impl FnOnce(&K) -> StorageResult<V>) -> StorageResult<V> {
        if let Some(finished) = self.finished(key) {
            return finished;
        }
        self.manager.with_lock(|| {
            match self.map.get(key) {
                Some(Slot::Value(value)) => return Ok(value),
                Some(Slot::Failed(error)) => return Err(error),
                Some(Slot::Computing) => {
                    self.map.insert(key.clone(), Slot::RecursionDetected);
                    return self.recursion_detected(key, true);
                }
                Some(Slot::RecursionDetected) => return self.recursion_detected(key, false),
                None => {}
            }

            self.map.insert(key.clone(), Slot::Computing);
            let computation_id = storage_trace::next_computation_id();
            storage_trace::compute_begin(computation_id, CellKind::Memo, self.manager.id, Some(key as &dyn Debug));

            let reset = RemoveOnUnwind { core: self, key };
            let outcome = compute(key);
            std::mem::forget(reset);

            if !matches!(self.map.get(key), Some(Slot::Computing | Slot::RecursionDetected)) {
                warn!(
                    target: storage_trace::TARGET,
                    manager_id = self.manager.id,
                    key = ?key,
                    "memoized slot changed while its value was being computed"
                );
            }

            match outcome {
                Ok(value) => {
                    self.map.insert(key.clone(), Slot::Value(value.clone()));
                    storage_trace::compute_end(computation_id, CellKind::Memo, "value");
                    Ok(value)
                }
                Err(error) => {
                    self.map.insert(key.clone(), Slot::Failed(error.clone()));
                    storage_trace::compute_end(computation_id, CellKind::Memo, "failed");
                    Err(error)
                }
            }
        })
    }

    fn recursion_detected(&self, key: &K, first_time: bool) -> StorageResult<V> {
        storage_trace::recursion(CellKind::Memo, self.manager.id, first_time, self.on_recursion.is_some());
        match &self.on_recursion {
            Some(handler) => handler(key, first_time),
            None => Err(self
                .manager
                .recursion_error("in a memoized function", Some(format!("{key:?}")))),
        }
    }

    fn is_computed(&self, key: &K) -> bool {
        self.finished(key).is_some()
    }
}

/// Removes the `Computing` marker if the computation unwinds.
struct RemoveOnUnwind<'a, K, V> {
    core: &'a MemoCore<K, V>,
    key: &'a K,
}

impl<K, V> Drop for RemoveOnUnwind<'_, K, V> {
    fn drop(&mut self) {
        self.core.map.remove(self.key);
        storage_trace::reset_after_panic(CellKind::Memo, self.core.manager.id);
    }
}

// =============================================================================
// MemoizedFunction
// =============================================================================

struct MemoizedInner<K, V> {
    core: MemoCore<K, V>,
    compute: Compute<K, V>,
}

/// A function `K -> V` whose results are computed once per key.
pub struct MemoizedFunction<K, V> {
    inner: Arc<MemoizedInner<K, V>>,
}

/// A memoized function whose results may be absent; absence is cached.
pub type MemoizedFunctionToNullable<K, V> = MemoizedFunction<K, Option<V>>;

impl<K, V> Clone for MemoizedFunction<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> MemoizedFunction<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        manager: Arc<ManagerCore>,
        compute: Compute<K, V>,
        map: Box<dyn CacheMap<K, V>>,
        on_recursion: Option<OnRecursion<K, V>>,
    ) -> Self {
        Self {
            inner: Arc::new(MemoizedInner {
                core: MemoCore {
                    manager,
                    map,
                    on_recursion,
                },
                compute,
            }),
        }
    }

    /// The memoized value for `key`, computed on first request.
    pub fn invoke(&self, key: &K) -> StorageResult<V> {
        let inner = &*self.inner;
        inner.core.get_or_compute(key, |key| (inner.compute)(key))
    }

    /// Whether `key` has a cached value or failure.
    pub fn is_computed(&self, key: &K) -> bool {
        self.inner.core.is_computed(key)
    }

    /// Number of entries in the backing map.
    pub fn cached_len(&self) -> usize {
        self.inner.core.map.len()
    }
}

impl<K, V> Debug for MemoizedFunction<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedFunction")
            .field("manager_id", &self.inner.core.manager.id)
            .field("entries", &self.inner.core.map.len())
            .finish()
    }
}

// =============================================================================
// KeyedCache
// =============================================================================

/// A memoized cache whose computation is supplied at each lookup.
///
/// Entries are identified by key alone: whichever computation runs first for a
/// key determines the cached value.
pub struct KeyedCache<K, V> {
    core: Arc<MemoCore<K, V>>,
}

impl<K, V> Clone for KeyedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(manager: Arc<ManagerCore>, map: Box<dyn CacheMap<K, V>>) -> Self {
        Self {
            core: Arc::new(MemoCore {
                manager,
                map,
                on_recursion: None,
            }),
        }
    }

    pub fn compute_if_absent(&self, key: K, computation: impl FnOnce() -> StorageResult<V>) -> StorageResult<V> {
        self.core.get_or_compute(&key, |_| computation())
    }

    pub fn is_computed(&self, key: &K) -> bool {
        self.core.is_computed(key)
    }
}

#[cfg(test)]
#[path = "../tests/memo_tests.rs"]
mod tests;
