//! The storage manager used by resolve sessions.

use crate::safe_trace::LockProtectedTrace;
use crate::trace::BindingTrace;
use kore_storage::{
    LockBasedStorageManager, MemoizedFunction, MemoizedFunctionToNullable, Reclaimable, StorageResult, WeakValueMap,
};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::ops::Deref;

/// A [`LockBasedStorageManager`] that can also hand out lock-protected traces
/// and weakly retained memoized functions.
///
/// Derefs to the underlying manager, so every storage factory is available
/// directly.
#[derive(Clone)]
pub struct LockBasedLazyResolveStorageManager {
    storage: LockBasedStorageManager,
}

impl LockBasedLazyResolveStorageManager {
    pub fn new(storage: LockBasedStorageManager) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &LockBasedStorageManager {
        &self.storage
    }

    /// Wrap `trace` so every access runs under this manager's lock.
    pub fn create_safe_trace<T: BindingTrace>(&self, trace: T) -> LockProtectedTrace<T> {
        LockProtectedTrace::new(self.storage.clone(), trace)
    }

    /// Memoized function whose values are dropped from the cache once no
    /// caller holds them; a reclaimed value is recomputed on the next call.
    pub fn create_weakly_retained_memoized_function<K, V, F>(&self, compute: F) -> MemoizedFunction<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Reclaimable + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<V> + Send + Sync + 'static,
    {
        self.storage
            .create_memoized_function_with_map(compute, WeakValueMap::new())
    }

    pub fn create_weakly_retained_memoized_function_with_nullable_values<K, V, F>(
        &self,
        compute: F,
    ) -> MemoizedFunctionToNullable<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        Option<V>: Reclaimable,
        F: Fn(&K) -> StorageResult<Option<V>> + Send + Sync + 'static,
    {
        self.storage
            .create_memoized_function_with_nullable_values_and_map(compute, WeakValueMap::new())
    }
}

impl Deref for LockBasedLazyResolveStorageManager {
    type Target = LockBasedStorageManager;

    fn deref(&self) -> &LockBasedStorageManager {
        &self.storage
    }
}

impl fmt::Debug for LockBasedLazyResolveStorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockBasedLazyResolveStorageManager({})", self.storage)
    }
}
