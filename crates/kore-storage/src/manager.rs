//! The storage manager: one lock per resolution session.

use crate::cache_map::{CacheMap, StrongMap};
use crate::error::{StorageError, StorageResult};
use crate::lazy::{LazyValue, NullableLazyValue, RecursionPolicy};
use crate::memo::{KeyedCache, MemoizedFunction, MemoizedFunctionToNullable};
use parking_lot::ReentrantMutex;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Global counter for distinguishing managers in traces and error messages.
static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// State shared between a manager and every cell it created.
pub(crate) struct ManagerCore {
    pub(crate) id: u64,
    debug_text: String,
    lock: ReentrantMutex<()>,
}

impl ManagerCore {
    /// Run `f` while holding the session lock. Re-entrant on the same thread.
    #[inline]
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.lock();
        f()
    }

    pub(crate) fn recursion_error(&self, location: &'static str, input: Option<String>) -> StorageError {
        StorageError::RecursionDetected {
            location,
            input,
            manager: self.to_string(),
        }
    }
}

impl fmt::Display for ManagerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockBasedStorageManager@{} ({})", self.id, self.debug_text)
    }
}

/// Factory and coordinator for every lazy computation of one session.
///
/// Cloning the manager is cheap and yields a handle to the same lock. Values
/// and functions created here keep the lock alive, so they may outlive the
/// handle they were created from.
#[derive(Clone)]
pub struct LockBasedStorageManager {
    core: Arc<ManagerCore>,
}

impl LockBasedStorageManager {
    pub fn new(debug_text: impl Into<String>) -> Self {
        let id = NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed);
        let debug_text = debug_text.into();
        debug!(target: "kore::storage", manager_id = id, %debug_text, "storage manager created");
        Self {
            core: Arc::new(ManagerCore {
                id,
                debug_text,
                lock: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn debug_text(&self) -> &str {
        &self.core.debug_text
    }

    /// Run `thunk` under the session lock. Nothing is cached: calling again
    /// runs the thunk again. Re-entrant calls on the same thread do not block.
    pub fn compute<R>(&self, thunk: impl FnOnce() -> R) -> R {
        self.core.with_lock(thunk)
    }

    // =========================================================================
    // Lazy values
    // =========================================================================

    pub fn create_lazy_value<T, F>(&self, computable: F) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Fail, None)
    }

    /// Re-entrant requests made while computing get `on_recursive_call`.
    pub fn create_recursion_tolerant_lazy_value<T, F>(&self, computable: F, on_recursive_call: T) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Value(on_recursive_call), None)
    }

    /// Re-entrant requests are answered by `on_recursive_call(first_time)`.
    pub fn create_lazy_value_with_recursion_handler<T, F, R>(&self, computable: F, on_recursive_call: R) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
        R: Fn(bool) -> StorageResult<T> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Compute(Box::new(on_recursive_call)), None)
    }

    /// `post_compute` runs once with the computed value before it is published.
    /// Without `on_recursive_call` a re-entrant request is an error.
    pub fn create_lazy_value_with_post_compute<T, F, P>(
        &self,
        computable: F,
        on_recursive_call: Option<T>,
        post_compute: P,
    ) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
        P: Fn(&T) -> StorageResult<()> + Send + Sync + 'static,
    {
        let policy = match on_recursive_call {
            Some(value) => RecursionPolicy::Value(value),
            None => RecursionPolicy::Fail,
        };
        self.lazy(computable, policy, Some(Box::new(post_compute)))
    }

    pub fn create_nullable_lazy_value<T, F>(&self, computable: F) -> NullableLazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<Option<T>> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Fail, None)
    }

    pub fn create_recursion_tolerant_nullable_lazy_value<T, F>(
        &self,
        computable: F,
        on_recursive_call: Option<T>,
    ) -> NullableLazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<Option<T>> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Value(on_recursive_call), None)
    }

    pub fn create_nullable_lazy_value_with_post_compute<T, F, P>(
        &self,
        computable: F,
        post_compute: P,
    ) -> NullableLazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<Option<T>> + Send + Sync + 'static,
        P: Fn(&Option<T>) -> StorageResult<()> + Send + Sync + 'static,
    {
        self.lazy(computable, RecursionPolicy::Fail, Some(Box::new(post_compute)))
    }

    fn lazy<T, F>(
        &self,
        computable: F,
        policy: RecursionPolicy<T>,
        post_compute: Option<Box<dyn Fn(&T) -> StorageResult<()> + Send + Sync>>,
    ) -> LazyValue<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
    {
        LazyValue::new(Arc::clone(&self.core), Box::new(computable), policy, post_compute)
    }

    // =========================================================================
    // Memoized functions
    // =========================================================================

    /// Memoized function backed by the default [`StrongMap`].
    pub fn create_memoized_function<K, V, F>(&self, compute: F) -> MemoizedFunction<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<V> + Send + Sync + 'static,
    {
        self.create_memoized_function_with_map(compute, StrongMap::new())
    }

    /// Memoized function backed by a caller-supplied map.
    pub fn create_memoized_function_with_map<K, V, F, M>(&self, compute: F, map: M) -> MemoizedFunction<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<V> + Send + Sync + 'static,
        M: CacheMap<K, V> + 'static,
    {
        MemoizedFunction::new(Arc::clone(&self.core), Box::new(compute), Box::new(map), None)
    }

    /// Re-entrant requests for a key are answered by
    /// `on_recursive_call(key, first_time)`.
    pub fn create_memoized_function_with_recursion_handler<K, V, F, R>(
        &self,
        compute: F,
        on_recursive_call: R,
    ) -> MemoizedFunction<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<V> + Send + Sync + 'static,
        R: Fn(&K, bool) -> StorageResult<V> + Send + Sync + 'static,
    {
        MemoizedFunction::new(
            Arc::clone(&self.core),
            Box::new(compute),
            Box::new(StrongMap::new()),
            Some(Box::new(on_recursive_call)),
        )
    }

    pub fn create_memoized_function_with_nullable_values<K, V, F>(&self, compute: F) -> MemoizedFunctionToNullable<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<Option<V>> + Send + Sync + 'static,
    {
        self.create_memoized_function_with_map(compute, StrongMap::new())
    }

    pub fn create_memoized_function_with_nullable_values_and_map<K, V, F, M>(
        &self,
        compute: F,
        map: M,
    ) -> MemoizedFunctionToNullable<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        F: Fn(&K) -> StorageResult<Option<V>> + Send + Sync + 'static,
        M: CacheMap<K, Option<V>> + 'static,
    {
        self.create_memoized_function_with_map(compute, map)
    }

    // =========================================================================
    // Caches with per-call computations
    // =========================================================================

    pub fn create_cache_with_not_null_values<K, V>(&self) -> KeyedCache<K, V>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        KeyedCache::new(Arc::clone(&self.core), Box::new(StrongMap::new()))
    }

    pub fn create_cache_with_nullable_values<K, V>(&self) -> KeyedCache<K, Option<V>>
    where
        K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        KeyedCache::new(Arc::clone(&self.core), Box::new(StrongMap::new()))
    }
}

impl Default for LockBasedStorageManager {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Display for LockBasedStorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.core, f)
    }
}

impl fmt::Debug for LockBasedStorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.core, f)
    }
}

#[cfg(test)]
#[path = "../tests/manager_tests.rs"]
mod tests;
