//! Lazy values and memoized functions bound to one coordination lock.
//!
//! Everything a resolution session caches is created through a
//! [`LockBasedStorageManager`]. The manager owns a single re-entrant lock and
//! every computation it hands out runs under that lock, so:
//!
//! - a value is computed at most once, even when many threads ask for it
//! - a computation that re-enters its own cell (directly or through a
//!   dependency cycle) is detected instead of deadlocking, and handled by the
//!   cell's [`RecursionPolicy`]
//! - reads of already computed values never take the lock
//!
//! Failures are memoized: a cell whose computation returned an error keeps
//! returning that error.

mod cache_map;
mod error;
mod lazy;
mod manager;
mod memo;
pub mod storage_trace;

pub use cache_map::{CacheMap, Reclaimable, Slot, StrongMap, WEAK_MAP_PURGE_THRESHOLD, WeakValueMap};
pub use error::{StorageError, StorageResult};
pub use lazy::{LazyValue, NullableLazyValue, RecursionPolicy};
pub use manager::LockBasedStorageManager;
pub use memo::{KeyedCache, MemoizedFunction, MemoizedFunctionToNullable};
