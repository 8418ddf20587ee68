//! Sharded string table for identifier text.
//!
//! Every [`Name`](crate::Name) stores its text as an `Arc<str>` obtained from a
//! [`NameTable`], so equal identifiers share one allocation no matter how many
//! descriptors, cache keys or trace entries mention them.
//!
//! # Design
//!
//! The table is split into [`SHARD_COUNT`] buckets selected by an `FxHasher`
//! of the text. Each bucket has its own `RwLock`, so interning from several
//! resolver threads rarely contends. A poisoned bucket never fails an intern:
//! the caller gets a fresh, unshared `Arc<str>`. Name equality compares text,
//! so that only costs memory.

use rustc_hash::{FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

const SHARD_BITS: u32 = 4;
/// Number of independently locked buckets.
pub const SHARD_COUNT: usize = 1 << SHARD_BITS;

#[derive(Default)]
struct TableShard {
    strings: RwLock<FxHashSet<Arc<str>>>,
}

/// Concurrent deduplicating table of identifier strings.
pub struct NameTable {
    shards: [TableShard; SHARD_COUNT],
}

impl NameTable {
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| TableShard::default()),
        }
    }

    /// Return the shared allocation for `text`, inserting it on first use.
    pub fn intern(&self, text: &str) -> Arc<str> {
        let shard = &self.shards[Self::shard_for(text)];

        if let Ok(strings) = shard.strings.read()
            && let Some(existing) = strings.get(text)
        {
            return Arc::clone(existing);
        }

        let Ok(mut strings) = shard.strings.write() else {
            return Arc::from(text);
        };
        // Another thread may have inserted between the read and write locks.
        if let Some(existing) = strings.get(text) {
            return Arc::clone(existing);
        }
        let owned: Arc<str> = Arc::from(text);
        strings.insert(Arc::clone(&owned));
        owned
    }

    /// Whether `text` has already been interned.
    pub fn contains(&self, text: &str) -> bool {
        self.shards[Self::shard_for(text)]
            .strings
            .read()
            .map(|strings| strings.contains(text))
            .unwrap_or(false)
    }

    /// Number of distinct strings across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.strings.read().map(|s| s.len()).unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn shard_for(text: &str) -> usize {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        (hasher.finish() as usize) & (SHARD_COUNT - 1)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
