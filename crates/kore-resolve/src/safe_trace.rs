use crate::trace::{BindingContext, BindingTrace, Slice, SliceKey, SliceValue, TraceData};
use kore_common::Diagnostic;
use kore_storage::LockBasedStorageManager;

/// Routes every read and write of `trace` through the storage manager's
/// lock. Holds no state of its own.
pub struct LockProtectedTrace<T> {
    storage: LockBasedStorageManager,
    trace: T,
}

impl<T: BindingTrace> LockProtectedTrace<T> {
    pub(crate) fn new(storage: LockBasedStorageManager, trace: T) -> Self {
        Self { storage, trace }
    }
}

impl<T: BindingTrace> BindingContext for LockProtectedTrace<T> {
    fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V> {
        self.storage.compute(|| self.trace.get(slice, key))
    }

    fn get_keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K> {
        self.storage.compute(|| self.trace.get_keys(slice))
    }

    fn get_slice_contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)> {
        self.storage.compute(|| self.trace.get_slice_contents(slice))
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.storage.compute(|| self.trace.diagnostics())
    }
}

impl<T: BindingTrace> BindingTrace for LockProtectedTrace<T> {
    fn record<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: K, value: V) {
        self.storage.compute(|| self.trace.record(slice, key, value))
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.storage.compute(|| self.trace.report(diagnostic))
    }

    fn commit(&self, data: TraceData) {
        self.storage.compute(|| self.trace.commit(data))
    }
}
