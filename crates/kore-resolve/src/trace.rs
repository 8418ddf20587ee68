//! The binding trace: a slice-keyed store of resolution results.
//!
//! # Design
//!
//! A [`Slice<K, V>`] names one kind of fact ("descriptor of this class",
//! "members resolved for this name"). Entries of all slices live in a single
//! [`TraceData`] table keyed by the slice name and the slice's key/value
//! types, so lookups never need an unchecked cast.
//!
//! Traits expose reads ([`BindingContext`]) and writes ([`BindingTrace`])
//! through `&self`; implementations keep their data behind a
//! `parking_lot::RwLock`. Serializing trace access with the rest of the
//! session is the job of [`LockProtectedTrace`](crate::LockProtectedTrace).

use indexmap::IndexMap;
use kore_common::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Bounds for slice keys.
pub trait SliceKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}
impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> SliceKey for T {}

/// Bounds for slice values.
pub trait SliceValue: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> SliceValue for T {}

/// A typed family of trace entries, identified by name.
pub struct Slice<K, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Slice<K, V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<K, V> Clone for Slice<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Slice<K, V> {}

impl<K, V> fmt::Debug for Slice<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slice({})", self.name)
    }
}

// =============================================================================
// Type-erased slice storage
// =============================================================================

trait ErasedSliceMap: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedSliceMap>;
    fn merge_into(self: Box<Self>, target: &mut TraceData);
    fn len(&self) -> usize;
}

struct SliceMap<K, V> {
    slice: Slice<K, V>,
    entries: IndexMap<K, V>,
}

impl<K: SliceKey, V: SliceValue> ErasedSliceMap for SliceMap<K, V> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedSliceMap> {
        Box::new(SliceMap {
            slice: self.slice,
            entries: self.entries.clone(),
        })
    }

    fn merge_into(self: Box<Self>, target: &mut TraceData) {
        let slice = self.slice;
        for (key, value) in self.entries {
            target.record(slice, key, value);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

type SliceTableKey = (&'static str, TypeId);

/// Owned trace contents: slice entries plus diagnostics in report order.
#[derive(Default)]
pub struct TraceData {
    slices: FxHashMap<SliceTableKey, Box<dyn ErasedSliceMap>>,
    diagnostics: Vec<Diagnostic>,
}

impl TraceData {
    fn table_key<K: SliceKey, V: SliceValue>(slice: Slice<K, V>) -> SliceTableKey {
        (slice.name, TypeId::of::<SliceMap<K, V>>())
    }

    fn entries<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Option<&IndexMap<K, V>> {
        self.slices
            .get(&Self::table_key(slice))
            .and_then(|map| map.as_any().downcast_ref::<SliceMap<K, V>>())
            .map(|map| &map.entries)
    }

    pub fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V> {
        self.entries(slice)?.get(key).cloned()
    }

    pub fn keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K> {
        self.entries(slice)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)> {
        self.entries(slice)
            .map(|entries| entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Record `value` for `key`, replacing an earlier entry.
    pub fn record<K: SliceKey, V: SliceValue>(&mut self, slice: Slice<K, V>, key: K, value: V) {
        let map = self.slices.entry(Self::table_key(slice)).or_insert_with(|| {
            Box::new(SliceMap {
                slice,
                entries: IndexMap::<K, V>::new(),
            })
        });
        if let Some(map) = map.as_any_mut().downcast_mut::<SliceMap<K, V>>() {
            map.entries.insert(key, value);
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Move every entry and diagnostic of `other` into `self`.
    pub fn merge(&mut self, other: TraceData) {
        for (_, map) in other.slices {
            map.merge_into(self);
        }
        self.diagnostics.extend(other.diagnostics);
    }

    /// Number of entries across all slices.
    pub fn len(&self) -> usize {
        self.slices.values().map(|map| map.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.diagnostics.is_empty()
    }
}

impl Clone for TraceData {
    fn clone(&self) -> Self {
        Self {
            slices: self
                .slices
                .iter()
                .map(|(key, map)| (*key, map.clone_box()))
                .collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl fmt::Debug for TraceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceData")
            .field("slices", &self.slices.keys().map(|(name, _)| *name).collect::<Vec<_>>())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Read access to recorded resolution results.
pub trait BindingContext: Send + Sync {
    fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V>;

    fn get_keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K>;

    fn get_slice_contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)>;

    fn diagnostics(&self) -> Vec<Diagnostic>;
}

/// A [`BindingContext`] that can also be written to.
pub trait BindingTrace: BindingContext {
    fn record<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: K, value: V);

    fn report(&self, diagnostic: Diagnostic);

    /// Absorb a batch of entries, e.g. from a [`DelegatingBindingTrace`].
    fn commit(&self, data: TraceData);
}

macro_rules! forward_binding_context {
    ($($ty:ty),*) => {$(
        impl<T: BindingContext> BindingContext for $ty {
            fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V> {
                (**self).get(slice, key)
            }

            fn get_keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K> {
                (**self).get_keys(slice)
            }

            fn get_slice_contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)> {
                (**self).get_slice_contents(slice)
            }

            fn diagnostics(&self) -> Vec<Diagnostic> {
                (**self).diagnostics()
            }
        }
    )*};
}

forward_binding_context!(&T, Arc<T>);

impl<T: BindingTrace> BindingTrace for Arc<T> {
    fn record<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: K, value: V) {
        (**self).record(slice, key, value)
    }

    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }

    fn commit(&self, data: TraceData) {
        (**self).commit(data)
    }
}

// =============================================================================
// BindingTraceContext
// =============================================================================

/// The plain, self-contained trace.
#[derive(Default)]
pub struct BindingTraceContext {
    data: RwLock<TraceData>,
}

impl BindingTraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn snapshot(&self) -> TraceData {
        self.data.read().clone()
    }
}

impl BindingContext for BindingTraceContext {
    fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V> {
        self.data.read().get(slice, key)
    }

    fn get_keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K> {
        self.data.read().keys(slice)
    }

    fn get_slice_contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)> {
        self.data.read().contents(slice)
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.data.read().diagnostics().to_vec()
    }
}

impl BindingTrace for BindingTraceContext {
    fn record<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: K, value: V) {
        self.data.write().record(slice, key, value);
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.data.write().report(diagnostic);
    }

    fn commit(&self, data: TraceData) {
        self.data.write().merge(data);
    }
}

// =============================================================================
// DelegatingBindingTrace
// =============================================================================

/// A trace layered over a parent context. Writes stay in the layer; reads
/// see the layer first and fall through to the parent.
pub struct DelegatingBindingTrace<P> {
    parent: P,
    debug_name: String,
    data: RwLock<TraceData>,
}

impl<P: BindingContext> DelegatingBindingTrace<P> {
    pub fn new(parent: P, debug_name: impl Into<String>) -> Self {
        Self {
            parent,
            debug_name: debug_name.into(),
            data: RwLock::new(TraceData::default()),
        }
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Copy the entries recorded in this layer (not the parent's) into `trace`.
    pub fn add_owned_data_to(&self, trace: &impl BindingTrace) {
        trace.commit(self.data.read().clone());
    }

    /// Number of entries recorded in this layer.
    pub fn owned_len(&self) -> usize {
        self.data.read().len()
    }
}

impl<P: BindingContext> BindingContext for DelegatingBindingTrace<P> {
    fn get<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: &K) -> Option<V> {
        if let Some(value) = self.data.read().get(slice, key) {
            return Some(value);
        }
        self.parent.get(slice, key)
    }

    fn get_keys<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<K> {
        let mut keys = self.parent.get_keys(slice);
        let own = self.data.read().keys(slice);
        for key in own {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn get_slice_contents<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>) -> Vec<(K, V)> {
        let mut contents: IndexMap<K, V> = self.parent.get_slice_contents(slice).into_iter().collect();
        contents.extend(self.data.read().contents(slice));
        contents.into_iter().collect()
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.parent.diagnostics();
        diagnostics.extend_from_slice(self.data.read().diagnostics());
        diagnostics
    }
}

impl<P: BindingContext> BindingTrace for DelegatingBindingTrace<P> {
    fn record<K: SliceKey, V: SliceValue>(&self, slice: Slice<K, V>, key: K, value: V) {
        self.data.write().record(slice, key, value);
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.data.write().report(diagnostic);
    }

    fn commit(&self, data: TraceData) {
        self.data.write().merge(data);
    }
}

impl<P> fmt::Debug for DelegatingBindingTrace<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingBindingTrace")
            .field("debug_name", &self.debug_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../tests/trace_tests.rs"]
mod tests;
