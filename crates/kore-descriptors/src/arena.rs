//! Session-scoped storage for descriptors.
//!
//! Every descriptor created during a resolution session is allocated here and
//! referred to by a [`DescriptorId`]. Ids are allocated sequentially and never
//! reused; the arena is dropped with the session.

use crate::descriptor::{CallableMemberDescriptor, ClassDescriptor, Descriptor, TypeParameterDescriptor};
use crate::error::DescriptorError;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::trace;

/// Global counter for distinguishing arenas in traces.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub u32);

impl DescriptorId {
    /// Sentinel value for an invalid `DescriptorId`.
    pub const INVALID: Self = Self(0);

    /// First valid `DescriptorId`.
    pub const FIRST_VALID: u32 = 1;

    pub const fn is_valid(self) -> bool {
        self.0 >= Self::FIRST_VALID
    }
}

pub struct DescriptorArena {
    instance_id: u64,
    descriptors: DashMap<DescriptorId, Descriptor>,
    next_id: AtomicU32,
}

impl DescriptorArena {
    pub fn new() -> Self {
        let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::SeqCst);
        trace!(instance_id, "DescriptorArena::new");
        Self {
            instance_id,
            descriptors: DashMap::new(),
            next_id: AtomicU32::new(DescriptorId::FIRST_VALID),
        }
    }

    fn allocate(&self) -> DescriptorId {
        DescriptorId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocate an id and build the descriptor that owns it. `build` may
    /// allocate further descriptors (e.g. type parameters pointing back at
    /// their container).
    pub fn alloc_with(&self, build: impl FnOnce(DescriptorId) -> Descriptor) -> DescriptorId {
        let id = self.allocate();
        let descriptor = build(id);
        trace!(
            instance_id = self.instance_id,
            descriptor_id = id.0,
            kind = descriptor.kind_name(),
            name = %descriptor.name(),
            "DescriptorArena::alloc"
        );
        self.descriptors.insert(id, descriptor);
        id
    }

    /// Reserve `count` ids up front, for descriptors that must know each
    /// other's ids before they exist (a class and its type parameters, a type
    /// parameter bounded by itself). Each id is later set with [`fill`](Self::fill).
    pub fn reserve(&self, count: u32) -> Vec<DescriptorId> {
        let first = self.next_id.fetch_add(count, Ordering::SeqCst);
        (first..first + count).map(DescriptorId).collect()
    }

    pub fn fill(&self, id: DescriptorId, descriptor: Descriptor) -> Result<(), DescriptorError> {
        if !id.is_valid() || id.0 >= self.next_id.load(Ordering::SeqCst) {
            return Err(DescriptorError::UnknownDescriptor(id));
        }
        match self.descriptors.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DescriptorError::IllegalStateMutation {
                field: "arena slot",
                descriptor: format!("{id:?}"),
            }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                trace!(
                    instance_id = self.instance_id,
                    descriptor_id = id.0,
                    kind = descriptor.kind_name(),
                    name = %descriptor.name(),
                    "DescriptorArena::fill"
                );
                slot.insert(descriptor);
                Ok(())
            }
        }
    }

    pub fn alloc_class(&self, build: impl FnOnce(DescriptorId) -> ClassDescriptor) -> DescriptorId {
        self.alloc_with(|id| Descriptor::Class(Arc::new(build(id))))
    }

    pub fn alloc_callable(&self, callable: CallableMemberDescriptor) -> DescriptorId {
        self.alloc_with(|_| Descriptor::Callable(Arc::new(callable)))
    }

    pub fn alloc_type_parameter(&self, parameter: TypeParameterDescriptor) -> DescriptorId {
        self.alloc_with(|_| Descriptor::TypeParameter(Arc::new(parameter)))
    }

    pub fn get(&self, id: DescriptorId) -> Option<Descriptor> {
        self.descriptors.get(&id).map(|entry| entry.clone())
    }

    pub fn contains(&self, id: DescriptorId) -> bool {
        self.descriptors.contains_key(&id)
    }

    pub fn descriptor(&self, id: DescriptorId) -> Result<Descriptor, DescriptorError> {
        self.get(id).ok_or(DescriptorError::UnknownDescriptor(id))
    }

    pub fn class(&self, id: DescriptorId) -> Result<Arc<ClassDescriptor>, DescriptorError> {
        self.descriptor(id)?
            .as_class()
            .cloned()
            .ok_or(DescriptorError::UnexpectedDescriptorKind { id, expected: "class" })
    }

    pub fn callable(&self, id: DescriptorId) -> Result<Arc<CallableMemberDescriptor>, DescriptorError> {
        self.descriptor(id)?
            .as_callable()
            .cloned()
            .ok_or(DescriptorError::UnexpectedDescriptorKind {
                id,
                expected: "callable member",
            })
    }

    pub fn type_parameter(&self, id: DescriptorId) -> Result<Arc<TypeParameterDescriptor>, DescriptorError> {
        self.descriptor(id)?
            .as_type_parameter()
            .cloned()
            .ok_or(DescriptorError::UnexpectedDescriptorKind {
                id,
                expected: "type parameter",
            })
    }

    /// Whether `inner` is `outer` or nested (transitively) inside it.
    pub fn is_inside(&self, inner: DescriptorId, outer: DescriptorId) -> bool {
        let mut current = Some(inner);
        while let Some(id) = current {
            if id == outer {
                return true;
            }
            current = self.get(id).and_then(|d| d.container());
        }
        false
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for DescriptorArena {
    fn default() -> Self {
        Self::new()
    }
}
