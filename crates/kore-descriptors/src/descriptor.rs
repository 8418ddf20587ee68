//! Descriptor variants.
//!
//! # Design
//!
//! Descriptors are a closed sum type ([`Descriptor`]) stored in a
//! [`DescriptorArena`](crate::DescriptorArena). They refer to each other
//! (container, type parameters, overridden members) only through
//! [`DescriptorId`] handles, so a class, its members and their back-references
//! never form ownership cycles.
//!
//! A descriptor is immutable once allocated, except for its [`WriteOnce`]
//! fields: the overridden-member list of a callable and the visibility of a
//! member declared with [`Visibility::Inherited`].

use crate::arena::DescriptorId;
use crate::error::DescriptorError;
use crate::types::KType;
use crate::visibility::{Modality, Visibility};
use crate::write_once::WriteOnce;
use kore_common::{ClassId, Name};
use serde::{Deserialize, Serialize};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum Descriptor {
    Class(Arc<ClassDescriptor>),
    Callable(Arc<CallableMemberDescriptor>),
    TypeParameter(Arc<TypeParameterDescriptor>),
}

impl Descriptor {
    pub fn name(&self) -> &Name {
        match self {
            Self::Class(class) => &class.name,
            Self::Callable(callable) => &callable.name,
            Self::TypeParameter(parameter) => &parameter.name,
        }
    }

    /// The enclosing declaration; `None` for top-level classes.
    pub fn container(&self) -> Option<DescriptorId> {
        match self {
            Self::Class(class) => class.container,
            Self::Callable(callable) => Some(callable.container),
            Self::TypeParameter(parameter) => Some(parameter.container),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Callable(callable) => callable.member.keyword(),
            Self::TypeParameter(_) => "type parameter",
        }
    }

    pub fn as_class(&self) -> Option<&Arc<ClassDescriptor>> {
        match self {
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Arc<CallableMemberDescriptor>> {
        match self {
            Self::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn as_type_parameter(&self) -> Option<&Arc<TypeParameterDescriptor>> {
        match self {
            Self::TypeParameter(parameter) => Some(parameter),
            _ => None,
        }
    }
}

// =============================================================================
// Classes
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    Enum,
    AnnotationClass,
}

#[derive(Debug)]
pub struct ClassDescriptor {
    pub class_id: ClassId,
    pub name: Name,
    /// Outer class for nested classes.
    pub container: Option<DescriptorId>,
    pub kind: ClassKind,
    pub modality: Modality,
    pub visibility: Visibility,
    pub type_parameters: Vec<DescriptorId>,
}

#[derive(Debug)]
pub struct TypeParameterDescriptor {
    pub name: Name,
    pub container: DescriptorId,
    pub index: u32,
    pub upper_bounds: Vec<KType>,
}

// =============================================================================
// Callable members
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallableKind {
    Declaration,
    /// Synthesized to represent members inherited through one or more paths.
    FakeOverride,
    Delegation,
    Synthesized,
}

impl CallableKind {
    /// Whether the member exists in source (or was generated from source).
    pub fn is_real(self) -> bool {
        self != Self::FakeOverride
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Function,
    Property { is_var: bool },
}

impl MemberKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Function => "fun",
            Self::Property { is_var: true } => "var",
            Self::Property { is_var: false } => "val",
        }
    }

    pub fn is_function(self) -> bool {
        self == Self::Function
    }

    pub fn is_property(self) -> bool {
        matches!(self, Self::Property { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueParameter {
    pub name: Name,
    pub ty: KType,
}

/// A function or property declared in, or inherited into, a class.
#[derive(Debug)]
pub struct CallableMemberDescriptor {
    pub name: Name,
    pub container: DescriptorId,
    pub member: MemberKind,
    pub kind: CallableKind,
    pub modality: Modality,
    pub is_static: bool,
    pub extension_receiver: Option<KType>,
    pub type_parameters: Vec<DescriptorId>,
    pub value_parameters: Vec<ValueParameter>,
    pub return_type: KType,
    /// The unsubstituted member this one was derived from.
    original: Option<DescriptorId>,
    declared_visibility: Visibility,
    resolved_visibility: WriteOnce<Visibility>,
    overridden: WriteOnce<Vec<DescriptorId>>,
}

impl CallableMemberDescriptor {
    /// A source declaration with default modality and visibility.
    pub fn declaration(name: Name, container: DescriptorId, member: MemberKind, return_type: KType) -> Self {
        Self {
            name,
            container,
            member,
            kind: CallableKind::Declaration,
            modality: Modality::Final,
            is_static: false,
            extension_receiver: None,
            type_parameters: Vec::new(),
            value_parameters: Vec::new(),
            return_type,
            original: None,
            declared_visibility: Visibility::Public,
            resolved_visibility: WriteOnce::new("visibility"),
            overridden: WriteOnce::new("overridden descriptors"),
        }
    }

    pub fn with_kind(mut self, kind: CallableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.declared_visibility = visibility;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_extension_receiver(mut self, receiver: Option<KType>) -> Self {
        self.extension_receiver = receiver;
        self
    }

    pub fn with_type_parameters(mut self, type_parameters: Vec<DescriptorId>) -> Self {
        self.type_parameters = type_parameters;
        self
    }

    pub fn with_value_parameters(mut self, value_parameters: Vec<ValueParameter>) -> Self {
        self.value_parameters = value_parameters;
        self
    }

    /// Copy the signature into `container` with fresh write-once fields.
    pub fn copy(&self, container: DescriptorId, modality: Modality, visibility: Visibility, kind: CallableKind) -> Self {
        Self {
            name: self.name.clone(),
            container,
            member: self.member,
            kind,
            modality,
            is_static: self.is_static,
            extension_receiver: self.extension_receiver.clone(),
            type_parameters: self.type_parameters.clone(),
            value_parameters: self.value_parameters.clone(),
            return_type: self.return_type.clone(),
            original: None,
            declared_visibility: visibility,
            resolved_visibility: WriteOnce::new("visibility"),
            overridden: WriteOnce::new("overridden descriptors"),
        }
    }

    /// The same member seen through a supertype's type arguments. `id` is
    /// this member's own handle; the copy keeps every resolved field and
    /// points back at the first unsubstituted member.
    pub fn substitute(&self, id: DescriptorId, substitution: &FxHashMap<DescriptorId, KType>) -> Self {
        let value_parameters = self
            .value_parameters
            .iter()
            .map(|parameter| ValueParameter {
                name: parameter.name.clone(),
                ty: parameter.ty.substitute(substitution),
            })
            .collect();
        Self {
            name: self.name.clone(),
            container: self.container,
            member: self.member,
            kind: self.kind,
            modality: self.modality,
            is_static: self.is_static,
            extension_receiver: self.extension_receiver.as_ref().map(|ty| ty.substitute(substitution)),
            type_parameters: self.type_parameters.clone(),
            value_parameters,
            return_type: self.return_type.substitute(substitution),
            original: Some(self.original.unwrap_or(id)),
            declared_visibility: self.declared_visibility,
            resolved_visibility: self.resolved_visibility.clone(),
            overridden: self.overridden.clone(),
        }
    }

    /// The unsubstituted member, or `None` if this is one.
    pub fn original(&self) -> Option<DescriptorId> {
        self.original
    }

    /// Effective visibility: the resolved one if set, the declared otherwise.
    pub fn visibility(&self) -> Visibility {
        self.resolved_visibility
            .get()
            .copied()
            .unwrap_or(self.declared_visibility)
    }

    pub fn declared_visibility(&self) -> Visibility {
        self.declared_visibility
    }

    pub fn set_visibility(&self, visibility: Visibility) -> Result<(), DescriptorError> {
        self.resolved_visibility.set(visibility, || self.name.to_string())
    }

    /// Members this one overrides; empty until set.
    pub fn overridden_descriptors(&self) -> &[DescriptorId] {
        self.overridden.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_overridden_descriptors_set(&self) -> bool {
        self.overridden.is_set()
    }

    pub fn set_overridden_descriptors(&self, overridden: Vec<DescriptorId>) -> Result<(), DescriptorError> {
        self.overridden.set(overridden, || self.name.to_string())
    }

    /// Extension receiver (if any) followed by the value parameter types.
    pub fn compiled_value_parameters(&self) -> SmallVec<[&KType; 4]> {
        self.extension_receiver
            .iter()
            .chain(self.value_parameters.iter().map(|p| &p.ty))
            .collect()
    }

    pub fn is_var(&self) -> bool {
        self.member == MemberKind::Property { is_var: true }
    }
}

#[cfg(test)]
#[path = "../tests/descriptor_tests.rs"]
mod tests;
