//! Descriptors for the kore resolver.
//!
//! This crate contains:
//! - [`DescriptorArena`]: session-scoped storage addressed by [`DescriptorId`]
//! - [`Descriptor`] and its class, callable and type-parameter variants
//! - [`Visibility`] and [`Modality`] with their partial orders
//! - [`KType`] and the [`TypeChecker`] used to compare member signatures
//! - [`RecursionGuard`] for walks over user-supplied hierarchies

pub mod arena;
pub mod descriptor;
pub mod error;
pub mod recursion;
pub mod render;
pub mod type_checker;
pub mod types;
pub mod visibility;
pub mod write_once;

pub use arena::{DescriptorArena, DescriptorId};
pub use descriptor::{
    CallableKind, CallableMemberDescriptor, ClassDescriptor, ClassKind, Descriptor, MemberKind,
    TypeParameterDescriptor, ValueParameter,
};
pub use error::DescriptorError;
pub use recursion::{RecursionGuard, RecursionProfile, RecursionResult};
pub use render::DescriptorRenderer;
pub use type_checker::{
    DefaultTypeEquality, MatchingTypeParameters, TypeChecker, TypeConstructorEquality, TypeContext,
};
pub use types::{KType, TypeConstructor};
pub use visibility::{Modality, Visibility, find_max_visibility, is_visible};
pub use write_once::WriteOnce;
