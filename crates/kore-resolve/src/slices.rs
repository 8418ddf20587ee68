//! Slices recorded by a resolve session.

use crate::trace::Slice;
use kore_common::{ClassId, Name};
use kore_descriptors::DescriptorId;
use std::sync::Arc;

/// A member declaration: its class and position in the class's member list.
pub type MemberDeclarationKey = (ClassId, u32);

pub const CLASS_DESCRIPTOR: Slice<ClassId, DescriptorId> = Slice::new("CLASS_DESCRIPTOR");

pub const MEMBER_DESCRIPTOR: Slice<MemberDeclarationKey, DescriptorId> = Slice::new("MEMBER_DESCRIPTOR");

/// Final member set for one name: declared members, then fake overrides.
pub const RESOLVED_MEMBERS: Slice<(ClassId, Name), Arc<[DescriptorId]>> = Slice::new("RESOLVED_MEMBERS");

/// Set for classes that are (transitively) their own supertype.
pub const SUPERTYPE_CYCLE: Slice<ClassId, bool> = Slice::new("SUPERTYPE_CYCLE");
