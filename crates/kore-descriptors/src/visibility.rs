//! Visibilities and modalities of declarations.
//!
//! Visibilities form a partial order:
//!
//! ```text
//!              Public
//!             /      \
//!      Protected    Internal      (incomparable)
//!             \      /
//!              Private
//!                 |
//!           PrivateToThis
//! ```
//!
//! `Local`, `Inherited`, `InvisibleFake` and `Unknown` are only comparable
//! with themselves.

use crate::arena::{DescriptorArena, DescriptorId};
use crate::descriptor::CallableMemberDescriptor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Private,
    PrivateToThis,
    Protected,
    Internal,
    Public,
    Local,
    /// Placeholder for "take it from the overridden members"; replaced once
    /// the members it overrides are known.
    Inherited,
    /// A fake override of members that are all invisible from the class.
    InvisibleFake,
    Unknown,
}

impl Visibility {
    fn rank(self) -> Option<u8> {
        match self {
            Self::PrivateToThis => Some(0),
            Self::Private => Some(1),
            Self::Protected | Self::Internal => Some(2),
            Self::Public => Some(3),
            Self::Local | Self::Inherited | Self::InvisibleFake | Self::Unknown => None,
        }
    }

    /// `Some(ordering)` if the two visibilities are comparable.
    pub fn compare(self, other: Self) -> Option<Ordering> {
        self.partial_cmp(&other)
    }

    pub fn is_private(self) -> bool {
        matches!(self, Self::Private | Self::PrivateToThis)
    }

    pub fn is_public_api(self) -> bool {
        matches!(self, Self::Public | Self::Protected)
    }

    /// The visibility used when comparing declared members.
    pub fn normalize(self) -> Self {
        match self {
            Self::PrivateToThis => Self::Private,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PrivateToThis => "private/*private to this*/",
            Self::Protected => "protected",
            Self::Internal => "internal",
            Self::Public => "public",
            Self::Local => "local",
            Self::Inherited => "inherited",
            Self::InvisibleFake => "invisible_fake",
            Self::Unknown => "unknown",
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Public
    }
}

impl PartialOrd for Visibility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        let (a, b) = (self.rank()?, other.rank()?);
        if a == b {
            // Protected vs Internal.
            return None;
        }
        Some(a.cmp(&b))
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `member` can be seen from code inside the class `from`.
///
/// Private members are visible only inside their own container (nested
/// classes included). Protected and internal members are assumed visible,
/// since `from` is always a subclass in the same module here.
pub fn is_visible(arena: &DescriptorArena, member: &CallableMemberDescriptor, from: DescriptorId) -> bool {
    match member.visibility() {
        Visibility::Private | Visibility::PrivateToThis => arena.is_inside(from, member.container),
        Visibility::InvisibleFake | Visibility::Local | Visibility::Unknown => false,
        Visibility::Public | Visibility::Protected | Visibility::Internal | Visibility::Inherited => true,
    }
}

/// The greatest of `visibilities`, or `None` if some pair is incomparable.
/// An empty input yields the default `Public`.
pub fn find_max_visibility(visibilities: &[Visibility]) -> Option<Visibility> {
    let Some(&first) = visibilities.first() else {
        return Some(Visibility::Public);
    };
    let mut max = Some(first);
    for &visibility in &visibilities[1..] {
        max = match max {
            None => Some(visibility),
            Some(current) => match visibility.compare(current) {
                None => None,
                Some(Ordering::Greater) => Some(visibility),
                Some(_) => Some(current),
            },
        };
    }
    let max = max?;
    visibilities
        .iter()
        .all(|&v| matches!(max.compare(v), Some(Ordering::Greater | Ordering::Equal)))
        .then_some(max)
}

/// Overridability of a declaration, ordered from least to most open:
/// `Final < Sealed < Open < Abstract`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modality {
    Final,
    Sealed,
    Open,
    Abstract,
}

impl Modality {
    pub fn is_overridable(self) -> bool {
        self != Self::Final
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::Sealed => "sealed",
            Self::Open => "open",
            Self::Abstract => "abstract",
        }
    }
}

impl Default for Modality {
    fn default() -> Self {
        Self::Final
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../tests/visibility_tests.rs"]
mod tests;
