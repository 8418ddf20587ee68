//! Fully qualified names (`kotlin.collections.List`).

use crate::name::{Name, NameError};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A dotted path of [`Name`] segments. The root name has no segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FqName {
    segments: Arc<[Name]>,
}

impl FqName {
    pub fn root() -> Self {
        Self {
            segments: Arc::from(Vec::new()),
        }
    }

    /// Parse a dotted path. The empty string is the root name.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let segments = text
            .split('.')
            .map(Name::guess_by_first_character)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_segments(segments))
    }

    pub fn from_segments(segments: impl Into<Arc<[Name]>>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    pub fn topmost(name: Name) -> Self {
        Self::from_segments(vec![name])
    }

    pub fn child(&self, name: Name) -> Self {
        let mut segments = self.segments.to_vec();
        segments.push(name);
        Self::from_segments(segments)
    }

    /// The enclosing path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        match self.segments.split_last() {
            Some((_, rest)) => Some(Self::from_segments(rest.to_vec())),
            None => None,
        }
    }

    /// Last segment, or `None` for the root.
    pub fn short_name(&self) -> Option<&Name> {
        self.segments.last()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn path_segments(&self) -> &[Name] {
        &self.segments
    }

    /// Segment-wise prefix test: `a.bc` does not start with `a.b`.
    pub fn starts_with(&self, prefix: &FqName) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Strip `prefix`, returning the remaining relative path.
    pub fn tail(&self, prefix: &FqName) -> Option<Self> {
        self.segments
            .strip_prefix(&prefix.segments[..])
            .map(|rest| Self::from_segments(rest.to_vec()))
    }
}

impl fmt::Display for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("FqName(<root>)")
        } else {
            write!(f, "FqName({self})")
        }
    }
}

impl Serialize for FqName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
