//! Class identifiers: a package plus a possibly nested relative class name.
//!
//! `ClassId` renders as `kotlin/collections/Map.Entry`: slashes separate the
//! package, dots separate nesting levels.

use crate::fq_name::FqName;
use crate::name::{Name, NameError};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId {
    package_fq_name: FqName,
    relative_class_name: FqName,
    local: bool,
}

impl ClassId {
    /// Build a class id. Non-local ids must name at least one class segment.
    pub fn new(package_fq_name: FqName, relative_class_name: FqName, local: bool) -> Result<Self, NameError> {
        if relative_class_name.is_root() && !local {
            return Err(NameError::EmptyRelativeClassName(package_fq_name.to_string()));
        }
        Ok(Self {
            package_fq_name,
            relative_class_name,
            local,
        })
    }

    /// Id of a top-level class named by `fq_name`. Fails for the root name.
    pub fn top_level(fq_name: &FqName) -> Result<Self, NameError> {
        let (Some(short), Some(package)) = (fq_name.short_name(), fq_name.parent()) else {
            return Err(NameError::EmptyRelativeClassName(String::new()));
        };
        Self::new(package, FqName::topmost(short.clone()), false)
    }

    pub fn package_fq_name(&self) -> &FqName {
        &self.package_fq_name
    }

    pub fn relative_class_name(&self) -> &FqName {
        &self.relative_class_name
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn short_class_name(&self) -> Option<&Name> {
        self.relative_class_name.short_name()
    }

    pub fn is_nested_class(&self) -> bool {
        self.relative_class_name.path_segments().len() > 1
    }

    /// The id of the immediately enclosing class, if any.
    pub fn outer_class_id(&self) -> Option<Self> {
        if !self.is_nested_class() {
            return None;
        }
        let parent = self.relative_class_name.parent()?;
        Some(Self {
            package_fq_name: self.package_fq_name.clone(),
            relative_class_name: parent,
            local: self.local,
        })
    }

    pub fn create_nested_class_id(&self, name: Name) -> Self {
        Self {
            package_fq_name: self.package_fq_name.clone(),
            relative_class_name: self.relative_class_name.child(name),
            local: self.local,
        }
    }

    /// Package and relative name joined into one dotted path.
    pub fn as_single_fq_name(&self) -> FqName {
        let mut segments = self.package_fq_name.path_segments().to_vec();
        segments.extend_from_slice(self.relative_class_name.path_segments());
        FqName::from_segments(segments)
    }

    /// Render as `a/b/Outer.Inner`.
    pub fn as_string(&self) -> String {
        if self.package_fq_name.is_root() {
            return self.relative_class_name.to_string();
        }
        format!(
            "{}/{}",
            self.package_fq_name.to_string().replace('.', "/"),
            self.relative_class_name
        )
    }

    /// Parse the `a/b/Outer.Inner` form produced by [`ClassId::as_string`].
    pub fn from_string(text: &str) -> Result<Self, NameError> {
        let (package, relative) = match text.rsplit_once('/') {
            Some((package, relative)) => (package.replace('/', "."), relative),
            None => (String::new(), text),
        };
        Self::new(FqName::parse(&package)?, FqName::parse(relative)?, false)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.local {
            write!(f, "ClassId(local {})", self.as_string())
        } else {
            write!(f, "ClassId({})", self.as_string())
        }
    }
}

impl Serialize for ClassId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

#[cfg(test)]
#[path = "../tests/class_id_tests.rs"]
mod tests;
