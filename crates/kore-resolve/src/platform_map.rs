//! Pairs of platform classes and the Kotlin classes they are seen as.

use kore_common::{ClassId, FqName, NameError};
use kore_descriptors::{TypeConstructor, TypeConstructorEquality};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::trace;

/// `(platform, kotlin)` pairs every session starts with.
const BUILTIN_PAIRS: &[(&str, &str)] = &[
    ("java.lang.Object", "kotlin.Any"),
    ("java.lang.String", "kotlin.String"),
    ("java.lang.CharSequence", "kotlin.CharSequence"),
    ("java.lang.Throwable", "kotlin.Throwable"),
    ("java.lang.Comparable", "kotlin.Comparable"),
    ("java.lang.Enum", "kotlin.Enum"),
    ("java.lang.annotation.Annotation", "kotlin.Annotation"),
    ("java.lang.Number", "kotlin.Number"),
    ("java.lang.Integer", "kotlin.Int"),
    ("java.lang.Long", "kotlin.Long"),
    ("java.lang.Short", "kotlin.Short"),
    ("java.lang.Byte", "kotlin.Byte"),
    ("java.lang.Character", "kotlin.Char"),
    ("java.lang.Boolean", "kotlin.Boolean"),
    ("java.lang.Float", "kotlin.Float"),
    ("java.lang.Double", "kotlin.Double"),
    ("java.lang.Iterable", "kotlin.collections.Iterable"),
    ("java.util.Iterator", "kotlin.collections.Iterator"),
    ("java.util.Collection", "kotlin.collections.Collection"),
    ("java.util.List", "kotlin.collections.List"),
    ("java.util.Set", "kotlin.collections.Set"),
    ("java.util.Map", "kotlin.collections.Map"),
];

/// One configured pair, as written in the session config.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PlatformClassPair {
    pub platform: String,
    pub kotlin: String,
}

/// A registry of platform ↔ Kotlin class pairs, owned by one session.
#[derive(Clone, Debug, Default)]
pub struct PlatformClassMap {
    platform_to_kotlin: FxHashMap<ClassId, ClassId>,
    kotlin_to_platform: FxHashMap<ClassId, ClassId>,
}

impl PlatformClassMap {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the built-in pairs.
    pub fn with_builtins() -> Self {
        let mut map = Self::new();
        for (platform, kotlin) in BUILTIN_PAIRS {
            if let Err(error) = map.add(platform, kotlin) {
                trace!(target: "kore::resolve", %error, platform, kotlin, "skipping built-in platform class");
            }
        }
        map
    }

    /// Register a pair of top-level classes given by dotted fq names.
    pub fn add(&mut self, platform: &str, kotlin: &str) -> Result<(), NameError> {
        let platform = ClassId::top_level(&FqName::parse(platform)?)?;
        let kotlin = ClassId::top_level(&FqName::parse(kotlin)?)?;
        self.add_class_ids(platform, kotlin);
        Ok(())
    }

    pub fn add_class_ids(&mut self, platform: ClassId, kotlin: ClassId) {
        self.platform_to_kotlin.insert(platform.clone(), kotlin.clone());
        self.kotlin_to_platform.insert(kotlin, platform);
    }

    pub fn extend(&mut self, pairs: &[PlatformClassPair]) -> Result<(), NameError> {
        for pair in pairs {
            self.add(&pair.platform, &pair.kotlin)?;
        }
        Ok(())
    }

    pub fn map_platform_class(&self, platform: &ClassId) -> Option<&ClassId> {
        self.platform_to_kotlin.get(platform)
    }

    pub fn map_kotlin_to_platform(&self, kotlin: &ClassId) -> Option<&ClassId> {
        self.kotlin_to_platform.get(kotlin)
    }

    /// The Kotlin class `class_id` stands for, or `class_id` itself.
    pub fn canonical<'a>(&'a self, class_id: &'a ClassId) -> &'a ClassId {
        self.map_platform_class(class_id).unwrap_or(class_id)
    }

    /// Every `(platform, kotlin)` pair, in no particular order.
    pub fn pairs(&self) -> impl Iterator<Item = (&ClassId, &ClassId)> {
        self.platform_to_kotlin.iter()
    }

    pub fn len(&self) -> usize {
        self.platform_to_kotlin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platform_to_kotlin.is_empty()
    }
}

impl TypeConstructorEquality for PlatformClassMap {
    fn equals(&self, a: &TypeConstructor, b: &TypeConstructor) -> bool {
        match (a, b) {
            (TypeConstructor::Class(a), TypeConstructor::Class(b)) => self.canonical(a) == self.canonical(b),
            _ => a == b,
        }
    }
}

#[cfg(test)]
#[path = "../tests/platform_map_tests.rs"]
mod tests;
