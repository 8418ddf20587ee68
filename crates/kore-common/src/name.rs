//! Declaration names.
//!
//! A [`Name`] is either an identifier (`foo`, `Bar`) or a special name wrapped
//! in angle brackets (`<no name provided>`, `<init>`). Special names are never
//! valid identifiers, so the two spaces never collide even when their text
//! overlaps.

use crate::interner::NameTable;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

static NAMES: Lazy<NameTable> = Lazy::new(NameTable::new);

/// Errors raised when building names and ids from text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("special name must start with '<': '{0}'")]
    InvalidSpecialName(String),
    #[error("class id must have a non-empty relative class name: '{0}'")]
    EmptyRelativeClassName(String),
}

/// An interned declaration name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
    text: Arc<str>,
    special: bool,
}

impl Name {
    /// Create an identifier name. Rejects empty text and text that contains
    /// path separators or starts with `<`.
    pub fn identifier(text: &str) -> Result<Self, NameError> {
        if text.is_empty() {
            return Err(NameError::EmptyIdentifier);
        }
        if text.starts_with('<') || text.contains(['.', '/', '\\']) {
            return Err(NameError::InvalidIdentifier(text.to_string()));
        }
        Ok(Self::interned(text, false))
    }

    /// Create a special name such as `<no name provided>`.
    pub fn special(text: &str) -> Result<Self, NameError> {
        if !text.starts_with('<') {
            return Err(NameError::InvalidSpecialName(text.to_string()));
        }
        Ok(Self::interned(text, true))
    }

    /// Choose between [`Name::identifier`] and [`Name::special`] by the first
    /// character.
    pub fn guess_by_first_character(text: &str) -> Result<Self, NameError> {
        if text.starts_with('<') {
            Self::special(text)
        } else {
            Self::identifier(text)
        }
    }

    /// Name used for declarations that have none in source.
    pub fn no_name_provided() -> Self {
        Self::interned("<no name provided>", true)
    }

    fn interned(text: &str, special: bool) -> Self {
        Self {
            text: NAMES.intern(text),
            special,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// The identifier text, or `None` for special names.
    pub fn identifier_text(&self) -> Option<&str> {
        (!self.special).then(|| self.as_str())
    }

    /// Whether two names share the same interned allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text
            .cmp(&other.text)
            .then(self.special.cmp(&other.special))
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.text)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(test)]
#[path = "../tests/name_tests.rs"]
mod tests;
