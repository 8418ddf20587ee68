//! Fields that are assigned at most once after a descriptor is created.

use crate::error::DescriptorError;
use std::fmt;
use std::sync::OnceLock;

/// A cell that can be set at most once. A second `set` is a contract
/// violation reported as [`DescriptorError::IllegalStateMutation`].
#[derive(Clone)]
pub struct WriteOnce<T> {
    field: &'static str,
    value: OnceLock<T>,
}

impl<T> WriteOnce<T> {
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            value: OnceLock::new(),
        }
    }

    /// Assign the value. `owner` names the descriptor in the error message.
    pub fn set(&self, value: T, owner: impl FnOnce() -> String) -> Result<(), DescriptorError> {
        self.value.set(value).map_err(|_| DescriptorError::IllegalStateMutation {
            field: self.field,
            descriptor: owner(),
        })
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_set(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for WriteOnce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => write!(f, "{value:?}"),
            None => write!(f, "<unset {}>", self.field),
        }
    }
}

#[cfg(test)]
#[path = "../tests/write_once_tests.rs"]
mod tests;
