use kore_common::{ClassId, NameError};
use kore_descriptors::DescriptorError;
use kore_storage::StorageError;
use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Clone, Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Storage(StorageError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("unknown class {0}")]
    UnknownClass(ClassId),
    #[error("invalid declaration of {subject}: {reason}")]
    InvalidDeclaration { subject: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("resolve session was dropped")]
    SessionClosed,
}

impl ResolveError {
    pub fn invalid_declaration(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Wrap for returning from a lazy computation. Unwrapped again by the
    /// `From<StorageError>` conversion.
    pub(crate) fn into_storage(self) -> StorageError {
        match self {
            Self::Storage(error) => error,
            other => StorageError::failed(other),
        }
    }

    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::Storage(error) if error.is_recursion())
    }
}

impl From<StorageError> for ResolveError {
    fn from(error: StorageError) -> Self {
        match error.downcast_ref::<ResolveError>() {
            Some(inner) => inner.clone(),
            None => Self::Storage(error),
        }
    }
}
