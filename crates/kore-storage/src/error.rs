use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Fatal outcomes of a lazy computation.
///
/// Both variants are cheap to clone: a memoized failure is handed to every
/// caller of the failed cell.
#[derive(Clone, Debug, Error)]
pub enum StorageError {
    /// A cell was re-entered while computing and has no recursion fallback.
    #[error("Recursion detected {location}{} under {manager}", render_input(.input))]
    RecursionDetected {
        location: &'static str,
        input: Option<String>,
        manager: String,
    },
    /// The computation itself reported an error.
    #[error("computation failed: {source}")]
    ComputationFailed { source: Arc<dyn Error + Send + Sync> },
}

impl StorageError {
    pub fn failed(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::ComputationFailed {
            source: Arc::from(error.into()),
        }
    }

    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::RecursionDetected { .. })
    }

    /// The underlying error of a failed computation, if it has type `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::ComputationFailed { source } => source.downcast_ref::<E>(),
            Self::RecursionDetected { .. } => None,
        }
    }
}

fn render_input(input: &Option<String>) -> String {
    match input {
        Some(input) => format!(" on input: {input}"),
        None => String::new(),
    }
}
