//! Failures shared by every repository backend.

use std::error::Error as StdError;

use thiserror::Error;

/// Result alias for repository calls.
pub type StorageResult<T> = Result<T, StorageError>;

/// Repository failure as seen by the services.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the call; the operation had no effect.
    #[error("{backend} unavailable: {reason}")]
    Unavailable {
        /// Name of the backend, used as a log field.
        backend: &'static str,
        /// Short description of what failed.
        reason: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure.
    pub fn unavailable(
        backend: &'static str,
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            backend,
            reason: reason.into(),
            source: Box::new(source),
        }
    }

    /// Backend that produced the error.
    pub fn backend(&self) -> &'static str {
        match self {
            StorageError::Unavailable { backend, .. } => *backend,
        }
    }
}
