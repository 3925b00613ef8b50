use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the ingestion pipeline.
///
/// `InvalidDocument`, `StoreUnavailable`, `ConstraintViolation` and `Store` are
/// per-document and are contained by the batch wrapper. `Configuration` is
/// systemic and aborts a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl IngestError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        IngestError::InvalidDocument(reason.into())
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        IngestError::Configuration(reason.into())
    }

    /// Transient store failures, and write conflicts that re-classification
    /// did not explain, are worth another full attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::StoreUnavailable(_) | IngestError::ConstraintViolation(_)
        )
    }

    /// Errors that invalidate a whole batch rather than one document.
    pub fn is_systemic(&self) -> bool {
        matches!(self, IngestError::Configuration(_))
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => IngestError::StoreUnavailable(msg),
            StoreError::Conflict(msg) => IngestError::ConstraintViolation(msg),
            StoreError::NotFound(msg) => IngestError::Store(format!("not found: {msg}")),
            StoreError::Backend(msg) => IngestError::Store(msg),
        }
    }
}
