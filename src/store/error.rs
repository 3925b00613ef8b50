use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`ProjectStore`](super::ProjectStore) backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity or lock contention; the operation may succeed if retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A unique or referential constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}
