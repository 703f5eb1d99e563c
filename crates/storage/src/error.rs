//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create {store_type} object store: {source}")]
    Creation {
        store_type: &'static str,
        source: object_store::Error,
    },

    #[error("invalid object store configuration: {0}")]
    Configuration(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Map an object store error, keeping not-found distinct.
    pub fn from_store(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => Self::NotFound(path),
            other => Self::ObjectStore(other),
        }
    }
}

/// Structured record store failures.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    /// The store could not be reached or timed out; a later attempt may succeed.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request.
    #[error("record store rejected request: {0}")]
    Rejected(String),
}

impl RecordStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
