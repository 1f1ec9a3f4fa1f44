//! Storage error types.

/// Errors produced by [`Storage`](crate::Storage) operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// File-system failure (reading, writing, or listing value files).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be serialized or deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal lock was poisoned by a panicked thread.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A name was addressed that the backend's registry does not know.
    #[error("no slot named '{0}' is registered")]
    UnknownSlot(String),

    /// A slot's IO strategy failed.
    #[error("slot i/o failed: {0}")]
    Slot(#[source] anyhow::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StorageError>;
