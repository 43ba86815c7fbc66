//! Store error types.

/// Errors produced by store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert attempted for a key that is already present.
    #[error("key {0} already exists, not overriding")]
    AlreadyExists(String),

    /// The key is not present in the store.
    #[error("key {0} does not exist")]
    NotFound(String),

    /// The backend holds no entries at all.
    #[error("store is empty")]
    Empty,

    /// The destination path cannot be used.
    #[error("store destination invalid: {0}")]
    InvalidPath(String),

    /// The on-disk data cannot be encoded or decoded.
    #[error("store data corrupt: {0}")]
    Corrupt(String),

    /// A dump of a non-empty map produced a zero-byte file.
    #[error("wrote 0 bytes while persisting a non-empty snapshot")]
    WriteIncomplete,

    /// The remote cache cannot be reached or its URL is invalid.
    #[error("remote cache unreachable: {0}")]
    Unreachable(String),

    /// Remote cache transport failure.
    #[error("remote cache error: {0}")]
    Remote(#[from] redis::RedisError),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
