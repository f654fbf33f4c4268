/// Errors from state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Keys must be non-empty strings.
    #[error("key must not be empty")]
    EmptyKey,

    /// An empty value would be indistinguishable from a delete.
    #[error("value for key {0:?} must not be empty")]
    EmptyValue(String),

    /// Range start sorts after range end.
    #[error("invalid range: start {start:?} is after end {end:?}")]
    InvalidRange { start: String, end: String },

    /// Composite key could not be built or split.
    #[error("invalid composite key: {0}")]
    InvalidCompositeKey(String),

    /// Selector document is malformed or uses an unsupported construct.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Bookmark was not produced by this store.
    #[error("invalid bookmark: {0:?}")]
    InvalidBookmark(String),

    /// Paginated queries need at least one record per page.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
