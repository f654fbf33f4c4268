//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A key found under an index prefix does not decode as that index.
    #[error("malformed entry in index {index}: {reason}")]
    MalformedEntry { index: &'static str, reason: String },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] wbl_store::StoreError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
