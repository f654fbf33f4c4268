use wbl_index::IndexError;
use wbl_store::StoreError;
use wbl_types::TypeError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// An argument is missing, empty, or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value could not be parsed into its field type.
    #[error("invalid value: {0}")]
    InvalidValue(#[from] TypeError),

    #[error("{kind} does not exist: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// The record exists but refuses the requested mutation.
    #[error("policy violation on {kind} {id}: {reason}")]
    PolicyViolation {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Stored bytes do not parse as the expected record.
    #[error("failed to decode {kind} at key {key:?}: {reason}")]
    Decode {
        kind: &'static str,
        key: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }
}

/// Convenience alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;
