use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// A key and its current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One version of a key, as recorded in its history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyModification {
    pub tx_id: String,
    /// `None` for deletions.
    pub value: Option<Vec<u8>>,
    pub timestamp: DateTime<Utc>,
    pub is_delete: bool,
}

/// Pagination state returned alongside a page of results.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryMetadata {
    /// Number of records in this page.
    pub fetched_records_count: usize,
    /// Opaque resume token; empty once the result set is exhausted.
    pub bookmark: String,
}

impl QueryMetadata {
    pub fn is_exhausted(&self) -> bool {
        self.bookmark.is_empty()
    }
}

/// A single write or delete, as applied to state and logged to the WAL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMutation {
    pub tx_id: String,
    pub key: String,
    /// `None` deletes the key.
    pub value: Option<Vec<u8>>,
    /// Milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
}

/// Owned iterator over key/value results.
pub type StateIter = Box<dyn Iterator<Item = StoreResult<KeyValue>> + Send>;

/// Owned iterator over a key's history, oldest first.
pub type HistoryIter = Box<dyn Iterator<Item = StoreResult<KeyModification>> + Send>;
