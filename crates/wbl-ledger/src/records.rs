//! Typed access to JSON documents in a [`StateStore`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use wbl_store::{KeyValue, StateStore};
use wbl_types::{DocType, Record};

use crate::error::{LedgerError, LedgerResult};

/// Reads and writes [`Record`]s as whole JSON documents keyed by their id.
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn StateStore>,
}

impl RecordStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.store.get_state(key)?)
    }

    pub fn exists(&self, key: &str) -> LedgerResult<bool> {
        Ok(self.store.has_state(key)?)
    }

    /// Raw bytes stored under `key`, if they are tagged as an `R`.
    pub fn raw_record<R: Record>(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.raw(key)?.filter(|bytes| tagged_as::<R>(bytes)))
    }

    /// Decode the record under `key`, if any.
    ///
    /// A document of another kind under `key` reads as absent.
    pub fn load<R: Record>(&self, key: &str) -> LedgerResult<Option<R>> {
        self.raw_record::<R>(key)?
            .map(|bytes| decode::<R>(R::KIND, key, &bytes))
            .transpose()
    }

    /// Decode the record under `key`, failing with not-found if it is absent.
    pub fn require<R: Record>(&self, key: &str) -> LedgerResult<R> {
        self.load(key)?
            .ok_or_else(|| LedgerError::not_found(R::KIND, key))
    }

    /// Fail with not-found unless an `R` is stored under `key`.
    pub fn ensure_present<R: Record>(&self, key: &str) -> LedgerResult<()> {
        if self.raw_record::<R>(key)?.is_some() {
            Ok(())
        } else {
            Err(LedgerError::not_found(R::KIND, key))
        }
    }

    /// Fail with a conflict if some document is stored under `key`.
    pub fn ensure_absent(&self, kind: &'static str, key: &str) -> LedgerResult<()> {
        if self.exists(key)? {
            Err(LedgerError::already_exists(kind, key))
        } else {
            Ok(())
        }
    }

    /// Overwrite the document under the record's own key.
    pub fn save<R: Record>(&self, record: &R) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.store.put_state(record.key(), &bytes)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> LedgerResult<()> {
        self.store.delete_state(key)?;
        Ok(())
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct DocTag {
    #[serde(rename = "docType")]
    doc_type: DocType,
}

/// `true` when the document's `docType` belongs to `R`.
fn tagged_as<R: Record>(bytes: &[u8]) -> bool {
    serde_json::from_slice::<DocTag>(bytes).is_ok_and(|tag| R::is_kind(tag.doc_type))
}

/// Decode a stored document, naming `kind` and `key` on failure.
pub(crate) fn decode<T: DeserializeOwned>(
    kind: &'static str,
    key: &str,
    bytes: &[u8],
) -> LedgerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode {
        kind,
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Decode every row of a query result.
pub(crate) fn decode_rows<T: DeserializeOwned>(
    kind: &'static str,
    rows: Vec<KeyValue>,
) -> LedgerResult<Vec<T>> {
    rows.iter()
        .map(|row| decode(kind, &row.key, &row.value))
        .collect()
}
