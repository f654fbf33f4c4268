use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::doc_type::DocType;

/// A document stored in the ledger under its own identifier.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable kind used in error messages ("order", "user", ...).
    const KIND: &'static str;

    /// The store key of this record.
    fn key(&self) -> &str;

    fn doc_type(&self) -> DocType;

    /// Whether a document tagged `doc_type` decodes as this record.
    fn is_kind(doc_type: DocType) -> bool;
}
