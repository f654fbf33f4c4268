use serde::{Deserialize, Serialize};
use serde_json::Value;
use wbl_store::StateStore;
use wbl_types::format_timestamp;

use crate::error::LedgerResult;
use crate::records::decode;

/// One version of a key: `{TxId, Value, Timestamp, IsDelete}`.
///
/// `value` is `None` (JSON `null`) for deletions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "TxId")]
    pub tx_id: String,
    #[serde(rename = "Value")]
    pub value: Option<Value>,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "IsDelete")]
    pub is_delete: bool,
}

/// Every recorded version of `key`, oldest first, tombstones included.
///
/// A key that was never written yields an empty list.
pub fn history_for_key(store: &dyn StateStore, key: &str) -> LedgerResult<Vec<HistoryRecord>> {
    store
        .get_history_for_key(key)?
        .map(|version| -> LedgerResult<HistoryRecord> {
            let version = version?;
            let value = match (&version.value, version.is_delete) {
                (Some(bytes), false) => Some(decode::<Value>("history value", key, bytes)?),
                _ => None,
            };
            Ok(HistoryRecord {
                tx_id: version.tx_id,
                value,
                timestamp: format_timestamp(&version.timestamp),
                is_delete: version.is_delete,
            })
        })
        .collect()
}
