//! Writing, removing and scanning index entries.

use std::sync::Arc;

use tracing::debug;
use wbl_store::{create_composite_key, split_composite_key, StateStore};
use wbl_types::Order;

use crate::error::{IndexError, IndexResult};
use crate::index::{BrokerCreateDateIndex, IndexEntry, SecondaryIndex};

/// Keeps one secondary index in step with the orders it covers.
///
/// The maintainer holds no state of its own; every entry lives in the store
/// under the index's composite-key prefix, with the order id as its value.
pub struct IndexMaintainer {
    store: Arc<dyn StateStore>,
    index: Arc<dyn SecondaryIndex>,
}

impl IndexMaintainer {
    pub fn new(store: Arc<dyn StateStore>, index: Arc<dyn SecondaryIndex>) -> Self {
        Self { store, index }
    }

    /// A maintainer for the `broker~createDate` index.
    pub fn broker_create_date(store: Arc<dyn StateStore>) -> Self {
        Self::new(store, Arc::new(BrokerCreateDateIndex))
    }

    pub fn index_name(&self) -> &'static str {
        self.index.name()
    }

    /// The composite key `order` is filed under.
    pub fn key_for(&self, order: &Order) -> IndexResult<String> {
        Ok(create_composite_key(
            self.index.name(),
            &self.index.attributes(order),
        )?)
    }

    /// Write `order`'s entry. Rewriting an existing entry is harmless.
    pub fn index_order(&self, order: &Order) -> IndexResult<String> {
        let key = self.key_for(order)?;
        self.store.put_state(&key, order.order_id.as_bytes())?;
        debug!(index = self.index.name(), order_id = %order.order_id, "index entry written");
        Ok(key)
    }

    /// Remove `order`'s entry, recomputing its key from the order's fields.
    ///
    /// Returns `false` if there was no entry to remove.
    pub fn unindex_order(&self, order: &Order) -> IndexResult<bool> {
        let key = self.key_for(order)?;
        if !self.store.has_state(&key)? {
            return Ok(false);
        }
        self.store.delete_state(&key)?;
        debug!(index = self.index.name(), order_id = %order.order_id, "index entry removed");
        Ok(true)
    }

    /// All entries whose leading attributes equal `prefix`, in key order.
    pub fn scan(&self, prefix: &[&str]) -> IndexResult<Vec<IndexEntry>> {
        let name = self.index.name();
        let rows = self
            .store
            .get_state_by_partial_composite_key(name, prefix)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| -> IndexResult<IndexEntry> {
                let (object_type, attributes) = split_composite_key(&row.key)?;
                if object_type != name {
                    return Err(IndexError::MalformedEntry {
                        index: name,
                        reason: format!("key belongs to index {object_type:?}"),
                    });
                }
                let order_id = String::from_utf8(row.value)
                    .ok()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| IndexError::MalformedEntry {
                        index: name,
                        reason: format!("entry {:?} has no order id", row.key),
                    })?;
                Ok(IndexEntry {
                    key: row.key,
                    attributes,
                    order_id,
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for IndexMaintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMaintainer")
            .field("index", &self.index.name())
            .finish()
    }
}
