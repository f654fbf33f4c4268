//! Index definitions: which composite key an [`Order`] is filed under.

use wbl_types::Order;

/// Name of the broker/creation-date index.
pub const BROKER_CREATE_DATE: &str = "broker~createDate";

/// A composite-key index over orders.
///
/// Implementations must derive the same attributes from the same order every
/// time, so the key written at creation can be recomputed at deletion.
pub trait SecondaryIndex: Send + Sync {
    /// The composite-key object type.
    fn name(&self) -> &'static str;

    /// Attribute values of `order`'s entry, in key order.
    fn attributes<'a>(&self, order: &'a Order) -> Vec<&'a str>;
}

/// Files each order under `[brokerId, createDate, orderId]`.
///
/// `createDate` is fixed-width RFC 3339, so a scan over one broker yields
/// orders in creation order. The trailing order id keeps orders created in
/// the same millisecond apart.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrokerCreateDateIndex;

impl SecondaryIndex for BrokerCreateDateIndex {
    fn name(&self) -> &'static str {
        BROKER_CREATE_DATE
    }

    fn attributes<'a>(&self, order: &'a Order) -> Vec<&'a str> {
        vec![
            order.broker_id.as_str(),
            order.create_date.as_str(),
            order.order_id.as_str(),
        ]
    }
}

/// One decoded index entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// The raw composite key.
    pub key: String,
    /// Attribute values split out of the key.
    pub attributes: Vec<String>,
    /// The indexed order, as stored in the entry's value.
    pub order_id: String,
}
