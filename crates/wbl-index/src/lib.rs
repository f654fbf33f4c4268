//! Secondary indexes for the Waybill Ledger.
//!
//! Indexes are derived keys in the store's composite-key namespace. They are
//! written next to the record they describe and removed with it, so a prefix
//! scan over an index never needs a rich query.
//!
//! # Key Types
//!
//! - [`SecondaryIndex`] -- Derives composite-key attributes from an [`Order`](wbl_types::Order)
//! - [`BrokerCreateDateIndex`] -- The `broker~createDate` index
//! - [`IndexMaintainer`] -- Writes, removes and scans index entries in a store
//! - [`IndexEntry`] -- A decoded index key

pub mod error;
pub mod index;
pub mod maintainer;

pub use error::{IndexError, IndexResult};
pub use index::{BrokerCreateDateIndex, IndexEntry, SecondaryIndex, BROKER_CREATE_DATE};
pub use maintainer::IndexMaintainer;
