//! Versioned key-value state store for the Waybill Ledger.
//!
//! The ledger core never talks to storage directly; it goes through the
//! [`StateStore`] trait, which models a replicated world-state database:
//! point reads and writes, ordered key-range scans, composite-key prefix
//! scans, rich selector queries (optionally paginated), and per-key version
//! history with tombstones.
//!
//! # Storage Backends
//!
//! - [`InMemoryStateStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`DurableStateStore`] -- the in-memory store fronted by a crash-recoverable
//!   [`WriteAheadLog`]; state and history are rebuilt on open
//!
//! # Design Rules
//!
//! 1. Every write is a whole-value overwrite stamped with a fresh transaction id.
//! 2. Deletes leave a tombstone in the key's history.
//! 3. Composite keys live in their own namespace and never appear in plain
//!    range scans or selector queries.
//! 4. Results are returned as owned iterators; nothing borrows the store
//!    beyond the call that produced it.
//! 5. Selector query results carry no stability guarantee between reads.

pub mod composite;
pub mod durable;
pub mod error;
pub mod memory;
pub mod selector;
pub mod traits;
pub mod types;
pub mod wal;

pub use composite::{create_composite_key, is_composite_key, split_composite_key};
pub use durable::DurableStateStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStateStore;
pub use selector::{Condition, Operator, Selector};
pub use traits::StateStore;
pub use types::{HistoryIter, KeyModification, KeyValue, QueryMetadata, StateIter, StateMutation};
pub use wal::{SyncMode, WalConfig, WalEntry, WriteAheadLog};
