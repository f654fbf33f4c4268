//! Core ledger logic for the Waybill Ledger (WBL).
//!
//! The store underneath offers keyed reads and writes, range and selector
//! scans, and per-key history, but no constraints. This crate builds the
//! ledger's guarantees on top of it:
//! - [`LedgerEngine`] -- existence, uniqueness and state-transition checks for every mutation
//! - [`AuditRecorder`] -- append-only `changeStateHistory` entries on orders
//! - [`QueryEngine`] -- range, index, selector and paginated queries, plus order/user detail views
//! - [`history_for_key`] -- tombstone-aware version history
//!
//! # Design Rules
//!
//! 1. Every mutation reads what it depends on before it writes.
//! 2. Writes are whole-document overwrites; nothing is rolled back.
//! 3. An order's `broker~createDate` index entry lives and dies with the order.
//! 4. Query results are typed values; encoding happens once at the boundary.

pub mod audit;
pub mod engine;
pub mod error;
pub mod history;
pub mod query;
pub mod records;

pub use audit::AuditRecorder;
pub use engine::LedgerEngine;
pub use error::{LedgerError, LedgerResult};
pub use history::{history_for_key, HistoryRecord};
pub use query::{
    OrderDetail, PaginatedResult, QueryEngine, QueryRecord, ResponseMetadata, UserDetail,
    STATUS_SUCCESS,
};
pub use records::RecordStore;
