//! Invocation surface for the Waybill Ledger.
//!
//! Callers name a function and pass ordered string arguments; the
//! [`Contract`] resolves the name to an [`Operation`], checks argument
//! shape, parses typed values and dispatches to the ledger. Every call ends
//! in a [`Response`]: the payload bytes on success (empty for mutations) or
//! the error message.
//!
//! [`LedgerConfig`] carries the on-disk location and query settings used by
//! [`Contract::open`].

pub mod config;
pub mod contract;
pub mod error;
pub mod operation;
pub mod response;

pub use config::LedgerConfig;
pub use contract::Contract;
pub use error::{SdkError, SdkResult};
pub use operation::{Arity, Operation};
pub use response::Response;

// Re-export key types
pub use wbl_ledger::{HistoryRecord, OrderDetail, PaginatedResult, QueryRecord, UserDetail};
pub use wbl_store::SyncMode;
pub use wbl_types::{Order, OrderState, User};
