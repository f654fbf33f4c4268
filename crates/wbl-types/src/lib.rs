//! Record schema for the Waybill Ledger (WBL).
//!
//! Every other WBL crate depends on `wbl-types`. The types here are the JSON
//! documents stored in the ledger, keyed by their own identifier and tagged
//! with a `docType` discriminator so that selector queries can address one
//! kind of record at a time.
//!
//! # Key Types
//!
//! - [`Order`] -- a shipment tracked through [`OrderState`]s, carrying its [`AuditTrail`]
//! - [`PositionRecord`] -- one reported position of an order
//! - [`StringHashProof`] / [`FileHashProof`] -- content digests attached to an order or user
//! - [`User`] -- a participant (goods owner, broker, driver)
//! - [`Clock`] -- injectable time source for `createDate` and audit timestamps

pub mod doc_type;
pub mod error;
pub mod order;
pub mod parse;
pub mod position;
pub mod proof;
pub mod record;
pub mod temporal;
pub mod user;

pub use doc_type::DocType;
pub use error::TypeError;
pub use order::{AuditEntry, AuditTrail, NewOrder, Order, OrderState, CREATE_ORDER};
pub use parse::{parse_decimal, parse_flag};
pub use position::PositionRecord;
pub use proof::{FileHashProof, FileScope, StringHashProof};
pub use record::Record;
pub use temporal::{format_timestamp, Clock, ManualClock, SystemClock};
pub use user::{User, UserProfile};
