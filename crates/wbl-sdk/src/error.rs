use thiserror::Error;

use crate::operation::Arity;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Received unknown function invocation")]
    UnknownFunction(String),

    #[error("Incorrect number of arguments for {function}. Expecting {expected}, got {got}")]
    ArgumentCount {
        function: &'static str,
        expected: Arity,
        got: usize,
    },

    #[error("{ordinal} argument must be a non-empty string")]
    EmptyArgument { ordinal: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Ledger(#[from] wbl_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] wbl_store::StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
