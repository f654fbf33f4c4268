use thiserror::Error;

/// Errors produced while parsing or mutating record values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("{field} must be a numeric string, got {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("{field} must be a boolean string, got {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("unknown order state: {0}")]
    UnknownOrderState(String),

    #[error("change state history is not initialized")]
    UninitializedAuditTrail,

    #[error("audit label {0:?} is reserved")]
    ReservedAuditLabel(String),

    #[error("audit label must not be empty")]
    EmptyAuditLabel,
}
