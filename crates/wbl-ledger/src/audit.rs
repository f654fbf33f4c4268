//! Audit trail recording for orders.

use std::sync::Arc;

use wbl_types::{AuditEntry, Clock, Order, Record, TypeError};

use crate::error::{LedgerError, LedgerResult};

/// Appends timestamped transitions to an order's `changeStateHistory`.
///
/// Only initialized trails (first entry `createOrder`) accept entries. An
/// order decoded from a document without that entry cannot be transitioned.
pub struct AuditRecorder {
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Append `label -> now()` to `order`'s trail.
    pub fn record(&self, order: &mut Order, label: &str) -> LedgerResult<AuditEntry> {
        let timestamp = self.clock.timestamp();
        match order.change_state_history.append(label, timestamp) {
            Ok(entry) => Ok(entry.clone()),
            Err(TypeError::UninitializedAuditTrail) => Err(LedgerError::PolicyViolation {
                kind: Order::KIND,
                id: order.order_id.clone(),
                reason: "change state history is not initialized".into(),
            }),
            Err(TypeError::ReservedAuditLabel(label)) => Err(LedgerError::PolicyViolation {
                kind: Order::KIND,
                id: order.order_id.clone(),
                reason: format!("{label:?} may only be recorded at creation"),
            }),
            Err(other) => Err(other.into()),
        }
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}
