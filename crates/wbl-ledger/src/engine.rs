//! Entity mutations: creation, state changes, updates and deletion.
//!
//! Every operation checks existence and uniqueness itself before writing;
//! the store offers no constraints of its own. Writes are whole-document
//! overwrites.

use std::sync::Arc;

use tracing::info;
use wbl_index::IndexMaintainer;
use wbl_store::StateStore;
use wbl_types::{
    Clock, FileHashProof, FileScope, NewOrder, Order, OrderState, PositionRecord, Record,
    StringHashProof, User, UserProfile,
};

use crate::audit::AuditRecorder;
use crate::error::{LedgerError, LedgerResult};
use crate::records::RecordStore;

/// Applies validated mutations to the ledger.
pub struct LedgerEngine {
    records: RecordStore,
    index: IndexMaintainer,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RecordStore::new(store.clone()),
            index: IndexMaintainer::broker_create_date(store),
            audit: AuditRecorder::new(clock.clone()),
            clock,
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn index(&self) -> &IndexMaintainer {
        &self.index
    }

    /// Create an order and its `broker~createDate` index entry.
    pub fn init_order(&self, input: NewOrder) -> LedgerResult<Order> {
        self.records.ensure_absent(Order::KIND, &input.order_id)?;

        let order = Order::create(input, self.clock.timestamp())?;
        self.records.save(&order)?;
        self.index.index_order(&order)?;

        info!(order_id = %order.order_id, broker_id = %order.broker_id, state = %order.order_state, "order created");
        Ok(order)
    }

    /// Move an open order to `new_state` and record the transition.
    ///
    /// The stored state and the audit label are the lower-cased input. Reaching
    /// `SIGNED` (in any case) closes the order; a closed order accepts no
    /// further transitions.
    pub fn change_state_order(&self, order_id: &str, new_state: &str) -> LedgerResult<Order> {
        let mut order: Order = self.records.require(order_id)?;
        let state: OrderState = new_state.parse()?;

        if !order.open {
            return Err(LedgerError::PolicyViolation {
                kind: Order::KIND,
                id: order.order_id,
                reason: "order is closed".into(),
            });
        }

        let label = new_state.to_lowercase();
        order.order_state = label.clone();
        if state.is_terminal() {
            order.open = false;
        }
        self.audit.record(&mut order, &label)?;
        self.records.save(&order)?;

        info!(order_id, state = %label, open = order.open, "order state changed");
        Ok(order)
    }

    /// Record a reported position of an existing order.
    ///
    /// Reusing a position id overwrites the earlier record.
    pub fn update_position_order(&self, position: PositionRecord) -> LedgerResult<()> {
        self.records.ensure_present::<Order>(&position.order_id)?;
        self.records.save(&position)?;

        info!(position_id = %position.position_id, order_id = %position.order_id, "position recorded");
        Ok(())
    }

    /// Attach a string digest to an existing order.
    pub fn init_string_hash(&self, proof: StringHashProof) -> LedgerResult<()> {
        self.records.ensure_present::<Order>(&proof.order_id)?;
        self.records
            .ensure_absent(StringHashProof::KIND, &proof.data_id)?;
        self.records.save(&proof)?;

        info!(data_id = %proof.data_id, order_id = %proof.order_id, "string hash recorded");
        Ok(())
    }

    /// Attach a file digest to an existing order or user, depending on its scope.
    pub fn init_file_hash(&self, proof: FileHashProof) -> LedgerResult<()> {
        match proof.scope() {
            FileScope::Order => self.records.ensure_present::<Order>(&proof.order_id)?,
            FileScope::User => self.records.ensure_present::<User>(&proof.order_id)?,
        }
        self.records
            .ensure_absent(FileHashProof::KIND, &proof.file_id)?;
        self.records.save(&proof)?;

        info!(file_id = %proof.file_id, owner_id = %proof.order_id, doc_type = %proof.doc_type, "file hash recorded");
        Ok(())
    }

    pub fn init_user(&self, user_id: &str, profile: UserProfile) -> LedgerResult<User> {
        self.records.ensure_absent(User::KIND, user_id)?;
        let user = User::new(user_id, profile);
        self.records.save(&user)?;

        info!(user_id, role = %user.role, "user created");
        Ok(user)
    }

    /// Overwrite every mutable field of an existing user.
    pub fn update_user(&self, user_id: &str, profile: UserProfile) -> LedgerResult<User> {
        let mut user: User = self.records.require(user_id)?;
        user.apply(profile);
        self.records.save(&user)?;

        info!(user_id, "user updated");
        Ok(user)
    }

    /// Delete an order and its index entry. Returns the deleted order.
    pub fn delete_order(&self, order_id: &str) -> LedgerResult<Order> {
        let order: Order = self.records.require(order_id)?;
        self.records.remove(order_id)?;
        self.index.unindex_order(&order)?;

        info!(order_id, "order deleted");
        Ok(order)
    }

    pub fn delete_user(&self, user_id: &str) -> LedgerResult<()> {
        let _user: User = self.records.require(user_id)?;
        self.records.remove(user_id)?;

        info!(user_id, "user deleted");
        Ok(())
    }
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
