use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::doc_type::DocType;
use crate::error::TypeError;
use crate::record::Record;

/// Label of the audit entry written when an order is created.
pub const CREATE_ORDER: &str = "createOrder";

/// Delivery state of an order.
///
/// States are matched case-insensitively; the canonical spelling is the
/// upper-case form returned by [`OrderState::as_str`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderState {
    WaitDriverAccept,
    DriverAcceptWaitRoad,
    DriverOnRoad,
    ArrivedWaitSign,
    Signed,
}

impl OrderState {
    pub const ALL: [OrderState; 5] = [
        Self::WaitDriverAccept,
        Self::DriverAcceptWaitRoad,
        Self::DriverOnRoad,
        Self::ArrivedWaitSign,
        Self::Signed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitDriverAccept => "WAIT_DRIVER_ACCEPT",
            Self::DriverAcceptWaitRoad => "DRIVER_ACCEPT_WAIT_ROAD",
            Self::DriverOnRoad => "DRIVER_ON_ROAD",
            Self::ArrivedWaitSign => "ARRIVED_WAIT_SIGN",
            Self::Signed => "SIGNED",
        }
    }

    /// Returns `true` for the state that closes an order.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Signed)
    }
}

impl FromStr for OrderState {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownOrderState(s.to_string()))
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transition recorded in an order's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub label: String,
    pub timestamp: String,
}

/// Append-only log of state transitions embedded in an [`Order`].
///
/// A trail built in-process always starts with a [`CREATE_ORDER`] entry.
/// Trails decoded from documents written by older software may lack it;
/// such trails are reported as uninitialized and refuse appends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    /// Start a trail with its `createOrder` entry.
    pub fn begin(timestamp: impl Into<String>) -> Self {
        Self {
            entries: vec![AuditEntry {
                label: CREATE_ORDER.to_string(),
                timestamp: timestamp.into(),
            }],
        }
    }

    /// `true` when the first entry is `createOrder`.
    pub fn is_initialized(&self) -> bool {
        self.entries
            .first()
            .is_some_and(|entry| entry.label == CREATE_ORDER)
    }

    /// Append a transition. Earlier entries are never touched.
    pub fn append(
        &mut self,
        label: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<&AuditEntry, TypeError> {
        let label = label.into();
        if label.is_empty() {
            return Err(TypeError::EmptyAuditLabel);
        }
        if label == CREATE_ORDER {
            return Err(TypeError::ReservedAuditLabel(label));
        }
        if !self.is_initialized() {
            return Err(TypeError::UninitializedAuditTrail);
        }
        self.entries.push(AuditEntry {
            label,
            timestamp: timestamp.into(),
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// Timestamp of the most recent entry carrying `label`.
    pub fn latest(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.label == label)
            .map(|entry| entry.timestamp.as_str())
    }
}

/// Validated input for creating an [`Order`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub order_id: String,
    pub from_address: String,
    pub to_address: String,
    pub content: String,
    pub weight_ton: f64,
    pub trans_fee: f64,
    pub order_state: String,
    pub goods_owner_id: String,
    pub broker_id: String,
    pub driver_id: String,
}

/// A shipment order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub doc_type: DocType,
    pub order_id: String,
    pub from_address: String,
    pub to_address: String,
    pub content: String,
    pub weight_ton: f64,
    pub trans_fee: f64,
    pub order_state: String,
    pub goods_owner_id: String,
    pub broker_id: String,
    pub driver_id: String,
    pub create_date: String,
    pub open: bool,
    #[serde(default)]
    pub change_state_history: AuditTrail,
}

impl Order {
    /// Build a new order stamped with `created_at`.
    ///
    /// The order is open unless it is created directly in a terminal state.
    pub fn create(input: NewOrder, created_at: impl Into<String>) -> Result<Self, TypeError> {
        let state: OrderState = input.order_state.parse()?;
        let created_at = created_at.into();
        Ok(Self {
            doc_type: DocType::Order,
            order_id: input.order_id,
            from_address: input.from_address,
            to_address: input.to_address,
            content: input.content,
            weight_ton: input.weight_ton,
            trans_fee: input.trans_fee,
            order_state: input.order_state,
            goods_owner_id: input.goods_owner_id,
            broker_id: input.broker_id,
            driver_id: input.driver_id,
            create_date: created_at.clone(),
            open: !state.is_terminal(),
            change_state_history: AuditTrail::begin(created_at),
        })
    }

    /// The parsed delivery state.
    pub fn state(&self) -> Result<OrderState, TypeError> {
        self.order_state.parse()
    }
}

impl Record for Order {
    const KIND: &'static str = "order";

    fn key(&self) -> &str {
        &self.order_id
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }

    fn is_kind(doc_type: DocType) -> bool {
        doc_type == DocType::Order
    }
}
