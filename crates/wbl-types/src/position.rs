use serde::{Deserialize, Serialize};

use crate::doc_type::DocType;
use crate::record::Record;

/// One reported position of an order in transit.
///
/// Positions are append-only: each report is its own record, and nothing
/// about an earlier report changes when a later one arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub doc_type: DocType,
    pub position_id: String,
    pub order_id: String,
    /// Caller-assigned sequence marker within the order's route.
    pub sequence: String,
    /// When the position was observed, as reported by the caller.
    pub time_position: String,
    /// Coordinates or a place name.
    pub position_string: String,
}

impl PositionRecord {
    pub fn new(
        position_id: impl Into<String>,
        order_id: impl Into<String>,
        sequence: impl Into<String>,
        time_position: impl Into<String>,
        position_string: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: DocType::Position,
            position_id: position_id.into(),
            order_id: order_id.into(),
            sequence: sequence.into(),
            time_position: time_position.into(),
            position_string: position_string.into(),
        }
    }
}

impl Record for PositionRecord {
    const KIND: &'static str = "position";

    fn key(&self) -> &str {
        &self.position_id
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }

    fn is_kind(doc_type: DocType) -> bool {
        doc_type == DocType::Position
    }
}
