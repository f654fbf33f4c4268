use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator stored in every document's `docType` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocType {
    Order,
    Position,
    StringHash,
    FileHashForOrder,
    FileHashForUser,
    User,
}

impl DocType {
    /// The wire value used in `docType` fields and selectors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Position => "position",
            Self::StringHash => "stringHash",
            Self::FileHashForOrder => "fileHashForOrder",
            Self::FileHashForUser => "fileHashForUser",
            Self::User => "user",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
