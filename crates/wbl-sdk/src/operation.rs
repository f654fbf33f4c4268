use std::fmt;
use std::str::FromStr;

use crate::error::SdkError;

/// Accepted argument counts of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "{n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Every function the ledger can be invoked with.
///
/// Function names resolve to an `Operation` once, before any argument is
/// looked at; dispatch is an exhaustive `match` on the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    InitOrder,
    InitStringHash,
    InitFileHash,
    InitUser,
    UpdateUser,
    ReadUser,
    DeleteUser,
    Delete,
    ChangeStateOrder,
    ReadOrder,
    QueryOrdersByBroker,
    QueryAssets,
    UpdatePositionOrder,
    GetHistoryForOrder,
    GetOrdersByRange,
    GetOrdersByRangeWithPagination,
    QueryOrderDetail,
    QueryOrdersWithPagination,
    GetOrdersByBroker,
}

impl Operation {
    pub const ALL: [Operation; 19] = [
        Self::InitOrder,
        Self::InitStringHash,
        Self::InitFileHash,
        Self::InitUser,
        Self::UpdateUser,
        Self::ReadUser,
        Self::DeleteUser,
        Self::Delete,
        Self::ChangeStateOrder,
        Self::ReadOrder,
        Self::QueryOrdersByBroker,
        Self::QueryAssets,
        Self::UpdatePositionOrder,
        Self::GetHistoryForOrder,
        Self::GetOrdersByRange,
        Self::GetOrdersByRangeWithPagination,
        Self::QueryOrderDetail,
        Self::QueryOrdersWithPagination,
        Self::GetOrdersByBroker,
    ];

    /// The function name callers invoke.
    pub fn name(self) -> &'static str {
        match self {
            Self::InitOrder => "initOrder",
            Self::InitStringHash => "initStringHash",
            Self::InitFileHash => "initFileHash",
            Self::InitUser => "initUser",
            Self::UpdateUser => "updateUser",
            Self::ReadUser => "readUser",
            Self::DeleteUser => "deleteUser",
            Self::Delete => "delete",
            Self::ChangeStateOrder => "changeStateOrder",
            Self::ReadOrder => "readOrder",
            Self::QueryOrdersByBroker => "queryOrdersByBroker",
            Self::QueryAssets => "queryAssets",
            Self::UpdatePositionOrder => "updatePositionOrder",
            Self::GetHistoryForOrder => "getHistoryForOrder",
            Self::GetOrdersByRange => "getOrdersByRange",
            Self::GetOrdersByRangeWithPagination => "getOrdersByRangeWithPagination",
            Self::QueryOrderDetail => "queryOrderDetail",
            Self::QueryOrdersWithPagination => "queryOrdersWithPagination",
            Self::GetOrdersByBroker => "getOrdersByBroker",
        }
    }

    pub fn arity(self) -> Arity {
        use Arity::*;
        match self {
            Self::InitOrder => Exactly(10),
            Self::InitStringHash => Exactly(5),
            Self::InitFileHash => Exactly(6),
            Self::InitUser => Exactly(5),
            Self::UpdateUser => AtLeast(5),
            Self::ReadUser | Self::DeleteUser | Self::Delete | Self::ReadOrder => Exactly(1),
            Self::GetOrdersByBroker => Exactly(1),
            Self::ChangeStateOrder => AtLeast(2),
            Self::QueryOrdersByBroker
            | Self::QueryAssets
            | Self::GetHistoryForOrder
            | Self::QueryOrderDetail => AtLeast(1),
            Self::UpdatePositionOrder => AtLeast(5),
            Self::GetOrdersByRange => AtLeast(2),
            Self::GetOrdersByRangeWithPagination => AtLeast(4),
            Self::QueryOrdersWithPagination => AtLeast(3),
        }
    }

    /// Positions of arguments that must not be empty.
    pub fn required(self) -> &'static [usize] {
        match self {
            Self::InitOrder => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            Self::InitStringHash => &[0, 1, 3],
            Self::InitFileHash => &[0, 1, 3, 4, 5],
            Self::InitUser => &[0, 1, 2, 3, 4],
            Self::UpdateUser => &[0],
            Self::UpdatePositionOrder => &[0, 1, 2, 3, 4],
            Self::ChangeStateOrder => &[0, 1],
            Self::QueryOrdersWithPagination => &[0, 1],
            Self::GetOrdersByRangeWithPagination => &[2],
            Self::GetOrdersByRange => &[],
            Self::ReadUser
            | Self::DeleteUser
            | Self::Delete
            | Self::ReadOrder
            | Self::QueryOrdersByBroker
            | Self::QueryAssets
            | Self::GetHistoryForOrder
            | Self::QueryOrderDetail
            | Self::GetOrdersByBroker => &[0],
        }
    }

    /// `true` for operations that write to the store.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::InitOrder
                | Self::InitStringHash
                | Self::InitFileHash
                | Self::InitUser
                | Self::UpdateUser
                | Self::DeleteUser
                | Self::Delete
                | Self::ChangeStateOrder
                | Self::UpdatePositionOrder
        )
    }
}

impl FromStr for Operation {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| SdkError::UnknownFunction(s.to_string()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
