use serde::{Deserialize, Serialize};

use crate::doc_type::DocType;
use crate::record::Record;

/// Digest of a piece of text attached to an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringHashProof {
    pub doc_type: DocType,
    pub data_id: String,
    pub order_id: String,
    pub data_url: String,
    pub sha_result: String,
    pub comment: String,
}

impl StringHashProof {
    pub fn new(
        data_id: impl Into<String>,
        order_id: impl Into<String>,
        data_url: impl Into<String>,
        sha_result: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: DocType::StringHash,
            data_id: data_id.into(),
            order_id: order_id.into(),
            data_url: data_url.into(),
            sha_result: sha_result.into(),
            comment: comment.into(),
        }
    }
}

impl Record for StringHashProof {
    const KIND: &'static str = "string hash";

    fn key(&self) -> &str {
        &self.data_id
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }

    fn is_kind(doc_type: DocType) -> bool {
        doc_type == DocType::StringHash
    }
}

/// Whether a file digest belongs to an order or to a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileScope {
    Order,
    User,
}

impl FileScope {
    pub fn from_flag(is_order: bool) -> Self {
        if is_order {
            Self::Order
        } else {
            Self::User
        }
    }

    pub fn doc_type(self) -> DocType {
        match self {
            Self::Order => DocType::FileHashForOrder,
            Self::User => DocType::FileHashForUser,
        }
    }
}

/// Digest of a file attached to an order or a user.
///
/// The scope only affects `docType`; for user-scoped files `order_id`
/// holds the owning user's identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHashProof {
    pub doc_type: DocType,
    pub file_id: String,
    pub order_id: String,
    pub data_url: String,
    pub sha_result: String,
    pub comment: String,
}

impl FileHashProof {
    pub fn new(
        scope: FileScope,
        file_id: impl Into<String>,
        owner_id: impl Into<String>,
        data_url: impl Into<String>,
        sha_result: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: scope.doc_type(),
            file_id: file_id.into(),
            order_id: owner_id.into(),
            data_url: data_url.into(),
            sha_result: sha_result.into(),
            comment: comment.into(),
        }
    }

    pub fn scope(&self) -> FileScope {
        if self.doc_type == DocType::FileHashForUser {
            FileScope::User
        } else {
            FileScope::Order
        }
    }
}

impl Record for FileHashProof {
    const KIND: &'static str = "file hash";

    fn key(&self) -> &str {
        &self.file_id
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }

    fn is_kind(doc_type: DocType) -> bool {
        matches!(doc_type, DocType::FileHashForOrder | DocType::FileHashForUser)
    }
}
