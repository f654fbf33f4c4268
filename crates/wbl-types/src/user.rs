use serde::{Deserialize, Serialize};

use crate::doc_type::DocType;
use crate::record::Record;

/// The mutable part of a [`User`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub user_name: String,
    pub role: String,
    pub telephone: String,
    pub valid: bool,
}

/// A ledger participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub doc_type: DocType,
    pub user_id: String,
    pub user_name: String,
    pub role: String,
    pub telephone: String,
    pub valid: bool,
}

impl User {
    pub fn new(user_id: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            doc_type: DocType::User,
            user_id: user_id.into(),
            user_name: profile.user_name,
            role: profile.role,
            telephone: profile.telephone,
            valid: profile.valid,
        }
    }

    /// Overwrite every mutable field.
    pub fn apply(&mut self, profile: UserProfile) {
        self.user_name = profile.user_name;
        self.role = profile.role;
        self.telephone = profile.telephone;
        self.valid = profile.valid;
    }
}

impl Record for User {
    const KIND: &'static str = "user";

    fn key(&self) -> &str {
        &self.user_id
    }

    fn doc_type(&self) -> DocType {
        self.doc_type
    }

    fn is_kind(doc_type: DocType) -> bool {
        doc_type == DocType::User
    }
}
