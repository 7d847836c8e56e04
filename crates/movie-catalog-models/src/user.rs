use serde::{Deserialize, Serialize};

/// Stub account created for rating imports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn stub_username(id: i64) -> String {
        format!("user_{}", id)
    }
}
