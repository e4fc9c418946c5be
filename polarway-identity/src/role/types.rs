//! Role domain types

use serde::{Deserialize, Serialize};

use crate::user::{normalize_key, ClaimEntry};

/// A role; `normalized_name` is its name-index key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    pub concurrency_stamp: Option<String>,
}

impl RoleRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            normalized_name: normalize_key(&name),
            name,
            concurrency_stamp: None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.normalized_name = normalize_key(&self.name);
    }
}

/// Everything a role actor persists, as one state entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
    pub role: RoleRecord,
    #[serde(default)]
    pub claims: Vec<ClaimEntry>,
}

impl RoleState {
    pub fn new(role: RoleRecord) -> Self {
        Self {
            role,
            claims: Vec::new(),
        }
    }
}
