//! User domain types
//!
//! Serializable, cloneable, and cheap to pass around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical form used as an index key: trimmed and upper-cased
pub fn normalize_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// `Some(value)` unless blank
pub(crate) fn present(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// A user account
///
/// `id` is assigned by the caller and doubles as the actor id.
/// The normalized fields are the index keys; blank means "not indexed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub user_name: String,
    pub normalized_user_name: String,
    pub email: String,
    pub normalized_email: String,
    pub email_confirmed: bool,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub access_failed_count: u32,
    pub security_stamp: Option<String>,
    pub concurrency_stamp: Option<String>,
    pub external_id: Option<String>,
    pub external_data: Option<String>,
    pub partitions: Vec<String>,
    pub default_partition: Option<String>,
}

impl UserRecord {
    /// New record with normalized name and email filled in
    pub fn new(id: impl Into<String>, user_name: impl Into<String>, email: impl Into<String>) -> Self {
        let user_name = user_name.into();
        let email = email.into();
        Self {
            id: id.into(),
            normalized_user_name: normalize_key(&user_name),
            normalized_email: normalize_key(&email),
            user_name,
            email,
            ..Default::default()
        }
    }

    /// Change the user name and its normalized key together
    pub fn set_user_name(&mut self, user_name: impl Into<String>) {
        self.user_name = user_name.into();
        self.normalized_user_name = normalize_key(&self.user_name);
    }

    /// Change the email and its normalized key together
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.normalized_email = normalize_key(&self.email);
    }

    pub fn with_partitions(mut self, partitions: Vec<String>, default: Option<String>) -> Self {
        self.partitions = partitions;
        self.default_partition = default;
        self
    }
}

/// A `(type, value)` claim held by a user or role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimEntry {
    pub claim_type: String,
    pub claim_value: String,
}

impl ClaimEntry {
    pub fn new(claim_type: impl Into<String>, claim_value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
        }
    }
}

/// An external login bound to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginEntry {
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: Option<String>,
}

impl LoginEntry {
    pub fn new(login_provider: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            login_provider: login_provider.into(),
            provider_key: provider_key.into(),
            provider_display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.provider_display_name = Some(name.into());
        self
    }

    pub(crate) fn matches(&self, login_provider: &str, provider_key: &str) -> bool {
        self.login_provider == login_provider && self.provider_key == provider_key
    }
}

/// An authentication token stored for one user, keyed by `(provider, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub login_provider: String,
    pub name: String,
    pub value: String,
}

impl TokenEntry {
    pub fn new(
        login_provider: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            login_provider: login_provider.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub(crate) fn matches(&self, login_provider: &str, name: &str) -> bool {
        self.login_provider == login_provider && self.name == name
    }
}

/// Everything a user actor persists, as one state entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub user: UserRecord,
    #[serde(default)]
    pub claims: Vec<ClaimEntry>,
    #[serde(default)]
    pub logins: Vec<LoginEntry>,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

impl UserState {
    pub fn new(user: UserRecord) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_normalizes_keys() {
        let user = UserRecord::new("u1", "Alice", " alice@Example.com ");
        assert_eq!(user.normalized_user_name, "ALICE");
        assert_eq!(user.normalized_email, "ALICE@EXAMPLE.COM");
    }

    #[test]
    fn test_present_treats_whitespace_as_blank() {
        assert_eq!(present("  "), None);
        assert_eq!(present("X"), Some("X"));
    }

    #[test]
    fn test_state_tolerates_missing_collections() {
        let json = r#"{"user":{"id":"u1","user_name":"a","normalized_user_name":"A",
            "email":"","normalized_email":"","email_confirmed":false,"phone_number":null,
            "phone_number_confirmed":false,"two_factor_enabled":false,"lockout_end":null,
            "lockout_enabled":false,"access_failed_count":0,"security_stamp":null,
            "concurrency_stamp":null,"external_id":null,"external_data":null,
            "partitions":[],"default_partition":null}}"#;
        let state: UserState = serde_json::from_str(json).unwrap();
        assert_eq!(state.user.id, "u1");
        assert!(state.claims.is_empty() && state.logins.is_empty() && state.tokens.is_empty());
    }
}
