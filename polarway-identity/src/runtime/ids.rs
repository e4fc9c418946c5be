//! Actor addressing — type names, well-known ids and key derivation
//!
//! Index actor ids are derived from the logical key and must stay
//! bit-exact across releases: persisted state is addressed by them.

use serde::{Deserialize, Serialize};

/// Id of the collection actor enumerating every user id
pub const ALL_USERS_ID: &str = "AllUsers";

/// Id of the collection actor enumerating every role id
pub const ALL_ROLES_ID: &str = "AllRoles";

/// State entry names
pub const USER_STATE_NAME: &str = "UserIdentity";
pub const ROLE_STATE_NAME: &str = "RoleIdentity";
pub const VALUE_STATE_NAME: &str = "Value";
pub const VALUES_STATE_NAME: &str = "Values";

/// Every actor type hosted by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorType {
    UserIdentity,
    UserIdentities,
    UserEmailIndex,
    UserNameIndex,
    UserLoginIndex,
    UserClaimIndex,
    UserTokenIndex,
    RoleIdentity,
    RoleIdentities,
    RoleNameIndex,
    RoleClaimIndex,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserIdentity => "UserIdentity",
            Self::UserIdentities => "UserIdentities",
            Self::UserEmailIndex => "UserEmailIndex",
            Self::UserNameIndex => "UserNameIndex",
            Self::UserLoginIndex => "UserLoginIndex",
            Self::UserClaimIndex => "UserClaimIndex",
            Self::UserTokenIndex => "UserTokenIndex",
            Self::RoleIdentity => "RoleIdentity",
            Self::RoleIdentities => "RoleIdentities",
            Self::RoleNameIndex => "RoleNameIndex",
            Self::RoleClaimIndex => "RoleClaimIndex",
        }
    }
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location-transparent address of one actor instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorAddress {
    pub actor_type: ActorType,
    pub actor_id: String,
}

impl ActorAddress {
    pub fn new(actor_type: ActorType, actor_id: impl Into<String>) -> Self {
        Self {
            actor_type,
            actor_id: actor_id.into(),
        }
    }
}

impl std::fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}

/// `"{provider}:{provider_key}"`
pub fn login_index_id(login_provider: &str, provider_key: &str) -> String {
    format!("{login_provider}:{provider_key}")
}

/// `"{claim_type}:{claim_value}"`
pub fn claim_index_id(claim_type: &str, claim_value: &str) -> String {
    format!("{claim_type}:{claim_value}")
}

/// `"{provider}:{name}"`
pub fn token_index_id(login_provider: &str, name: &str) -> String {
    format!("{login_provider}:{name}")
}
