//! Capability traits consumed by an identity framework
//!
//! One narrow trait per capability, so a host can depend on exactly the
//! surface it uses. All lookups by name/email take the *normalized* key.

use async_trait::async_trait;

use crate::error::Result;
use crate::role::RoleRecord;
use crate::user::{ClaimEntry, LoginEntry, TokenEntry, UserRecord};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateKey` if the id, name or email is taken
    async fn create_user(&self, user: UserRecord) -> Result<()>;

    async fn update_user(&self, user: UserRecord) -> Result<()>;

    /// Deleting an unknown user succeeds
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>>;

    async fn find_by_name(&self, normalized_user_name: &str) -> Result<Option<UserRecord>>;

    async fn find_by_email(&self, normalized_email: &str) -> Result<Option<UserRecord>>;

    /// Every user
    async fn users(&self) -> Result<Vec<UserRecord>>;
}

#[async_trait]
pub trait UserClaimStore: Send + Sync {
    async fn get_claims(&self, user_id: &str) -> Result<Vec<ClaimEntry>>;

    async fn add_claims(&self, user_id: &str, claims: Vec<ClaimEntry>) -> Result<()>;

    async fn remove_claims(&self, user_id: &str, claims: Vec<ClaimEntry>) -> Result<()>;

    async fn replace_claim(&self, user_id: &str, old: ClaimEntry, new: ClaimEntry) -> Result<()>;

    async fn get_users_for_claim(&self, claim: &ClaimEntry) -> Result<Vec<UserRecord>>;
}

#[async_trait]
pub trait UserLoginStore: Send + Sync {
    async fn get_logins(&self, user_id: &str) -> Result<Vec<LoginEntry>>;

    /// Fails with `DuplicateKey` if another user holds the login
    async fn add_login(&self, user_id: &str, login: LoginEntry) -> Result<()>;

    async fn remove_login(&self, user_id: &str, login_provider: &str, provider_key: &str)
        -> Result<()>;

    /// The login as held by `user_id`
    async fn find_user_login(
        &self,
        user_id: &str,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<LoginEntry>>;

    /// The user holding the login
    async fn find_by_login(&self, login_provider: &str, provider_key: &str)
        -> Result<Option<UserRecord>>;
}

#[async_trait]
pub trait UserTokenStore: Send + Sync {
    async fn get_token(&self, user_id: &str, login_provider: &str, name: &str)
        -> Result<Option<String>>;

    async fn add_token(&self, user_id: &str, token: TokenEntry) -> Result<()>;

    async fn remove_token(&self, user_id: &str, login_provider: &str, name: &str) -> Result<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Fails with `DuplicateKey` if the id or name is taken
    async fn create_role(&self, role: RoleRecord) -> Result<()>;

    async fn update_role(&self, role: RoleRecord) -> Result<()>;

    async fn delete_role(&self, role_id: &str) -> Result<()>;

    async fn find_role_by_id(&self, role_id: &str) -> Result<Option<RoleRecord>>;

    async fn find_role_by_name(&self, normalized_name: &str) -> Result<Option<RoleRecord>>;

    async fn roles(&self) -> Result<Vec<RoleRecord>>;
}

#[async_trait]
pub trait RoleClaimStore: Send + Sync {
    async fn get_role_claims(&self, role_id: &str) -> Result<Vec<ClaimEntry>>;

    async fn add_role_claims(&self, role_id: &str, claims: Vec<ClaimEntry>) -> Result<()>;

    async fn remove_role_claims(&self, role_id: &str, claims: Vec<ClaimEntry>) -> Result<()>;

    async fn get_roles_for_claim(&self, claim: &ClaimEntry) -> Result<Vec<RoleRecord>>;
}
