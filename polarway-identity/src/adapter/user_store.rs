//! ActorUserStore — user capabilities composed from actor calls
//!
//! Lookups by alternate key are two hops: resolve the id through the
//! index actor, then load the record from the user actor. Listings fan
//! out one `find` per id concurrently and skip ids whose user is gone.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::error::{IdentityError, Result};
use crate::index::KeyValueHandle;
use crate::runtime::ActorRuntime;
use crate::user::{present, ClaimEntry, LoginEntry, TokenEntry, UserRecord};

use super::ensure_unbound;
use super::traits::{UserClaimStore, UserLoginStore, UserStore, UserTokenStore};

/// User store over an [`ActorRuntime`]
#[derive(Clone)]
pub struct ActorUserStore {
    runtime: Arc<ActorRuntime>,
}

impl ActorUserStore {
    pub fn new(runtime: Arc<ActorRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<ActorRuntime> {
        &self.runtime
    }

    /// Name (and email, if configured) must not belong to another user
    async fn ensure_unique(&self, user: &UserRecord) -> Result<()> {
        let indices = self.runtime.indices();
        if let Some(name) = present(&user.normalized_user_name) {
            ensure_unbound(&indices.user_name(name), &user.id, "user name").await?;
        }
        if self.runtime.config().require_unique_email {
            if let Some(email) = present(&user.normalized_email) {
                ensure_unbound(&indices.user_email(email), &user.id, "email").await?;
            }
        }
        Ok(())
    }

    async fn resolve(&self, index: KeyValueHandle) -> Result<Option<UserRecord>> {
        let Some(user_id) = index.get().await? else {
            return Ok(None);
        };
        let user = self.runtime.user(user_id.as_str()).find().await?;
        if user.is_none() {
            warn!(index = %index.address(), user_id = %user_id, "Index entry points at a missing user");
        }
        Ok(user)
    }

    async fn find_all(&self, user_ids: Vec<String>) -> Result<Vec<UserRecord>> {
        let lookups = user_ids.into_iter().map(|id| {
            let handle = self.runtime.user(id);
            async move { handle.find().await }
        });
        let mut users = Vec::new();
        for found in join_all(lookups).await {
            if let Some(user) = found? {
                users.push(user);
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl UserStore for ActorUserStore {
    async fn create_user(&self, user: UserRecord) -> Result<()> {
        self.ensure_unique(&user).await?;
        let id = user.id.clone();
        if !self.runtime.user(id.as_str()).create(user).await? {
            return Err(IdentityError::DuplicateKey(format!("user id '{id}'")));
        }
        Ok(())
    }

    async fn update_user(&self, user: UserRecord) -> Result<()> {
        self.ensure_unique(&user).await?;
        self.runtime.user(user.id.as_str()).update(user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.runtime.user(user_id).delete().await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>> {
        self.runtime.user(user_id).find().await
    }

    async fn find_by_name(&self, normalized_user_name: &str) -> Result<Option<UserRecord>> {
        self.resolve(self.runtime.indices().user_name(normalized_user_name))
            .await
    }

    async fn find_by_email(&self, normalized_email: &str) -> Result<Option<UserRecord>> {
        self.resolve(self.runtime.indices().user_email(normalized_email))
            .await
    }

    async fn users(&self) -> Result<Vec<UserRecord>> {
        let ids = self.runtime.indices().all_users().all().await?;
        self.find_all(ids).await
    }
}

#[async_trait]
impl UserClaimStore for ActorUserStore {
    async fn get_claims(&self, user_id: &str) -> Result<Vec<ClaimEntry>> {
        self.runtime.user(user_id).get_claims().await
    }

    async fn add_claims(&self, user_id: &str, claims: Vec<ClaimEntry>) -> Result<()> {
        self.runtime.user(user_id).add_claims(claims).await
    }

    async fn remove_claims(&self, user_id: &str, claims: Vec<ClaimEntry>) -> Result<()> {
        self.runtime.user(user_id).remove_claims(claims).await
    }

    async fn replace_claim(&self, user_id: &str, old: ClaimEntry, new: ClaimEntry) -> Result<()> {
        self.runtime.user(user_id).replace_claim(old, new).await
    }

    async fn get_users_for_claim(&self, claim: &ClaimEntry) -> Result<Vec<UserRecord>> {
        let ids = self
            .runtime
            .indices()
            .user_claim(&claim.claim_type, &claim.claim_value)
            .all()
            .await?;
        self.find_all(ids).await
    }
}

#[async_trait]
impl UserLoginStore for ActorUserStore {
    async fn get_logins(&self, user_id: &str) -> Result<Vec<LoginEntry>> {
        self.runtime.user(user_id).get_logins().await
    }

    async fn add_login(&self, user_id: &str, login: LoginEntry) -> Result<()> {
        let index = self
            .runtime
            .indices()
            .user_login(&login.login_provider, &login.provider_key);
        ensure_unbound(&index, user_id, "login").await?;
        self.runtime.user(user_id).add_login(login).await
    }

    async fn remove_login(
        &self,
        user_id: &str,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<()> {
        self.runtime
            .user(user_id)
            .remove_login(login_provider, provider_key)
            .await
    }

    async fn find_user_login(
        &self,
        user_id: &str,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<LoginEntry>> {
        self.runtime
            .user(user_id)
            .find_login(login_provider, provider_key)
            .await
    }

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<UserRecord>> {
        self.resolve(self.runtime.indices().user_login(login_provider, provider_key))
            .await
    }
}

#[async_trait]
impl UserTokenStore for ActorUserStore {
    async fn get_token(
        &self,
        user_id: &str,
        login_provider: &str,
        name: &str,
    ) -> Result<Option<String>> {
        self.runtime.user(user_id).get_token(login_provider, name).await
    }

    async fn add_token(&self, user_id: &str, token: TokenEntry) -> Result<()> {
        self.runtime.user(user_id).add_token(token).await
    }

    async fn remove_token(&self, user_id: &str, login_provider: &str, name: &str) -> Result<()> {
        self.runtime
            .user(user_id)
            .remove_token(login_provider, name)
            .await
    }
}
