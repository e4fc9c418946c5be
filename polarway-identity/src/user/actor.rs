//! UserActor — single-writer owner of one user's state
//!
//! The actor persists its own state first and then brings the dependent
//! index actors in line, one call at a time:
//!
//! ```text
//! create:  save state → AllUsers.add → email.set → name.set
//! update:  save state → old email.remove → new email.set → (same for name)
//! delete:  email.remove → name.remove → logins → claims → clear state → AllUsers.remove
//! ```
//!
//! There is no cross-actor transaction. A failing index call aborts the
//! rest of the sequence and whatever already ran stays applied.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::{IdentityError, Result};
use crate::index::IndexServices;
use crate::runtime::ids::{ActorAddress, USER_STATE_NAME};
use crate::runtime::{Actor, ActorRuntime};
use crate::state::{load_json, save_json, StateKey, StateStore};

use super::types::{present, ClaimEntry, LoginEntry, TokenEntry, UserRecord, UserState};

// ─── Actor Messages ───

pub(crate) enum UserMsg {
    Exists {
        reply: oneshot::Sender<Result<bool>>,
    },
    Create {
        record: UserRecord,
        reply: oneshot::Sender<Result<bool>>,
    },
    Find {
        reply: oneshot::Sender<Result<Option<UserRecord>>>,
    },
    Update {
        record: UserRecord,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        reply: oneshot::Sender<Result<()>>,
    },
    GetClaims {
        reply: oneshot::Sender<Result<Vec<ClaimEntry>>>,
    },
    AddClaims {
        claims: Vec<ClaimEntry>,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveClaims {
        claims: Vec<ClaimEntry>,
        reply: oneshot::Sender<Result<()>>,
    },
    ReplaceClaim {
        old: ClaimEntry,
        new: ClaimEntry,
        reply: oneshot::Sender<Result<()>>,
    },
    GetLogins {
        reply: oneshot::Sender<Result<Vec<LoginEntry>>>,
    },
    AddLogin {
        login: LoginEntry,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveLogin {
        login_provider: String,
        provider_key: String,
        reply: oneshot::Sender<Result<()>>,
    },
    FindLogin {
        login_provider: String,
        provider_key: String,
        reply: oneshot::Sender<Result<Option<LoginEntry>>>,
    },
    GetToken {
        login_provider: String,
        name: String,
        reply: oneshot::Sender<Result<Option<String>>>,
    },
    AddToken {
        token: TokenEntry,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveToken {
        login_provider: String,
        name: String,
        reply: oneshot::Sender<Result<()>>,
    },
}

// ─── Actor ───

pub(crate) struct UserActor {
    address: ActorAddress,
    key: StateKey,
    store: Arc<dyn StateStore>,
    indices: IndexServices,
    loaded: bool,
    state: Option<UserState>,
}

impl UserActor {
    pub(crate) fn new(
        address: ActorAddress,
        store: Arc<dyn StateStore>,
        indices: IndexServices,
    ) -> Self {
        let key = StateKey::new(&address, USER_STATE_NAME);
        Self {
            address,
            key,
            store,
            indices,
            loaded: false,
            state: None,
        }
    }

    fn id(&self) -> &str {
        &self.address.actor_id
    }

    async fn load(&mut self) -> Result<Option<&UserState>> {
        if !self.loaded {
            self.state = load_json(self.store.as_ref(), &self.key).await?;
            self.loaded = true;
        }
        Ok(self.state.as_ref())
    }

    /// Copy of the active state, or `NotFound`
    async fn active(&mut self) -> Result<UserState> {
        if let Some(state) = self.load().await? {
            return Ok(state.clone());
        }
        Err(IdentityError::user_not_found(self.id()))
    }

    async fn persist(&mut self, next: UserState) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &next).await?;
        self.state = Some(next);
        Ok(())
    }

    fn check_id(&self, record: &UserRecord) -> Result<()> {
        if record.id != self.id() {
            return Err(IdentityError::IdMismatch {
                actor: self.id().to_string(),
                record: record.id.clone(),
            });
        }
        Ok(())
    }

    // ─── Record ───

    async fn handle_create(&mut self, record: UserRecord) -> Result<bool> {
        self.check_id(&record)?;
        if self.load().await?.is_some() {
            debug!(user_id = %self.id(), "Create ignored, user already exists");
            return Ok(false);
        }

        let email = record.normalized_email.clone();
        let name = record.normalized_user_name.clone();
        self.persist(UserState::new(record)).await?;

        let id = self.id().to_string();
        self.indices.all_users().add(id.as_str()).await?;
        if let Some(email) = present(&email) {
            self.indices.user_email(email).set(id.as_str()).await?;
        }
        if let Some(name) = present(&name) {
            self.indices.user_name(name).set(id.as_str()).await?;
        }

        info!(user_id = %id, "User created");
        Ok(true)
    }

    async fn handle_update(&mut self, record: UserRecord) -> Result<()> {
        self.check_id(&record)?;
        let mut next = self.active().await?;
        let previous = std::mem::replace(&mut next.user, record);
        let (new_email, new_name) = (
            next.user.normalized_email.clone(),
            next.user.normalized_user_name.clone(),
        );
        self.persist(next).await?;

        let id = self.id().to_string();
        if previous.normalized_email != new_email {
            if let Some(old) = present(&previous.normalized_email) {
                self.indices.user_email(old).remove().await?;
            }
            if let Some(new) = present(&new_email) {
                self.indices.user_email(new).set(id.as_str()).await?;
            }
            debug!(user_id = %id, "Email index moved");
        }
        if previous.normalized_user_name != new_name {
            if let Some(old) = present(&previous.normalized_user_name) {
                self.indices.user_name(old).remove().await?;
            }
            if let Some(new) = present(&new_name) {
                self.indices.user_name(new).set(id.as_str()).await?;
            }
            debug!(user_id = %id, "Name index moved");
        }
        Ok(())
    }

    async fn handle_delete(&mut self) -> Result<()> {
        let state = match self.load().await? {
            Some(state) => state.clone(),
            None => return Ok(()),
        };
        let id = self.id().to_string();

        if let Some(email) = present(&state.user.normalized_email) {
            self.indices.user_email(email).remove().await?;
        }
        if let Some(name) = present(&state.user.normalized_user_name) {
            self.indices.user_name(name).remove().await?;
        }
        for login in &state.logins {
            self.indices
                .user_login(&login.login_provider, &login.provider_key)
                .remove()
                .await?;
        }
        for claim in &state.claims {
            self.indices
                .user_claim(&claim.claim_type, &claim.claim_value)
                .remove(id.as_str())
                .await?;
        }

        self.store.remove(&self.key).await?;
        self.state = None;

        self.indices.all_users().remove(id.as_str()).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    // ─── Claims ───

    async fn handle_add_claims(&mut self, claims: Vec<ClaimEntry>) -> Result<()> {
        let mut next = self.active().await?;
        let mut added = Vec::new();
        for claim in claims {
            if !next.claims.contains(&claim) {
                next.claims.push(claim.clone());
                added.push(claim);
            }
        }
        if added.is_empty() {
            return Ok(());
        }
        self.persist(next).await?;

        let id = self.id().to_string();
        for claim in &added {
            self.indices
                .user_claim(&claim.claim_type, &claim.claim_value)
                .add(id.as_str())
                .await?;
        }
        Ok(())
    }

    async fn handle_remove_claims(&mut self, claims: Vec<ClaimEntry>) -> Result<()> {
        let mut next = self.active().await?;
        let (removed, kept): (Vec<ClaimEntry>, Vec<ClaimEntry>) = next
            .claims
            .into_iter()
            .partition(|c| claims.contains(c));
        if removed.is_empty() {
            return Ok(());
        }
        next.claims = kept;
        self.persist(next).await?;

        let id = self.id().to_string();
        for claim in &removed {
            self.indices
                .user_claim(&claim.claim_type, &claim.claim_value)
                .remove(id.as_str())
                .await?;
        }
        Ok(())
    }

    async fn handle_replace_claim(&mut self, old: ClaimEntry, new: ClaimEntry) -> Result<()> {
        let mut next = self.active().await?;
        let before = next.claims.len();
        next.claims.retain(|c| *c != old);
        let removed = next.claims.len() != before;
        let added = !next.claims.contains(&new);
        if !removed && !added {
            return Ok(());
        }
        if added {
            next.claims.push(new.clone());
        }
        self.persist(next).await?;

        let id = self.id().to_string();
        if removed {
            self.indices
                .user_claim(&old.claim_type, &old.claim_value)
                .remove(id.as_str())
                .await?;
        }
        if added {
            self.indices
                .user_claim(&new.claim_type, &new.claim_value)
                .add(id.as_str())
                .await?;
        }
        Ok(())
    }

    // ─── Logins ───

    async fn handle_add_login(&mut self, login: LoginEntry) -> Result<()> {
        let mut next = self.active().await?;
        next.logins
            .retain(|l| !l.matches(&login.login_provider, &login.provider_key));
        next.logins.push(login.clone());
        self.persist(next).await?;

        self.indices
            .user_login(&login.login_provider, &login.provider_key)
            .set(self.id())
            .await
    }

    async fn handle_remove_login(&mut self, login_provider: &str, provider_key: &str) -> Result<()> {
        let mut next = self.active().await?;
        let before = next.logins.len();
        next.logins.retain(|l| !l.matches(login_provider, provider_key));
        if next.logins.len() == before {
            return Ok(());
        }
        self.persist(next).await?;

        self.indices
            .user_login(login_provider, provider_key)
            .remove()
            .await
    }

    async fn handle_find_login(
        &mut self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<LoginEntry>> {
        Ok(self.load().await?.and_then(|s| {
            s.logins
                .iter()
                .find(|l| l.matches(login_provider, provider_key))
                .cloned()
        }))
    }

    // ─── Tokens ───

    async fn handle_add_token(&mut self, token: TokenEntry) -> Result<()> {
        let mut next = self.active().await?;
        next.tokens
            .retain(|t| !t.matches(&token.login_provider, &token.name));
        next.tokens.push(token);
        self.persist(next).await
    }

    async fn handle_remove_token(&mut self, login_provider: &str, name: &str) -> Result<()> {
        let mut next = self.active().await?;
        let before = next.tokens.len();
        next.tokens.retain(|t| !t.matches(login_provider, name));
        if next.tokens.len() == before {
            return Ok(());
        }
        self.persist(next).await
    }

    async fn handle_get_token(&mut self, login_provider: &str, name: &str) -> Result<Option<String>> {
        Ok(self.load().await?.and_then(|s| {
            s.tokens
                .iter()
                .find(|t| t.matches(login_provider, name))
                .map(|t| t.value.clone())
        }))
    }
}

#[async_trait]
impl Actor for UserActor {
    type Msg = UserMsg;

    fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn handle(&mut self, msg: UserMsg) {
        match msg {
            UserMsg::Exists { reply } => {
                let _ = reply.send(self.load().await.map(|s| s.is_some()));
            }
            UserMsg::Create { record, reply } => {
                let _ = reply.send(self.handle_create(record).await);
            }
            UserMsg::Find { reply } => {
                let _ = reply.send(self.load().await.map(|s| s.map(|s| s.user.clone())));
            }
            UserMsg::Update { record, reply } => {
                let _ = reply.send(self.handle_update(record).await);
            }
            UserMsg::Delete { reply } => {
                let _ = reply.send(self.handle_delete().await);
            }
            UserMsg::GetClaims { reply } => {
                let _ = reply.send(
                    self.load()
                        .await
                        .map(|s| s.map(|s| s.claims.clone()).unwrap_or_default()),
                );
            }
            UserMsg::AddClaims { claims, reply } => {
                let _ = reply.send(self.handle_add_claims(claims).await);
            }
            UserMsg::RemoveClaims { claims, reply } => {
                let _ = reply.send(self.handle_remove_claims(claims).await);
            }
            UserMsg::ReplaceClaim { old, new, reply } => {
                let _ = reply.send(self.handle_replace_claim(old, new).await);
            }
            UserMsg::GetLogins { reply } => {
                let _ = reply.send(
                    self.load()
                        .await
                        .map(|s| s.map(|s| s.logins.clone()).unwrap_or_default()),
                );
            }
            UserMsg::AddLogin { login, reply } => {
                let _ = reply.send(self.handle_add_login(login).await);
            }
            UserMsg::RemoveLogin { login_provider, provider_key, reply } => {
                let _ = reply.send(self.handle_remove_login(&login_provider, &provider_key).await);
            }
            UserMsg::FindLogin { login_provider, provider_key, reply } => {
                let _ = reply.send(self.handle_find_login(&login_provider, &provider_key).await);
            }
            UserMsg::GetToken { login_provider, name, reply } => {
                let _ = reply.send(self.handle_get_token(&login_provider, &name).await);
            }
            UserMsg::AddToken { token, reply } => {
                let _ = reply.send(self.handle_add_token(token).await);
            }
            UserMsg::RemoveToken { login_provider, name, reply } => {
                let _ = reply.send(self.handle_remove_token(&login_provider, &name).await);
            }
        }
    }
}

// ─── Handle (client-facing API) ───

/// Handle to one user entity actor
///
/// Cheap to clone; the actor behind it is activated on first call.
#[derive(Clone)]
pub struct UserHandle {
    runtime: Arc<ActorRuntime>,
    address: ActorAddress,
}

impl UserHandle {
    pub(crate) fn new(runtime: Arc<ActorRuntime>, address: ActorAddress) -> Self {
        Self { runtime, address }
    }

    pub fn id(&self) -> &str {
        &self.address.actor_id
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<Result<T>>) -> UserMsg,
    ) -> Result<T> {
        let runtime = &self.runtime;
        let address = &self.address;
        runtime
            .users
            .call(
                address,
                || {
                    UserActor::new(
                        address.clone(),
                        Arc::clone(runtime.state_store()),
                        runtime.indices().clone(),
                    )
                },
                request,
            )
            .await
    }

    pub async fn exists(&self) -> Result<bool> {
        self.call(|reply| UserMsg::Exists { reply }).await
    }

    /// `Ok(false)` if the user already exists; nothing is changed then
    pub async fn create(&self, record: UserRecord) -> Result<bool> {
        self.call(|reply| UserMsg::Create { record, reply }).await
    }

    pub async fn find(&self) -> Result<Option<UserRecord>> {
        self.call(|reply| UserMsg::Find { reply }).await
    }

    pub async fn update(&self, record: UserRecord) -> Result<()> {
        self.call(|reply| UserMsg::Update { record, reply }).await
    }

    /// Idempotent
    pub async fn delete(&self) -> Result<()> {
        self.call(|reply| UserMsg::Delete { reply }).await
    }

    pub async fn get_claims(&self) -> Result<Vec<ClaimEntry>> {
        self.call(|reply| UserMsg::GetClaims { reply }).await
    }

    pub async fn add_claims(&self, claims: Vec<ClaimEntry>) -> Result<()> {
        self.call(|reply| UserMsg::AddClaims { claims, reply }).await
    }

    pub async fn remove_claims(&self, claims: Vec<ClaimEntry>) -> Result<()> {
        self.call(|reply| UserMsg::RemoveClaims { claims, reply }).await
    }

    pub async fn replace_claim(&self, old: ClaimEntry, new: ClaimEntry) -> Result<()> {
        self.call(|reply| UserMsg::ReplaceClaim { old, new, reply }).await
    }

    pub async fn get_logins(&self) -> Result<Vec<LoginEntry>> {
        self.call(|reply| UserMsg::GetLogins { reply }).await
    }

    pub async fn add_login(&self, login: LoginEntry) -> Result<()> {
        self.call(|reply| UserMsg::AddLogin { login, reply }).await
    }

    pub async fn remove_login(&self, login_provider: &str, provider_key: &str) -> Result<()> {
        let (login_provider, provider_key) = (login_provider.to_string(), provider_key.to_string());
        self.call(|reply| UserMsg::RemoveLogin { login_provider, provider_key, reply })
            .await
    }

    pub async fn find_login(
        &self,
        login_provider: &str,
        provider_key: &str,
    ) -> Result<Option<LoginEntry>> {
        let (login_provider, provider_key) = (login_provider.to_string(), provider_key.to_string());
        self.call(|reply| UserMsg::FindLogin { login_provider, provider_key, reply })
            .await
    }

    pub async fn get_token(&self, login_provider: &str, name: &str) -> Result<Option<String>> {
        let (login_provider, name) = (login_provider.to_string(), name.to_string());
        self.call(|reply| UserMsg::GetToken { login_provider, name, reply })
            .await
    }

    pub async fn add_token(&self, token: TokenEntry) -> Result<()> {
        self.call(|reply| UserMsg::AddToken { token, reply }).await
    }

    pub async fn remove_token(&self, login_provider: &str, name: &str) -> Result<()> {
        let (login_provider, name) = (login_provider.to_string(), name.to_string());
        self.call(|reply| UserMsg::RemoveToken { login_provider, name, reply })
            .await
    }
}
