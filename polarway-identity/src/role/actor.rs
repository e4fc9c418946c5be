//! RoleActor — single-writer owner of one role's state
//!
//! Same protocol as the user actor, restricted to the role-name index,
//! the `AllRoles` collection and the role-claim index.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::{IdentityError, Result};
use crate::index::IndexServices;
use crate::runtime::ids::{ActorAddress, ROLE_STATE_NAME};
use crate::runtime::{Actor, ActorRuntime};
use crate::state::{load_json, save_json, StateKey, StateStore};
use crate::user::{present, ClaimEntry};

use super::types::{RoleRecord, RoleState};

// ─── Actor Messages ───

pub(crate) enum RoleMsg {
    Exists {
        reply: oneshot::Sender<Result<bool>>,
    },
    Create {
        record: RoleRecord,
        reply: oneshot::Sender<Result<bool>>,
    },
    Find {
        reply: oneshot::Sender<Result<Option<RoleRecord>>>,
    },
    Update {
        record: RoleRecord,
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
}

// ─── Actor ───

pub(crate) struct RoleActor {
    address: ActorAddress,
    key: StateKey,
    store: Arc<dyn StateStore>,
    indices: IndexServices,
    loaded: bool,
    state: Option<RoleState>,
}

impl RoleActor {
    pub(crate) fn new(
        address: ActorAddress,
        store: Arc<dyn StateStore>,
        indices: IndexServices,
    ) -> Self {
        let key = StateKey::new(&address, ROLE_STATE_NAME);
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

    async fn load(&mut self) -> Result<Option<&RoleState>> {
        if !self.loaded {
            self.state = load_json(self.store.as_ref(), &self.key).await?;
            self.loaded = true;
        }
        Ok(self.state.as_ref())
    }

    async fn active(&mut self) -> Result<RoleState> {
        if let Some(state) = self.load().await? {
            return Ok(state.clone());
        }
        Err(IdentityError::role_not_found(self.id()))
    }

    async fn persist(&mut self, next: RoleState) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &next).await?;
        self.state = Some(next);
        Ok(())
    }

    fn check_id(&self, record: &RoleRecord) -> Result<()> {
        if record.id != self.id() {
            return Err(IdentityError::IdMismatch {
                actor: self.id().to_string(),
                record: record.id.clone(),
            });
        }
        Ok(())
    }

    async fn handle_create(&mut self, record: RoleRecord) -> Result<bool> {
        self.check_id(&record)?;
        if self.load().await?.is_some() {
            debug!(role_id = %self.id(), "Create ignored, role already exists");
            return Ok(false);
        }

        let name = record.normalized_name.clone();
        self.persist(RoleState::new(record)).await?;

        let id = self.id().to_string();
        self.indices.all_roles().add(id.as_str()).await?;
        if let Some(name) = present(&name) {
            self.indices.role_name(name).set(id.as_str()).await?;
        }

        info!(role_id = %id, "Role created");
        Ok(true)
    }

    async fn handle_update(&mut self, record: RoleRecord) -> Result<()> {
        self.check_id(&record)?;
        let mut next = self.active().await?;
        let previous = std::mem::replace(&mut next.role, record);
        let new_name = next.role.normalized_name.clone();
        self.persist(next).await?;

        if previous.normalized_name != new_name {
            let id = self.id().to_string();
            if let Some(old) = present(&previous.normalized_name) {
                self.indices.role_name(old).remove().await?;
            }
            if let Some(new) = present(&new_name) {
                self.indices.role_name(new).set(id.as_str()).await?;
            }
            debug!(role_id = %id, "Role name index moved");
        }
        Ok(())
    }

    async fn handle_delete(&mut self) -> Result<()> {
        let state = match self.load().await? {
            Some(state) => state.clone(),
            None => return Ok(()),
        };
        let id = self.id().to_string();

        if let Some(name) = present(&state.role.normalized_name) {
            self.indices.role_name(name).remove().await?;
        }
        for claim in &state.claims {
            self.indices
                .role_claim(&claim.claim_type, &claim.claim_value)
                .remove(id.as_str())
                .await?;
        }

        self.store.remove(&self.key).await?;
        self.state = None;

        self.indices.all_roles().remove(id.as_str()).await?;
        info!(role_id = %id, "Role deleted");
        Ok(())
    }

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
                .role_claim(&claim.claim_type, &claim.claim_value)
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
                .role_claim(&claim.claim_type, &claim.claim_value)
                .remove(id.as_str())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Actor for RoleActor {
    type Msg = RoleMsg;

    fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn handle(&mut self, msg: RoleMsg) {
        match msg {
            RoleMsg::Exists { reply } => {
                let _ = reply.send(self.load().await.map(|s| s.is_some()));
            }
            RoleMsg::Create { record, reply } => {
                let _ = reply.send(self.handle_create(record).await);
            }
            RoleMsg::Find { reply } => {
                let _ = reply.send(self.load().await.map(|s| s.map(|s| s.role.clone())));
            }
            RoleMsg::Update { record, reply } => {
                let _ = reply.send(self.handle_update(record).await);
            }
            RoleMsg::Delete { reply } => {
                let _ = reply.send(self.handle_delete().await);
            }
            RoleMsg::GetClaims { reply } => {
                let _ = reply.send(
                    self.load()
                        .await
                        .map(|s| s.map(|s| s.claims.clone()).unwrap_or_default()),
                );
            }
            RoleMsg::AddClaims { claims, reply } => {
                let _ = reply.send(self.handle_add_claims(claims).await);
            }
            RoleMsg::RemoveClaims { claims, reply } => {
                let _ = reply.send(self.handle_remove_claims(claims).await);
            }
        }
    }
}

// ─── Handle (client-facing API) ───

/// Handle to one role entity actor
#[derive(Clone)]
pub struct RoleHandle {
    runtime: Arc<ActorRuntime>,
    address: ActorAddress,
}

impl RoleHandle {
    pub(crate) fn new(runtime: Arc<ActorRuntime>, address: ActorAddress) -> Self {
        Self { runtime, address }
    }

    pub fn id(&self) -> &str {
        &self.address.actor_id
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<Result<T>>) -> RoleMsg,
    ) -> Result<T> {
        let runtime = &self.runtime;
        let address = &self.address;
        runtime
            .roles
            .call(
                address,
                || {
                    RoleActor::new(
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
        self.call(|reply| RoleMsg::Exists { reply }).await
    }

    /// `Ok(false)` if the role already exists
    pub async fn create(&self, record: RoleRecord) -> Result<bool> {
        self.call(|reply| RoleMsg::Create { record, reply }).await
    }

    pub async fn find(&self) -> Result<Option<RoleRecord>> {
        self.call(|reply| RoleMsg::Find { reply }).await
    }

    pub async fn update(&self, record: RoleRecord) -> Result<()> {
        self.call(|reply| RoleMsg::Update { record, reply }).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.call(|reply| RoleMsg::Delete { reply }).await
    }

    pub async fn get_claims(&self) -> Result<Vec<ClaimEntry>> {
        self.call(|reply| RoleMsg::GetClaims { reply }).await
    }

    pub async fn add_claims(&self, claims: Vec<ClaimEntry>) -> Result<()> {
        self.call(|reply| RoleMsg::AddClaims { claims, reply }).await
    }

    pub async fn remove_claims(&self, claims: Vec<ClaimEntry>) -> Result<()> {
        self.call(|reply| RoleMsg::RemoveClaims { claims, reply }).await
    }
}
