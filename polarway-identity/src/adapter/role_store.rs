//! ActorRoleStore — role capabilities composed from actor calls

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::error::{IdentityError, Result};
use crate::role::RoleRecord;
use crate::runtime::ActorRuntime;
use crate::user::{present, ClaimEntry};

use super::ensure_unbound;
use super::traits::{RoleClaimStore, RoleStore};

/// Role store over an [`ActorRuntime`]
#[derive(Clone)]
pub struct ActorRoleStore {
    runtime: Arc<ActorRuntime>,
}

impl ActorRoleStore {
    pub fn new(runtime: Arc<ActorRuntime>) -> Self {
        Self { runtime }
    }

    async fn ensure_unique(&self, role: &RoleRecord) -> Result<()> {
        if let Some(name) = present(&role.normalized_name) {
            ensure_unbound(&self.runtime.indices().role_name(name), &role.id, "role name").await?;
        }
        Ok(())
    }

    async fn find_all(&self, role_ids: Vec<String>) -> Result<Vec<RoleRecord>> {
        let lookups = role_ids.into_iter().map(|id| {
            let handle = self.runtime.role(id);
            async move { handle.find().await }
        });
        let mut roles = Vec::new();
        for found in join_all(lookups).await {
            if let Some(role) = found? {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}

#[async_trait]
impl RoleStore for ActorRoleStore {
    async fn create_role(&self, role: RoleRecord) -> Result<()> {
        self.ensure_unique(&role).await?;
        let id = role.id.clone();
        if !self.runtime.role(id.as_str()).create(role).await? {
            return Err(IdentityError::DuplicateKey(format!("role id '{id}'")));
        }
        Ok(())
    }

    async fn update_role(&self, role: RoleRecord) -> Result<()> {
        self.ensure_unique(&role).await?;
        self.runtime.role(role.id.as_str()).update(role).await
    }

    async fn delete_role(&self, role_id: &str) -> Result<()> {
        self.runtime.role(role_id).delete().await
    }

    async fn find_role_by_id(&self, role_id: &str) -> Result<Option<RoleRecord>> {
        self.runtime.role(role_id).find().await
    }

    async fn find_role_by_name(&self, normalized_name: &str) -> Result<Option<RoleRecord>> {
        let index = self.runtime.indices().role_name(normalized_name);
        let Some(role_id) = index.get().await? else {
            return Ok(None);
        };
        let role = self.runtime.role(role_id.as_str()).find().await?;
        if role.is_none() {
            warn!(index = %index.address(), role_id = %role_id, "Index entry points at a missing role");
        }
        Ok(role)
    }

    async fn roles(&self) -> Result<Vec<RoleRecord>> {
        let ids = self.runtime.indices().all_roles().all().await?;
        self.find_all(ids).await
    }
}

#[async_trait]
impl RoleClaimStore for ActorRoleStore {
    async fn get_role_claims(&self, role_id: &str) -> Result<Vec<ClaimEntry>> {
        self.runtime.role(role_id).get_claims().await
    }

    async fn add_role_claims(&self, role_id: &str, claims: Vec<ClaimEntry>) -> Result<()> {
        self.runtime.role(role_id).add_claims(claims).await
    }

    async fn remove_role_claims(&self, role_id: &str, claims: Vec<ClaimEntry>) -> Result<()> {
        self.runtime.role(role_id).remove_claims(claims).await
    }

    async fn get_roles_for_claim(&self, claim: &ClaimEntry) -> Result<Vec<RoleRecord>> {
        let ids = self
            .runtime
            .indices()
            .role_claim(&claim.claim_type, &claim.claim_value)
            .all()
            .await?;
        self.find_all(ids).await
    }
}
