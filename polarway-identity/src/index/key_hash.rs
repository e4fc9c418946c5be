//! KeyHashActor — one key mapped to a set of ids
//!
//! Backs both the "all users" / "all roles" collections and multi-valued
//! indices such as claim → user ids.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::runtime::ids::{ActorAddress, VALUES_STATE_NAME};
use crate::runtime::Actor;
use crate::state::{load_json, save_json, StateKey, StateStore};

use super::IndexRegistry;

// ─── Actor Messages ───

pub(crate) enum KeyHashMsg {
    Add {
        value: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    Remove {
        value: String,
        reply: oneshot::Sender<Result<()>>,
    },
    All {
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
}

// ─── Actor ───

pub(crate) struct KeyHashActor {
    address: ActorAddress,
    key: StateKey,
    store: Arc<dyn StateStore>,
    cache: Option<BTreeSet<String>>,
}

impl KeyHashActor {
    pub(crate) fn new(address: ActorAddress, store: Arc<dyn StateStore>) -> Self {
        let key = StateKey::new(&address, VALUES_STATE_NAME);
        Self {
            address,
            key,
            store,
            cache: None,
        }
    }

    async fn values(&mut self) -> Result<&mut BTreeSet<String>> {
        if self.cache.is_none() {
            let loaded: Option<BTreeSet<String>> =
                load_json(self.store.as_ref(), &self.key).await?;
            self.cache = Some(loaded.unwrap_or_default());
        }
        Ok(self.cache.get_or_insert_with(BTreeSet::new))
    }

    async fn handle_add(&mut self, value: String) -> Result<bool> {
        let mut next = self.values().await?.clone();
        if !next.insert(value) {
            return Ok(false);
        }
        self.commit(next).await?;
        Ok(true)
    }

    async fn handle_remove(&mut self, value: String) -> Result<()> {
        let mut next = self.values().await?.clone();
        if !next.remove(&value) {
            return Ok(());
        }
        self.commit(next).await
    }

    /// Persist `next`, then make it the cached view. An emptied set drops
    /// its state entry entirely.
    async fn commit(&mut self, next: BTreeSet<String>) -> Result<()> {
        if next.is_empty() {
            self.store.remove(&self.key).await?;
        } else {
            save_json(self.store.as_ref(), &self.key, &next).await?;
        }
        self.cache = Some(next);
        Ok(())
    }
}

#[async_trait]
impl Actor for KeyHashActor {
    type Msg = KeyHashMsg;

    fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn handle(&mut self, msg: KeyHashMsg) {
        match msg {
            KeyHashMsg::Add { value, reply } => {
                let _ = reply.send(self.handle_add(value).await);
            }
            KeyHashMsg::Remove { value, reply } => {
                let _ = reply.send(self.handle_remove(value).await);
            }
            KeyHashMsg::All { reply } => {
                let result = self.values().await.map(|v| v.iter().cloned().collect());
                let _ = reply.send(result);
            }
        }
    }
}

// ─── Handle (client-facing API) ───

/// Handle to one key-hash index actor
#[derive(Clone)]
pub struct KeyHashHandle {
    registry: Arc<IndexRegistry>,
    address: ActorAddress,
}

impl KeyHashHandle {
    pub(crate) fn new(registry: Arc<IndexRegistry>, address: ActorAddress) -> Self {
        Self { registry, address }
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<Result<T>>) -> KeyHashMsg,
    ) -> Result<T> {
        let store = Arc::clone(&self.registry.store);
        let address = &self.address;
        self.registry
            .key_hashes
            .call(
                address,
                || KeyHashActor::new(address.clone(), Arc::clone(&store)),
                request,
            )
            .await
    }

    /// Insert `value`; returns `false` if it was already present
    pub async fn add(&self, value: impl Into<String>) -> Result<bool> {
        let value = value.into();
        self.call(|reply| KeyHashMsg::Add { value, reply }).await
    }

    /// Remove `value` if present
    pub async fn remove(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.call(|reply| KeyHashMsg::Remove { value, reply }).await
    }

    /// Every value in the set, sorted
    pub async fn all(&self) -> Result<Vec<String>> {
        self.call(|reply| KeyHashMsg::All { reply }).await
    }
}
