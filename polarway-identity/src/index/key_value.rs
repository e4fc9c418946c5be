//! KeyValueActor — one key mapped to one id
//!
//! The key is the actor id itself (e.g. a normalized email); the state is
//! the id it resolves to. `set` overwrites without checking: callers that
//! need uniqueness look the key up first.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::runtime::ids::{ActorAddress, VALUE_STATE_NAME};
use crate::runtime::Actor;
use crate::state::{load_json, save_json, StateKey, StateStore};

use super::IndexRegistry;

// ─── Actor Messages ───

pub(crate) enum KeyValueMsg {
    Set {
        value: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Get {
        reply: oneshot::Sender<Result<Option<String>>>,
    },
    Remove {
        reply: oneshot::Sender<Result<()>>,
    },
}

// ─── Actor ───

pub(crate) struct KeyValueActor {
    address: ActorAddress,
    key: StateKey,
    store: Arc<dyn StateStore>,
    /// `None` until first load
    cache: Option<Option<String>>,
}

impl KeyValueActor {
    pub(crate) fn new(address: ActorAddress, store: Arc<dyn StateStore>) -> Self {
        let key = StateKey::new(&address, VALUE_STATE_NAME);
        Self {
            address,
            key,
            store,
            cache: None,
        }
    }

    async fn value(&mut self) -> Result<Option<String>> {
        if let Some(cached) = &self.cache {
            return Ok(cached.clone());
        }
        let loaded: Option<String> = load_json(self.store.as_ref(), &self.key).await?;
        self.cache = Some(loaded.clone());
        Ok(loaded)
    }

    async fn handle_set(&mut self, value: String) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &value).await?;
        self.cache = Some(Some(value));
        Ok(())
    }

    async fn handle_remove(&mut self) -> Result<()> {
        if self.value().await?.is_some() {
            self.store.remove(&self.key).await?;
        }
        self.cache = Some(None);
        Ok(())
    }
}

#[async_trait]
impl Actor for KeyValueActor {
    type Msg = KeyValueMsg;

    fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn handle(&mut self, msg: KeyValueMsg) {
        match msg {
            KeyValueMsg::Set { value, reply } => {
                let _ = reply.send(self.handle_set(value).await);
            }
            KeyValueMsg::Get { reply } => {
                let _ = reply.send(self.value().await);
            }
            KeyValueMsg::Remove { reply } => {
                let _ = reply.send(self.handle_remove().await);
            }
        }
    }
}

// ─── Handle (client-facing API) ───

/// Handle to one key-value index actor
#[derive(Clone)]
pub struct KeyValueHandle {
    registry: Arc<IndexRegistry>,
    address: ActorAddress,
}

impl KeyValueHandle {
    pub(crate) fn new(registry: Arc<IndexRegistry>, address: ActorAddress) -> Self {
        Self { registry, address }
    }

    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<Result<T>>) -> KeyValueMsg,
    ) -> Result<T> {
        let store = Arc::clone(&self.registry.store);
        let address = &self.address;
        self.registry
            .key_values
            .call(
                address,
                || KeyValueActor::new(address.clone(), Arc::clone(&store)),
                request,
            )
            .await
    }

    /// Bind this key to `value`, replacing any previous binding
    pub async fn set(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.call(|reply| KeyValueMsg::Set { value, reply }).await
    }

    /// The id bound to this key, if any
    pub async fn get(&self) -> Result<Option<String>> {
        self.call(|reply| KeyValueMsg::Get { reply }).await
    }

    /// Unbind this key; unbinding an unbound key succeeds
    pub async fn remove(&self) -> Result<()> {
        self.call(|reply| KeyValueMsg::Remove { reply }).await
    }
}
