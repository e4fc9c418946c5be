//! Shared test helpers
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use polarway_identity::{
    ActorRuntime, ActorType, IdentityError, IdentityStoreConfig, InMemoryStateStore, Result,
    StateKey, StateStore,
};

/// Install a test subscriber once; `RUST_LOG` overrides the default level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> IdentityStoreConfig {
    IdentityStoreConfig::new("/tmp/polarway-identity-unused")
}

pub fn in_memory_runtime() -> Arc<ActorRuntime> {
    init_tracing();
    ActorRuntime::in_memory(test_config())
}

/// In-memory store whose saves and removes can fail per actor type
#[derive(Default)]
pub struct FailingStateStore {
    inner: InMemoryStateStore,
    fail_saves_for: Mutex<Option<ActorType>>,
    fail_removes_for: Mutex<Option<ActorType>>,
}

impl FailingStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail both saves and removes for `actor_type`
    pub fn fail_writes_for(&self, actor_type: Option<ActorType>) {
        self.fail_saves_for(actor_type);
        self.fail_removes_for(actor_type);
    }

    pub fn fail_saves_for(&self, actor_type: Option<ActorType>) {
        *self.fail_saves_for.lock().unwrap() = actor_type;
    }

    pub fn fail_removes_for(&self, actor_type: Option<ActorType>) {
        *self.fail_removes_for.lock().unwrap() = actor_type;
    }

    fn check(rule: &Mutex<Option<ActorType>>, key: &StateKey, op: &str) -> Result<()> {
        if *rule.lock().unwrap() == Some(key.actor_type) {
            return Err(IdentityError::InfrastructureUnavailable(format!(
                "injected {op} failure for {}",
                key.actor_type
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FailingStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<String>> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &StateKey, value: String) -> Result<()> {
        Self::check(&self.fail_saves_for, key, "save")?;
        self.inner.save(key, value).await
    }

    async fn remove(&self, key: &StateKey) -> Result<()> {
        Self::check(&self.fail_removes_for, key, "remove")?;
        self.inner.remove(key).await
    }
}

/// In-memory store that answers every load after a fixed delay
pub struct SlowStateStore {
    inner: InMemoryStateStore,
    delay: Duration,
}

impl SlowStateStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryStateStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl StateStore for SlowStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<String>> {
        let value = self.inner.load(key).await?;
        tokio::time::sleep(self.delay).await;
        Ok(value)
    }

    async fn save(&self, key: &StateKey, value: String) -> Result<()> {
        self.inner.save(key, value).await
    }

    async fn remove(&self, key: &StateKey) -> Result<()> {
        self.inner.remove(key).await
    }
}
