//! Durable actor state
//!
//! Each actor owns a handful of named state entries, each one a
//! `serde_json` blob. Only the owning actor reads or writes its entries;
//! the store itself never interprets them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::runtime::ids::{ActorAddress, ActorType};

/// Address of one named state entry of one actor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub actor_type: ActorType,
    pub actor_id: String,
    pub name: &'static str,
}

impl StateKey {
    pub fn new(address: &ActorAddress, name: &'static str) -> Self {
        Self {
            actor_type: address.actor_type,
            actor_id: address.actor_id.clone(),
            name,
        }
    }
}

/// Persistence backend for actor state
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Serialized blob of the entry, `None` if never saved or removed
    async fn load(&self, key: &StateKey) -> Result<Option<String>>;

    /// Replace the entry
    async fn save(&self, key: &StateKey, value: String) -> Result<()>;

    /// Drop the entry; removing an absent entry succeeds
    async fn remove(&self, key: &StateKey) -> Result<()>;
}

/// Load and deserialize a state entry
pub(crate) async fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &StateKey,
) -> Result<Option<T>> {
    match store.load(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and save a state entry
pub(crate) async fn save_json<T: Serialize>(
    store: &dyn StateStore,
    key: &StateKey,
    value: &T,
) -> Result<()> {
    store.save(key, serde_json::to_string(value)?).await
}

// ─── In-memory ───

/// Process-local state store, lost on restart
#[derive(Default)]
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<StateKey, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, key: &StateKey) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &StateKey, value: String) -> Result<()> {
        self.entries.write().await.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &StateKey) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ─── Delta Lake ───

#[cfg(feature = "delta")]
pub use delta::DeltaStateStore;

#[cfg(feature = "delta")]
mod delta {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{SecondsFormat, Utc};
    use deltalake::arrow::array::{Array, ArrayRef, RecordBatch, StringArray};
    use deltalake::arrow::compute::cast;
    use deltalake::arrow::datatypes::DataType;
    use tokio::sync::Mutex;
    use tracing::{debug, info};

    use super::{StateKey, StateStore};
    use crate::config::IdentityStoreConfig;
    use crate::error::{IdentityError, Result};
    use crate::schema;
    use crate::store::DeltaStore;

    /// State store backed by the `actor_state` Delta table
    ///
    /// One row per state entry. A save deletes the previous row and appends
    /// the new one; both commits happen under a store-wide write lock, so
    /// concurrent saves of different actors never interleave.
    pub struct DeltaStateStore {
        store: Arc<DeltaStore>,
        write_lock: Mutex<()>,
    }

    impl DeltaStateStore {
        /// Open (or create) the state table under `config.base_path`
        pub async fn new(config: IdentityStoreConfig) -> Result<Self> {
            let store = Arc::new(DeltaStore::new(config).await?);
            Ok(Self::with_store(store))
        }

        /// Share an existing DeltaStore (e.g. with the maintenance scheduler)
        pub fn with_store(store: Arc<DeltaStore>) -> Self {
            info!("DeltaStateStore ready");
            Self {
                store,
                write_lock: Mutex::new(()),
            }
        }

        pub fn store(&self) -> &Arc<DeltaStore> {
            &self.store
        }

        fn predicate(key: &StateKey) -> String {
            format!(
                "actor_type = '{}' AND actor_id = '{}' AND state_name = '{}'",
                sql_literal(key.actor_type.as_str()),
                sql_literal(&key.actor_id),
                sql_literal(key.name),
            )
        }
    }

    /// Escape a value for use inside a single-quoted SQL literal
    fn sql_literal(value: &str) -> String {
        value.replace('\'', "''")
    }

    #[async_trait]
    impl StateStore for DeltaStateStore {
        async fn load(&self, key: &StateKey) -> Result<Option<String>> {
            let sql = format!(
                "SELECT state_json FROM t WHERE {} ORDER BY updated_at DESC LIMIT 1",
                Self::predicate(key)
            );
            let batches = self.store.sql(schema::TABLE_ACTOR_STATE, &sql).await?;

            for batch in &batches {
                if batch.num_rows() == 0 {
                    continue;
                }
                // DataFusion may hand strings back as Utf8View
                let column = cast(batch.column(0), &DataType::Utf8)?;
                let values = column
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| IdentityError::Internal("Schema error: state_json".into()))?;
                if values.is_null(0) {
                    return Ok(None);
                }
                return Ok(Some(values.value(0).to_string()));
            }
            Ok(None)
        }

        async fn save(&self, key: &StateKey, value: String) -> Result<()> {
            // Fixed-width UTC stamps order the same as strings and as instants
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
            let batch = RecordBatch::try_new(
                Arc::new(schema::actor_state_arrow_schema()),
                vec![
                    Arc::new(StringArray::from(vec![key.actor_type.as_str()])) as ArrayRef,
                    Arc::new(StringArray::from(vec![key.actor_id.as_str()])),
                    Arc::new(StringArray::from(vec![key.name])),
                    Arc::new(StringArray::from(vec![value.as_str()])),
                    Arc::new(StringArray::from(vec![now.as_str()])),
                ],
            )?;

            // Append before pruning: until the delete commits, `load` still
            // sees the new row as the newest one
            let _guard = self.write_lock.lock().await;
            let version = self.store.append(schema::TABLE_ACTOR_STATE, batch).await?;
            let pruned = self
                .store
                .delete(
                    schema::TABLE_ACTOR_STATE,
                    &format!("{} AND updated_at <> '{now}'", Self::predicate(key)),
                )
                .await?;
            debug!(
                actor_type = %key.actor_type,
                actor_id = %key.actor_id,
                state = key.name,
                version,
                pruned = pruned.num_deleted_rows,
                "State saved"
            );
            Ok(())
        }

        async fn remove(&self, key: &StateKey) -> Result<()> {
            let _guard = self.write_lock.lock().await;
            let metrics = self
                .store
                .delete(schema::TABLE_ACTOR_STATE, &Self::predicate(key))
                .await?;
            debug!(
                actor_type = %key.actor_type,
                actor_id = %key.actor_id,
                state = key.name,
                deleted = metrics.num_deleted_rows,
                "State removed"
            );
            Ok(())
        }
    }

}
