//! DeltaStore — storage layer built on delta-rs
//!
//! Owns the Delta tables under the configured base path and exposes the
//! handful of operations the durable actor state needs: append, predicate
//! delete, SQL reads and table maintenance.
//! All operations return `Result<T, IdentityError>` (railway programming).
//!
//! # Example
//!
//! ```rust,no_run
//! use polarway_identity::{DeltaStore, IdentityStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> polarway_identity::Result<()> {
//!     let store = DeltaStore::new(IdentityStoreConfig::new("/data/identity")).await?;
//!
//!     let rows = store
//!         .sql("actor_state", "SELECT actor_id FROM t WHERE actor_type = 'UserIdentity'")
//!         .await?;
//!     println!("{} batches", rows.len());
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use deltalake::arrow::array::RecordBatch;
use deltalake::kernel::StructField;
use deltalake::protocol::SaveMode;
use deltalake::writer::{DeltaWriter, RecordBatchWriter};
use deltalake::{open_table, DeltaTable};
use tracing::{debug, info};
use url::Url;

use crate::config::IdentityStoreConfig;
use crate::error::{IdentityError, Result};
use crate::schema;

/// Metrics returned by delete operations
#[derive(Debug, Clone)]
pub struct DeleteMetrics {
    pub num_deleted_rows: usize,
    pub new_version: i64,
}

/// Metrics returned by compaction
#[derive(Debug, Clone)]
pub struct CompactMetrics {
    pub files_added: usize,
    pub files_removed: usize,
    pub new_version: i64,
}

/// Metrics returned by vacuum operations
#[derive(Debug, Clone)]
pub struct VacuumMetrics {
    pub files_deleted: usize,
    pub dry_run: bool,
}

/// Delta Lake store — manages all tables under a base path
///
/// Thread-safe: can be shared across tokio tasks via `Arc<DeltaStore>`.
/// Writers are not serialized here; callers that need read-modify-write
/// semantics hold their own lock.
pub struct DeltaStore {
    config: IdentityStoreConfig,
}

impl DeltaStore {
    /// Create a new DeltaStore and initialize all tables
    ///
    /// ```text
    /// {base_path}/
    /// └── actor_state/    (one row per actor state entry)
    /// ```
    pub async fn new(config: IdentityStoreConfig) -> Result<Self> {
        let store = Self { config };
        store.init_all_tables().await?;
        info!(
            path = %store.config.base_path.display(),
            "Identity store initialized"
        );
        Ok(store)
    }

    /// Convert a table name to a `Url` pointing at the table directory
    fn table_url(&self, name: &str) -> Result<Url> {
        let path = self.config.table_path(name);
        Url::from_directory_path(&path).map_err(|_| {
            IdentityError::Config(format!("Invalid table path: {}", path.display()))
        })
    }

    /// Initialize all Delta tables (idempotent)
    async fn init_all_tables(&self) -> Result<()> {
        for table_def in schema::all_tables() {
            self.ensure_table(
                table_def.name,
                table_def.delta_fields,
                table_def.partition_columns,
            )
            .await?;
        }
        Ok(())
    }

    /// Create a Delta table if it doesn't exist
    pub async fn ensure_table(
        &self,
        name: &str,
        fields: Vec<StructField>,
        partition_columns: Vec<String>,
    ) -> Result<()> {
        let url = self.table_url(name)?;
        let path = self.config.table_path(name);

        match open_table(url.clone()).await {
            Ok(table) => {
                debug!(table = name, version = ?table.version(), "Table already exists");
                Ok(())
            }
            Err(_) => {
                std::fs::create_dir_all(&path)?;

                let table = DeltaTable::try_from_url(url).await?;
                let mut builder = table
                    .create()
                    .with_table_name(name)
                    .with_save_mode(SaveMode::Ignore)
                    .with_columns(fields);

                if !partition_columns.is_empty() {
                    builder = builder.with_partition_columns(partition_columns);
                }

                builder.await?;
                info!(table = name, "Created Delta table");
                Ok(())
            }
        }
    }

    // ─── Write Operations ───

    /// Append records to a table (ACID transaction)
    ///
    /// Returns the new table version after the write.
    pub async fn append(&self, table_name: &str, batch: RecordBatch) -> Result<i64> {
        let url = self.table_url(table_name)?;
        let mut table = open_table(url).await?;

        let mut writer = RecordBatchWriter::for_table(&table)?;
        writer.write(batch).await?;
        let version = writer.flush_and_commit(&mut table).await?;

        debug!(table = table_name, version, "Appended records");
        Ok(version as i64)
    }

    /// Delete rows matching a SQL predicate
    pub async fn delete(&self, table_name: &str, predicate: &str) -> Result<DeleteMetrics> {
        let url = self.table_url(table_name)?;
        let table = open_table(url).await?;

        let (result_table, metrics) = table.delete().with_predicate(predicate).await?;
        let version = result_table.version().unwrap_or(-1);

        debug!(
            table = table_name,
            deleted = metrics.num_deleted_rows,
            version,
            "Deleted records"
        );

        Ok(DeleteMetrics {
            num_deleted_rows: metrics.num_deleted_rows,
            new_version: version,
        })
    }

    // ─── Read Operations ───

    /// Full SQL query against a single table registered as `t`
    ///
    /// # Example
    /// ```rust,no_run
    /// # use polarway_identity::DeltaStore;
    /// # async fn example(store: &DeltaStore) -> polarway_identity::Result<()> {
    /// let per_type = store.sql(
    ///     "actor_state",
    ///     "SELECT actor_type, COUNT(*) AS n FROM t GROUP BY actor_type"
    /// ).await?;
    /// # Ok(()) }
    /// ```
    pub async fn sql(&self, table_name: &str, full_sql: &str) -> Result<Vec<RecordBatch>> {
        let url = self.table_url(table_name)?;
        let table = open_table(url).await?;
        let table_provider: Arc<dyn deltalake::datafusion::catalog::TableProvider> =
            Arc::new(table);

        let ctx = deltalake::datafusion::prelude::SessionContext::new();
        ctx.register_table("t", table_provider)?;

        let df = ctx.sql(full_sql).await?;
        let batches = df.collect().await?;

        debug!(table = table_name, batches = batches.len(), "Query executed");
        Ok(batches)
    }

    /// Get the current version of a table
    pub async fn version(&self, table_name: &str) -> Result<i64> {
        let url = self.table_url(table_name)?;
        let table = open_table(url).await?;
        Ok(table.version().unwrap_or(0))
    }

    // ─── Optimization ───

    /// Compact small files into larger ones
    ///
    /// Every state save is its own commit, so the state table accumulates
    /// one tiny file per write until compacted.
    pub async fn compact(&self, table_name: &str) -> Result<CompactMetrics> {
        let url = self.table_url(table_name)?;
        let table = open_table(url).await?;

        let (new_table, metrics) = table.optimize().await?;
        let version = new_table.version().unwrap_or(-1);

        info!(
            table = table_name,
            files_added = metrics.num_files_added,
            files_removed = metrics.num_files_removed,
            "Compaction complete"
        );

        Ok(CompactMetrics {
            files_added: metrics.num_files_added as usize,
            files_removed: metrics.num_files_removed as usize,
            new_version: version,
        })
    }

    /// Vacuum files no longer referenced by the Delta log
    ///
    /// With `retention_hours = 0`, immediately removes all unreferenced files,
    /// which also drops state of deleted users from older table versions.
    pub async fn vacuum(
        &self,
        table_name: &str,
        retention_hours: u64,
        dry_run: bool,
    ) -> Result<VacuumMetrics> {
        let url = self.table_url(table_name)?;
        let table = open_table(url).await?;

        let retention = chrono::Duration::hours(retention_hours as i64);

        let (_, metrics) = table
            .vacuum()
            .with_retention_period(retention)
            .with_enforce_retention_duration(retention_hours > 0)
            .with_dry_run(dry_run)
            .await?;

        info!(
            table = table_name,
            retention_hours,
            dry_run,
            files_deleted = metrics.files_deleted.len(),
            "Vacuum complete"
        );

        Ok(VacuumMetrics {
            files_deleted: metrics.files_deleted.len(),
            dry_run,
        })
    }

    /// Get a reference to the config
    pub fn config(&self) -> &IdentityStoreConfig {
        &self.config
    }
}
