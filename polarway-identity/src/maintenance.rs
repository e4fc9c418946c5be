//! Maintenance scheduler for the actor state table
//!
//! Every state save commits a new tiny file, so the table needs:
//! - Periodic compaction (merge small files)
//! - Vacuum (remove files no longer referenced, including deleted users' state)

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::Result;
use crate::schema;
use crate::store::DeltaStore;

/// Background maintenance scheduler
pub struct MaintenanceScheduler {
    store: Arc<DeltaStore>,
    handles: Vec<JoinHandle<()>>,
}

impl MaintenanceScheduler {
    /// Create a new scheduler tied to a DeltaStore
    pub fn new(store: Arc<DeltaStore>) -> Self {
        Self {
            store,
            handles: Vec::new(),
        }
    }

    /// Start compaction and vacuum at the configured intervals
    pub fn start(&mut self) {
        let config = self.store.config();
        let (compaction, vacuum) = (config.compaction_interval, config.vacuum_interval);
        self.start_compaction(compaction);
        self.start_vacuum(vacuum);

        info!(?compaction, ?vacuum, "Maintenance scheduler started");
    }

    /// Start periodic compaction for all tables
    pub fn start_compaction(&mut self, interval: Duration) {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for table_def in schema::all_tables() {
                    match store.compact(table_def.name).await {
                        Ok(m) => {
                            if m.files_removed > 0 {
                                info!(
                                    table = table_def.name,
                                    added = m.files_added,
                                    removed = m.files_removed,
                                    "Compaction done"
                                );
                            }
                        }
                        Err(e) => error!(table = table_def.name, error = ?e, "Compaction failed"),
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Start periodic vacuum
    pub fn start_vacuum(&mut self, interval: Duration) {
        let store = Arc::clone(&self.store);
        let retention_hours = store.config().vacuum_retention_hours;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for table_def in schema::all_tables() {
                    match store.vacuum(table_def.name, retention_hours, false).await {
                        Ok(m) => {
                            if m.files_deleted > 0 {
                                info!(table = table_def.name, deleted = m.files_deleted, "Vacuum done");
                            }
                        }
                        Err(e) => error!(table = table_def.name, error = ?e, "Vacuum failed"),
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Number of running background tasks
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Run a one-shot maintenance cycle (useful for CLI or tests)
    pub async fn run_once(store: &DeltaStore) -> Result<()> {
        info!("Running one-shot maintenance cycle");

        for table_def in schema::all_tables() {
            store.compact(table_def.name).await?;
        }

        let retention = store.config().vacuum_retention_hours;
        for table_def in schema::all_tables() {
            store.vacuum(table_def.name, retention, false).await?;
        }

        info!("Maintenance cycle complete");
        Ok(())
    }

    /// Stop all background tasks
    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Maintenance scheduler stopped");
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
