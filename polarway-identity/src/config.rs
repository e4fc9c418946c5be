//! Configuration for Polarway Identity

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{IdentityError, Result};

/// Default idle deactivation timeout
pub const DEFAULT_ACTOR_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Identity store configuration
#[derive(Debug, Clone)]
pub struct IdentityStoreConfig {
    /// Root path for the Delta state table
    pub base_path: PathBuf,

    /// Bounded mailbox size of every actor
    pub mailbox_capacity: usize,

    /// Deactivate an actor after this long without calls (`None` = never,
    /// default: 60 minutes)
    pub actor_idle_timeout: Option<Duration>,

    /// Reject a create/update whose normalized email is bound to another user
    pub require_unique_email: bool,

    /// Vacuum retention in hours (default: 168 = 7 days)
    pub vacuum_retention_hours: u64,

    /// Interval between background compactions of the state table
    pub compaction_interval: Duration,

    /// Interval between background vacuums of the state table
    pub vacuum_interval: Duration,
}

impl IdentityStoreConfig {
    /// Create config with sensible defaults
    ///
    /// # Arguments
    /// * `base_path` - Root directory for Delta tables.
    ///   Structure created:
    ///   ```text
    ///   base_path/
    ///   └── actor_state/     (Delta table, one row per actor state entry)
    ///   ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            mailbox_capacity: 256,
            actor_idle_timeout: Some(DEFAULT_ACTOR_IDLE_TIMEOUT),
            require_unique_email: true,
            vacuum_retention_hours: 168, // 7 days
            compaction_interval: Duration::from_secs(6 * 3600),
            vacuum_interval: Duration::from_secs(24 * 3600),
        }
    }

    /// Build a config from `POLARWAY_IDENTITY_*` environment variables
    ///
    /// - `POLARWAY_IDENTITY_PATH` (default `./identity`)
    /// - `POLARWAY_IDENTITY_MAILBOX_CAPACITY`
    /// - `POLARWAY_IDENTITY_IDLE_TIMEOUT_SECS` (`0` keeps actors forever)
    /// - `POLARWAY_IDENTITY_UNIQUE_EMAIL` (`true` / `false`)
    pub fn from_env() -> Result<Self> {
        let base_path =
            std::env::var("POLARWAY_IDENTITY_PATH").unwrap_or_else(|_| "./identity".to_string());
        let mut config = Self::new(base_path);

        if let Ok(raw) = std::env::var("POLARWAY_IDENTITY_MAILBOX_CAPACITY") {
            let capacity = raw.parse::<usize>().map_err(|e| {
                IdentityError::Config(format!("POLARWAY_IDENTITY_MAILBOX_CAPACITY: {e}"))
            })?;
            config = config.with_mailbox_capacity(capacity);
        }
        if let Ok(raw) = std::env::var("POLARWAY_IDENTITY_IDLE_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|e| {
                IdentityError::Config(format!("POLARWAY_IDENTITY_IDLE_TIMEOUT_SECS: {e}"))
            })?;
            config = match secs {
                0 => config.without_actor_idle_timeout(),
                secs => config.with_actor_idle_timeout(Duration::from_secs(secs)),
            };
        }
        if let Ok(raw) = std::env::var("POLARWAY_IDENTITY_UNIQUE_EMAIL") {
            let unique = raw.parse::<bool>().map_err(|e| {
                IdentityError::Config(format!("POLARWAY_IDENTITY_UNIQUE_EMAIL: {e}"))
            })?;
            config = config.with_require_unique_email(unique);
        }
        Ok(config)
    }

    /// Override mailbox capacity (clamped to at least 1)
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Override the idle deactivation timeout
    pub fn with_actor_idle_timeout(mut self, timeout: Duration) -> Self {
        self.actor_idle_timeout = Some(timeout);
        self
    }

    /// Keep every activated actor until shutdown
    pub fn without_actor_idle_timeout(mut self) -> Self {
        self.actor_idle_timeout = None;
        self
    }

    /// Override email uniqueness
    pub fn with_require_unique_email(mut self, unique: bool) -> Self {
        self.require_unique_email = unique;
        self
    }

    /// Override vacuum retention
    pub fn with_vacuum_retention_hours(mut self, hours: u64) -> Self {
        self.vacuum_retention_hours = hours;
        self
    }

    /// Override maintenance intervals
    pub fn with_maintenance_intervals(mut self, compaction: Duration, vacuum: Duration) -> Self {
        self.compaction_interval = compaction;
        self.vacuum_interval = vacuum;
        self
    }

    /// Get path for a specific table
    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.base_path.join(table_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = IdentityStoreConfig::new("/tmp/test_identity");
        assert_eq!(cfg.mailbox_capacity, 256);
        assert_eq!(cfg.vacuum_retention_hours, 168);
        assert_eq!(cfg.actor_idle_timeout, Some(Duration::from_secs(3600)));
        assert!(cfg.require_unique_email);
        assert_eq!(
            cfg.table_path("actor_state"),
            PathBuf::from("/tmp/test_identity/actor_state")
        );
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = IdentityStoreConfig::new("/data")
            .with_mailbox_capacity(0)
            .with_actor_idle_timeout(Duration::from_secs(30))
            .with_require_unique_email(false)
            .with_vacuum_retention_hours(24);

        assert_eq!(cfg.mailbox_capacity, 1);
        assert_eq!(cfg.actor_idle_timeout, Some(Duration::from_secs(30)));
        assert!(!cfg.require_unique_email);
        assert_eq!(cfg.vacuum_retention_hours, 24);

        let cfg = cfg.without_actor_idle_timeout();
        assert!(cfg.actor_idle_timeout.is_none());
    }
}
