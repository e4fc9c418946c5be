//! Secondary indices — key-value and key-hash index actors
//!
//! Two generic actor kinds back every index. What distinguishes the email
//! index from the name index is only the `ActorType` half of the address,
//! so [`IndexServices`] hands out typed handles for each named index.

mod key_hash;
mod key_value;
mod services;

use std::sync::Arc;

use crate::config::IdentityStoreConfig;
use crate::runtime::Registry;
use crate::state::StateStore;

pub use key_hash::KeyHashHandle;
pub use key_value::KeyValueHandle;
pub use services::IndexServices;

use key_hash::KeyHashActor;
use key_value::KeyValueActor;

/// Activation tables for all index actors
pub(crate) struct IndexRegistry {
    store: Arc<dyn StateStore>,
    key_values: Registry<KeyValueActor>,
    key_hashes: Registry<KeyHashActor>,
}

impl IndexRegistry {
    fn new(config: &IdentityStoreConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            key_values: Registry::new(config),
            key_hashes: Registry::new(config),
        }
    }

    fn active(&self) -> usize {
        self.key_values.active() + self.key_hashes.active()
    }

    fn clear(&self) {
        self.key_values.clear();
        self.key_hashes.clear();
    }
}
