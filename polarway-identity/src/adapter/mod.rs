//! Lookup façade — framework-shaped stores over the actor runtime

mod partition;
mod role_store;
mod traits;
mod user_store;

pub use partition::UserPartitionService;
pub use role_store::ActorRoleStore;
pub use traits::{RoleClaimStore, RoleStore, UserClaimStore, UserLoginStore, UserStore, UserTokenStore};
pub use user_store::ActorUserStore;

use crate::error::{IdentityError, Result};
use crate::index::KeyValueHandle;

/// `DuplicateKey` if the index binds its key to an id other than `owner`
///
/// Check-then-act: two concurrent writers with the same key on different
/// ids can both pass, and the index keeps the last one.
async fn ensure_unbound(index: &KeyValueHandle, owner: &str, what: &str) -> Result<()> {
    match index.get().await? {
        Some(bound) if bound != owner => Err(IdentityError::DuplicateKey(format!(
            "{what} '{}' belongs to '{bound}'",
            index.address().actor_id
        ))),
        _ => Ok(()),
    }
}
