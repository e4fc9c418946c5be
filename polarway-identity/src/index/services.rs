//! Named index services over the generic index actors

use std::sync::Arc;

use crate::config::IdentityStoreConfig;
use crate::runtime::ids::{
    claim_index_id, login_index_id, token_index_id, ActorAddress, ActorType, ALL_ROLES_ID,
    ALL_USERS_ID,
};
use crate::state::StateStore;

use super::{IndexRegistry, KeyHashHandle, KeyValueHandle};

/// Typed access to every user and role index
///
/// | service       | kind      | actor id                  |
/// |---------------|-----------|---------------------------|
/// | `all_users`   | key-hash  | `AllUsers`                |
/// | `user_email`  | key-value | normalized email          |
/// | `user_name`   | key-value | normalized user name      |
/// | `user_login`  | key-value | `provider:key`            |
/// | `user_claim`  | key-hash  | `type:value`              |
/// | `user_token`  | key-value | `provider:name`           |
/// | `all_roles`   | key-hash  | `AllRoles`                |
/// | `role_name`   | key-value | normalized role name      |
/// | `role_claim`  | key-hash  | `type:value`              |
#[derive(Clone)]
pub struct IndexServices {
    registry: Arc<IndexRegistry>,
}

impl IndexServices {
    pub(crate) fn new(config: &IdentityStoreConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            registry: Arc::new(IndexRegistry::new(config, store)),
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.registry.active()
    }

    pub(crate) fn clear(&self) {
        self.registry.clear();
    }

    fn key_value(&self, actor_type: ActorType, id: String) -> KeyValueHandle {
        KeyValueHandle::new(
            Arc::clone(&self.registry),
            ActorAddress::new(actor_type, id),
        )
    }

    fn key_hash(&self, actor_type: ActorType, id: String) -> KeyHashHandle {
        KeyHashHandle::new(
            Arc::clone(&self.registry),
            ActorAddress::new(actor_type, id),
        )
    }

    // ─── Users ───

    pub fn all_users(&self) -> KeyHashHandle {
        self.key_hash(ActorType::UserIdentities, ALL_USERS_ID.to_string())
    }

    pub fn user_email(&self, normalized_email: &str) -> KeyValueHandle {
        self.key_value(ActorType::UserEmailIndex, normalized_email.to_string())
    }

    pub fn user_name(&self, normalized_user_name: &str) -> KeyValueHandle {
        self.key_value(ActorType::UserNameIndex, normalized_user_name.to_string())
    }

    pub fn user_login(&self, login_provider: &str, provider_key: &str) -> KeyValueHandle {
        self.key_value(
            ActorType::UserLoginIndex,
            login_index_id(login_provider, provider_key),
        )
    }

    pub fn user_claim(&self, claim_type: &str, claim_value: &str) -> KeyHashHandle {
        self.key_hash(
            ActorType::UserClaimIndex,
            claim_index_id(claim_type, claim_value),
        )
    }

    /// Reverse lookup of a token to its owner. Token reads go through the
    /// owning user, so nothing in the store maintains this index.
    pub fn user_token(&self, login_provider: &str, name: &str) -> KeyValueHandle {
        self.key_value(ActorType::UserTokenIndex, token_index_id(login_provider, name))
    }

    // ─── Roles ───

    pub fn all_roles(&self) -> KeyHashHandle {
        self.key_hash(ActorType::RoleIdentities, ALL_ROLES_ID.to_string())
    }

    pub fn role_name(&self, normalized_name: &str) -> KeyValueHandle {
        self.key_value(ActorType::RoleNameIndex, normalized_name.to_string())
    }

    pub fn role_claim(&self, claim_type: &str, claim_value: &str) -> KeyHashHandle {
        self.key_hash(
            ActorType::RoleClaimIndex,
            claim_index_id(claim_type, claim_value),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;
    use crate::state::InMemoryStateStore;

    fn services() -> (IndexServices, Arc<InMemoryStateStore>) {
        let store = Arc::new(InMemoryStateStore::new());
        let services = IndexServices::new(&IdentityStoreConfig::new("/tmp"), store.clone());
        (services, store)
    }

    #[tokio::test]
    async fn test_key_value_set_get_remove() {
        let (indices, store) = services();
        let email = indices.user_email("ALICE@EXAMPLE.COM");

        assert_eq!(email.get().await.unwrap(), None);
        email.set("u1").await.unwrap();
        assert_eq!(email.get().await.unwrap().as_deref(), Some("u1"));

        // Overwrite is unconditional
        email.set("u2").await.unwrap();
        assert_eq!(email.get().await.unwrap().as_deref(), Some("u2"));

        email.remove().await.unwrap();
        email.remove().await.unwrap();
        assert_eq!(email.get().await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_same_key_different_index_types_are_independent() {
        let (indices, _) = services();
        indices.user_name("BOB").set("u1").await.unwrap();
        indices.role_name("BOB").set("r1").await.unwrap();

        assert_eq!(indices.user_name("BOB").get().await.unwrap().as_deref(), Some("u1"));
        assert_eq!(indices.role_name("BOB").get().await.unwrap().as_deref(), Some("r1"));
        assert_eq!(indices.user_email("BOB").get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_key_hash_add_is_idempotent() {
        let (indices, _) = services();
        let all = indices.all_users();

        assert!(all.add("u2").await.unwrap());
        assert!(all.add("u1").await.unwrap());
        assert!(!all.add("u1").await.unwrap());
        assert_eq!(all.all().await.unwrap(), vec!["u1".to_string(), "u2".to_string()]);

        all.remove("u1").await.unwrap();
        all.remove("missing").await.unwrap();
        assert_eq!(all.all().await.unwrap(), vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn test_state_survives_deactivation() {
        let (indices, _) = services();
        indices.user_login("Google", "g-1").set("u1").await.unwrap();
        indices.user_claim("role", "admin").add("u1").await.unwrap();

        indices.clear();
        assert_eq!(indices.active(), 0);

        assert_eq!(
            indices.user_login("Google", "g-1").get().await.unwrap().as_deref(),
            Some("u1")
        );
        assert_eq!(
            indices.user_claim("role", "admin").all().await.unwrap(),
            vec!["u1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_token_index_is_addressed_by_provider_and_name() {
        let (indices, _) = services();
        let token = indices.user_token("Microsoft", "refresh_token");
        assert_eq!(token.address().actor_id, "Microsoft:refresh_token");

        token.set("u1").await.unwrap();
        assert_eq!(
            indices.user_token("Microsoft", "refresh_token").get().await.unwrap().as_deref(),
            Some("u1")
        );
    }

    #[tokio::test]
    async fn test_blank_key_is_invalid() {
        let (indices, _) = services();
        let err = indices.user_email("").get().await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidArgument(_)));
    }
}
