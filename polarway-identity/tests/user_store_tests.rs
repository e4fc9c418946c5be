//! ActorUserStore integration tests

mod common;

use std::sync::Arc;

use polarway_identity::{
    ActorRuntime, ActorUserStore, ClaimEntry, IdentityError, LoginEntry, TokenEntry,
    UserClaimStore, UserLoginStore, UserRecord, UserStore, UserTokenStore,
};

use common::{in_memory_runtime, init_tracing, test_config};

fn store() -> ActorUserStore {
    ActorUserStore::new(in_memory_runtime())
}

#[tokio::test]
async fn test_find_by_name_before_and_after_delete() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "alice@example.com"))
        .await
        .unwrap();

    let found = users.find_by_name("ALICE").await.unwrap().unwrap();
    assert_eq!(found.id, "u1");
    assert_eq!(found.email, "alice@example.com");

    users.delete_user("u1").await.unwrap();
    assert_eq!(users.find_by_name("ALICE").await.unwrap(), None);
    assert_eq!(users.find_by_id("u1").await.unwrap(), None);
}

#[tokio::test]
async fn test_find_by_email_uses_normalized_key() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", " Alice@Example.com"))
        .await
        .unwrap();

    assert!(users.find_by_email("ALICE@EXAMPLE.COM").await.unwrap().is_some());
    assert!(users.find_by_email("alice@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "a@x"))
        .await
        .unwrap();

    let err = users
        .create_user(UserRecord::new("u2", "ALICE", "b@x"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
    assert_eq!(users.find_by_id("u2").await.unwrap(), None);
    assert_eq!(users.find_by_email("B@X").await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_by_default() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "shared@x"))
        .await
        .unwrap();

    let err = users
        .create_user(UserRecord::new("u2", "bob", "SHARED@x"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
}

#[tokio::test]
async fn test_shared_email_allowed_when_not_unique() {
    init_tracing();
    let runtime = ActorRuntime::in_memory(test_config().with_require_unique_email(false));
    let users = ActorUserStore::new(runtime);

    users
        .create_user(UserRecord::new("u1", "alice", "shared@x"))
        .await
        .unwrap();
    users
        .create_user(UserRecord::new("u2", "bob", "shared@x"))
        .await
        .unwrap();

    // Last writer owns the email index entry
    let found = users.find_by_email("SHARED@X").await.unwrap().unwrap();
    assert_eq!(found.id, "u2");
}

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "a@x"))
        .await
        .unwrap();

    let err = users
        .create_user(UserRecord::new("u1", "bob", "b@x"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
    assert_eq!(users.find_by_id("u1").await.unwrap().unwrap().user_name, "alice");
}

#[tokio::test]
async fn test_update_to_taken_name_is_rejected() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "a@x"))
        .await
        .unwrap();
    let mut bob = UserRecord::new("u2", "bob", "b@x");
    users.create_user(bob.clone()).await.unwrap();

    bob.set_user_name("Alice");
    let err = users.update_user(bob).await.unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
    assert_eq!(users.find_by_name("BOB").await.unwrap().unwrap().id, "u2");
}

#[tokio::test]
async fn test_update_keeping_own_name_succeeds() {
    let users = store();
    let mut alice = UserRecord::new("u1", "alice", "a@x");
    users.create_user(alice.clone()).await.unwrap();

    alice.email_confirmed = true;
    users.update_user(alice).await.unwrap();
    assert!(users.find_by_name("ALICE").await.unwrap().unwrap().email_confirmed);
}

#[tokio::test]
async fn test_users_lists_every_user() {
    let users = store();
    for (id, name) in [("u1", "alice"), ("u2", "bob"), ("u3", "carol")] {
        users
            .create_user(UserRecord::new(id, name, format!("{name}@x")))
            .await
            .unwrap();
    }
    users.delete_user("u2").await.unwrap();

    let mut ids: Vec<_> = users.users().await.unwrap().into_iter().map(|u| u.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["u1", "u3"]);
}

#[tokio::test]
async fn test_stale_index_entry_resolves_to_none() {
    let runtime = in_memory_runtime();
    let users = ActorUserStore::new(Arc::clone(&runtime));

    runtime.indices().user_name("GHOST").set("u404").await.unwrap();
    runtime.indices().all_users().add("u404").await.unwrap();

    assert_eq!(users.find_by_name("GHOST").await.unwrap(), None);
    assert!(users.users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_users_for_claim() {
    let users = store();
    let admin = ClaimEntry::new("role", "admin");
    for id in ["u1", "u2", "u3"] {
        users
            .create_user(UserRecord::new(id, id, format!("{id}@x")))
            .await
            .unwrap();
    }
    users.add_claims("u1", vec![admin.clone()]).await.unwrap();
    users.add_claims("u3", vec![admin.clone()]).await.unwrap();

    let mut ids: Vec<_> = users
        .get_users_for_claim(&admin)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["u1", "u3"]);

    users.delete_user("u1").await.unwrap();
    let holders = users.get_users_for_claim(&admin).await.unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].id, "u3");
}

#[tokio::test]
async fn test_find_by_login() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "a@x"))
        .await
        .unwrap();
    users
        .add_login("u1", LoginEntry::new("GitHub", "gh-42"))
        .await
        .unwrap();

    let found = users.find_by_login("GitHub", "gh-42").await.unwrap().unwrap();
    assert_eq!(found.id, "u1");
    assert!(users
        .find_user_login("u1", "GitHub", "gh-42")
        .await
        .unwrap()
        .is_some());
    assert_eq!(users.find_by_login("GitHub", "other").await.unwrap(), None);

    users.remove_login("u1", "GitHub", "gh-42").await.unwrap();
    assert_eq!(users.find_by_login("GitHub", "gh-42").await.unwrap(), None);
    assert!(users.get_logins("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_held_by_another_user_is_rejected() {
    let users = store();
    for (id, name) in [("u1", "alice"), ("u2", "bob")] {
        users
            .create_user(UserRecord::new(id, name, format!("{name}@x")))
            .await
            .unwrap();
    }
    users
        .add_login("u1", LoginEntry::new("GitHub", "gh-42"))
        .await
        .unwrap();

    let err = users
        .add_login("u2", LoginEntry::new("GitHub", "gh-42"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
    assert!(users.get_logins("u2").await.unwrap().is_empty());

    // Re-adding to the holder is allowed
    users
        .add_login("u1", LoginEntry::new("GitHub", "gh-42"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_operations() {
    let users = store();
    users
        .create_user(UserRecord::new("u1", "alice", "a@x"))
        .await
        .unwrap();

    users
        .add_token("u1", TokenEntry::new("[AspNetUserStore]", "AuthenticatorKey", "k1"))
        .await
        .unwrap();
    assert_eq!(
        users
            .get_token("u1", "[AspNetUserStore]", "AuthenticatorKey")
            .await
            .unwrap()
            .as_deref(),
        Some("k1")
    );

    users
        .remove_token("u1", "[AspNetUserStore]", "AuthenticatorKey")
        .await
        .unwrap();
    assert_eq!(
        users
            .get_token("u1", "[AspNetUserStore]", "AuthenticatorKey")
            .await
            .unwrap(),
        None
    );

    let err = users
        .add_token("ghost", TokenEntry::new("p", "n", "v"))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::NotFound(_)));
}
