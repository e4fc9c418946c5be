//! ActorRoleStore integration tests

mod common;

use std::sync::Arc;

use polarway_identity::{
    ActorRoleStore, ClaimEntry, IdentityError, RoleClaimStore, RoleRecord, RoleStore,
};

use common::in_memory_runtime;

fn store() -> ActorRoleStore {
    ActorRoleStore::new(in_memory_runtime())
}

#[tokio::test]
async fn test_role_crud() {
    let roles = store();
    let admin = RoleRecord::new("r1", "Admin");

    roles.create_role(admin.clone()).await.unwrap();
    assert_eq!(roles.find_role_by_id("r1").await.unwrap(), Some(admin.clone()));
    assert_eq!(roles.find_role_by_name("ADMIN").await.unwrap(), Some(admin));

    roles.delete_role("r1").await.unwrap();
    assert_eq!(roles.find_role_by_id("r1").await.unwrap(), None);
    assert_eq!(roles.find_role_by_name("ADMIN").await.unwrap(), None);

    // Unknown role delete is a no-op
    roles.delete_role("r1").await.unwrap();
}

#[tokio::test]
async fn test_rename_moves_name_index() {
    let roles = store();
    let mut role = RoleRecord::new("r1", "Reader");
    roles.create_role(role.clone()).await.unwrap();

    role.set_name("Viewer");
    roles.update_role(role).await.unwrap();

    assert_eq!(roles.find_role_by_name("READER").await.unwrap(), None);
    assert_eq!(roles.find_role_by_name("VIEWER").await.unwrap().unwrap().id, "r1");
}

#[tokio::test]
async fn test_update_unknown_role_is_not_found() {
    let roles = store();
    let err = roles.update_role(RoleRecord::new("r9", "Ghost")).await.unwrap_err();
    assert!(matches!(err, IdentityError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_role_name_and_id() {
    let roles = store();
    roles.create_role(RoleRecord::new("r1", "Admin")).await.unwrap();

    let err = roles.create_role(RoleRecord::new("r2", "admin")).await.unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));

    let err = roles.create_role(RoleRecord::new("r1", "Other")).await.unwrap_err();
    assert!(matches!(err, IdentityError::DuplicateKey(_)));
    assert_eq!(roles.find_role_by_name("OTHER").await.unwrap(), None);
}

#[tokio::test]
async fn test_roles_lists_every_role() {
    let roles = store();
    for (id, name) in [("r1", "Admin"), ("r2", "Reader"), ("r3", "Writer")] {
        roles.create_role(RoleRecord::new(id, name)).await.unwrap();
    }
    roles.delete_role("r3").await.unwrap();

    let mut names: Vec<_> = roles.roles().await.unwrap().into_iter().map(|r| r.name).collect();
    names.sort();
    assert_eq!(names, vec!["Admin", "Reader"]);
}

#[tokio::test]
async fn test_role_claims() {
    let roles = store();
    roles.create_role(RoleRecord::new("r1", "Admin")).await.unwrap();

    let manage = ClaimEntry::new("permission", "users.manage");
    let read = ClaimEntry::new("permission", "users.read");
    roles
        .add_role_claims("r1", vec![manage.clone(), read.clone(), manage.clone()])
        .await
        .unwrap();
    assert_eq!(roles.get_role_claims("r1").await.unwrap().len(), 2);

    roles.remove_role_claims("r1", vec![manage.clone()]).await.unwrap();
    assert_eq!(roles.get_role_claims("r1").await.unwrap(), vec![read]);
    assert!(roles.get_roles_for_claim(&manage).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_roles_for_claim() {
    let runtime = in_memory_runtime();
    let roles = ActorRoleStore::new(Arc::clone(&runtime));
    let read = ClaimEntry::new("permission", "reports.read");

    for (id, name) in [("r1", "Admin"), ("r2", "Auditor"), ("r3", "Guest")] {
        roles.create_role(RoleRecord::new(id, name)).await.unwrap();
    }
    roles.add_role_claims("r1", vec![read.clone()]).await.unwrap();
    roles.add_role_claims("r2", vec![read.clone()]).await.unwrap();

    let mut ids: Vec<_> = roles
        .get_roles_for_claim(&read)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["r1", "r2"]);

    // Deleting a role clears its claim index entries
    roles.delete_role("r1").await.unwrap();
    assert_eq!(
        runtime
            .indices()
            .role_claim("permission", "reports.read")
            .all()
            .await
            .unwrap(),
        vec!["r2".to_string()]
    );
}

#[tokio::test]
async fn test_role_claims_on_unknown_role() {
    let roles = store();
    assert!(roles.get_role_claims("ghost").await.unwrap().is_empty());

    let err = roles
        .add_role_claims("ghost", vec![ClaimEntry::new("a", "b")])
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::NotFound(_)));
}

#[tokio::test]
async fn test_roles_and_users_do_not_share_indices() {
    let runtime = in_memory_runtime();
    let roles = ActorRoleStore::new(Arc::clone(&runtime));
    roles.create_role(RoleRecord::new("x1", "Admin")).await.unwrap();

    assert_eq!(runtime.indices().user_name("ADMIN").get().await.unwrap(), None);
    assert!(runtime.indices().all_users().all().await.unwrap().is_empty());
    assert_eq!(runtime.indices().all_roles().all().await.unwrap(), vec!["x1".to_string()]);
}
