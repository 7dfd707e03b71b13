//! End-to-end authorization scenarios against the in-memory and SQLite
//! stores.

use rolegate::core::CoreError;
use rolegate::perms::PermsError;
use rolegate::store::{EntityStore, MemoryStore, SqliteStore};
use rolegate::{AuthorizerConfig, Authorizer, AuthzError, CacheState, SubjectId};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// admin <- editor, with publish-post attached to editor.
async fn editorial<S: EntityStore + 'static>(store: S) -> Authorizer<S> {
    init_tracing();
    let authz = Authorizer::new(store);
    authz.create_role("admin", None).await.unwrap();
    authz
        .create_role("editor", Some("admin".into()))
        .await
        .unwrap();
    authz.create_permission("publish-post", None, None).await.unwrap();
    authz.attach_permission("editor", "publish-post").await.unwrap();
    authz
}

#[tokio::test]
async fn test_editor_holds_admin_through_hierarchy() {
    let authz = editorial(MemoryStore::new()).await;
    let alice = SubjectId::new(1);
    authz.assign_role(alice, "editor").await.unwrap();

    assert!(authz.has_role(alice, "admin").await.unwrap());
    assert!(authz.has_role(alice, "editor").await.unwrap());
    assert!(authz.has_all_roles(alice, ["admin", "editor"]).await.unwrap());
}

#[tokio::test]
async fn test_permission_via_role_without_direct_grant() {
    let authz = editorial(MemoryStore::new()).await;
    let alice = SubjectId::new(1);
    authz.assign_role(alice, "editor").await.unwrap();

    assert!(authz.has_permission_to(alice, "publish-post").await.unwrap());
    assert!(authz.get_direct_permissions(alice).await.unwrap().is_empty());
    assert!(!authz.has_direct_permission(alice, "publish-post").await.unwrap());
}

#[tokio::test]
async fn test_unknown_permission_lookup_fails() {
    let authz = editorial(MemoryStore::new()).await;

    let err = authz.find_permission("does-not-exist").await.unwrap_err();
    assert!(matches!(
        err,
        AuthzError::Core(CoreError::PermissionDoesNotExist(ref name)) if name == "does-not-exist"
    ));

    let err = authz
        .has_permission_to(SubjectId::new(1), "does-not-exist")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_permission_update_empties_cache() {
    let authz = editorial(MemoryStore::new()).await;
    authz.warm().await.unwrap();
    assert_eq!(authz.cache().state(), CacheState::Populated);

    let mut permission = authz.find_permission("publish-post").await.unwrap();
    permission.name = "publish-article".into();
    authz.store().update_permission(&permission).await.unwrap();
    assert_eq!(authz.cache().state(), CacheState::Empty);

    let catalogue = authz.get_permissions().await.unwrap();
    assert!(catalogue.find_permission_by_name("publish-article").is_ok());
    assert_eq!(authz.cache().state(), CacheState::Populated);
}

#[tokio::test]
async fn test_admin_does_not_inherit_from_editor() {
    let authz = editorial(MemoryStore::new()).await;
    let bob = SubjectId::new(2);
    authz.assign_role(bob, "admin").await.unwrap();

    assert!(!authz.has_role(bob, "editor").await.unwrap());
    assert!(!authz.has_permission_to(bob, "publish-post").await.unwrap());
    assert!(!authz.has_all_roles(bob, ["admin", "editor"]).await.unwrap());
    assert!(authz.has_any_role(bob, ["editor", "admin"]).await.unwrap());
}

#[tokio::test]
async fn test_direct_grants_and_revocation() {
    let authz = editorial(MemoryStore::new()).await;
    authz.create_permission("edit-settings", None, None).await.unwrap();
    let carol = SubjectId::new(3);

    authz
        .give_permission_to(carol, ["edit-settings", "publish-post"])
        .await
        .unwrap();
    assert!(authz.has_direct_permission(carol, "publish-post").await.unwrap());

    let names: Vec<String> = authz
        .get_direct_permissions(carol)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["edit-settings", "publish-post"]);

    assert!(authz.revoke_permission_to(carol, "publish-post").await.unwrap());
    assert!(!authz.has_permission_to(carol, "publish-post").await.unwrap());
    assert!(authz
        .has_any_permission(carol, ["publish-post", "edit-settings"])
        .await
        .unwrap());
}

#[tokio::test]
async fn test_effective_permissions_include_ancestors() {
    let authz = editorial(MemoryStore::new()).await;
    authz.create_permission("manage-users", None, None).await.unwrap();
    authz.attach_permission("admin", "manage-users").await.unwrap();
    let alice = SubjectId::new(1);
    authz.assign_role(alice, "editor").await.unwrap();

    let via_roles: Vec<String> = authz
        .get_permissions_via_roles(alice)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(via_roles, vec!["publish-post"]);

    let effective: Vec<String> = authz
        .get_effective_permissions(alice)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(effective, vec!["publish-post", "manage-users"]);
}

#[tokio::test]
async fn test_role_scoped_queries() {
    let authz = editorial(MemoryStore::new()).await;
    authz.create_permission("manage-users", None, None).await.unwrap();
    authz.attach_permission("admin", "manage-users").await.unwrap();
    authz
        .create_role("author", Some("editor".into()))
        .await
        .unwrap();

    assert!(!authz
        .role_has_permission_to("author", "publish-post")
        .await
        .unwrap());
    assert!(authz
        .parents_have_permission_to("author", "publish-post")
        .await
        .unwrap());

    let parents: Vec<String> = authz
        .get_parent_roles("author")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(parents, vec!["editor", "admin"]);

    let groups = authz.parent_permissions("author").await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0][0].name, "publish-post");
    assert_eq!(groups[1][0].name, "manage-users");

    let flat = authz.parent_permissions_flat("author").await.unwrap();
    assert_eq!(flat.len(), 2);

    let err = authz.get_parent_roles("ghost").await.unwrap_err();
    assert!(matches!(err, AuthzError::Core(CoreError::RoleDoesNotExist(_))));
}

#[tokio::test]
async fn test_cyclic_data_fails_fast() {
    let authz = editorial(MemoryStore::new()).await;
    let alice = SubjectId::new(1);
    authz.assign_role(alice, "editor").await.unwrap();

    // Written through the store so the cycle check is bypassed.
    let mut admin = authz.find_role("admin").await.unwrap();
    let editor = authz.find_role("editor").await.unwrap();
    admin.parent_id = Some(editor.id);
    authz.store().update_role(&admin).await.unwrap();

    let err = authz.has_role(alice, "admin").await.unwrap_err();
    assert!(err.is_cyclic());

    let err = authz.get_parent_roles("editor").await.unwrap_err();
    assert!(err.is_cyclic());
}

#[tokio::test]
async fn test_depth_limit_is_enforced() {
    init_tracing();
    let authz = Authorizer::with_config(
        MemoryStore::new(),
        AuthorizerConfig::default().with_max_depth(2),
    );
    authz.create_role("a", None).await.unwrap();
    authz.create_role("b", Some("a".into())).await.unwrap();
    authz.create_role("c", Some("b".into())).await.unwrap();
    authz.create_role("d", Some("c".into())).await.unwrap();

    let subject = SubjectId::new(1);
    authz.assign_role(subject, "c").await.unwrap();
    assert!(authz.has_role(subject, "a").await.unwrap());

    authz.sync_roles(subject, "d").await.unwrap();
    let err = authz.has_role(subject, "a").await.unwrap_err();
    assert!(matches!(
        err,
        AuthzError::Perms(PermsError::HierarchyTooDeep { limit: 2, .. })
    ));
}

#[tokio::test]
async fn test_sync_roles_replaces_membership() {
    let authz = editorial(MemoryStore::new()).await;
    authz.create_role("guest", None).await.unwrap();
    let alice = SubjectId::new(1);
    authz.assign_role(alice, ["admin", "guest"]).await.unwrap();

    authz.sync_roles(alice, ["editor"]).await.unwrap();
    assert!(!authz.has_role(alice, "guest").await.unwrap());
    assert!(authz.has_role(alice, "editor").await.unwrap());

    // Unknown names leave the current roles alone.
    assert!(authz.sync_roles(alice, ["ghost"]).await.is_err());
    assert!(authz.has_role(alice, "editor").await.unwrap());

    assert!(authz.remove_role(alice, "editor").await.unwrap());
    assert!(!authz.has_role(alice, "admin").await.unwrap());
}

#[tokio::test]
async fn test_subjects_with_role() {
    let authz = editorial(MemoryStore::new()).await;
    authz.assign_role(SubjectId::new(5), "editor").await.unwrap();
    authz.assign_role(SubjectId::new(2), "admin").await.unwrap();

    assert_eq!(
        authz.subjects_with_role("editor").await.unwrap(),
        vec![SubjectId::new(5)]
    );
    assert_eq!(
        authz.subjects_with_role(["admin", "editor"]).await.unwrap(),
        vec![SubjectId::new(2), SubjectId::new(5)]
    );
}

#[tokio::test]
async fn test_classified_permissions() {
    let authz = editorial(MemoryStore::new()).await;
    authz.create_action("edit").await.unwrap();
    authz.create_object("post").await.unwrap();

    let permission = authz
        .create_permission("edit-post", Some("edit"), Some("post"))
        .await
        .unwrap();
    let edit = authz.find_action("edit").await.unwrap();
    assert_eq!(permission.action_id, edit.id);

    let err = authz
        .create_permission("drop-post", Some("drop"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Core(CoreError::ActionDoesNotExist(_))));

    authz.rename_object("post", "article").await.unwrap();
    assert!(authz.find_object("article").await.is_ok());

    authz.delete_action("edit").await.unwrap();
    let permission = authz.find_permission("edit-post").await.unwrap();
    assert!(permission.action_id.is_none());
}

#[tokio::test]
async fn test_rename_and_delete_role() {
    let authz = editorial(MemoryStore::new()).await;
    let alice = SubjectId::new(1);
    authz.assign_role(alice, "editor").await.unwrap();

    authz.rename_role("editor", "chief-editor").await.unwrap();
    assert!(authz.has_role(alice, "chief-editor").await.unwrap());

    authz.delete_role("admin").await.unwrap();
    let chief = authz.find_role("chief-editor").await.unwrap();
    assert!(chief.is_root());
    assert!(!authz.has_role(alice, "admin").await.unwrap());
}

#[tokio::test]
async fn test_sqlite_authorizer_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolegate.db");
    let alice = SubjectId::new(1);

    {
        let authz = editorial(SqliteStore::open(&path).unwrap()).await;
        authz.assign_role(alice, "editor").await.unwrap();
        assert!(authz.has_permission_to(alice, "publish-post").await.unwrap());
    }

    let authz = Authorizer::new(SqliteStore::open(&path).unwrap());
    assert_eq!(authz.cache().state(), CacheState::Empty);
    assert!(authz.has_role(alice, "admin").await.unwrap());
    assert!(authz.has_permission_to(alice, "publish-post").await.unwrap());
}
