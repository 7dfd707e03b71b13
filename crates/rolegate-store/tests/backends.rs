//! Behaviour every EntityStore backend must share.
//!
//! Each scenario is written once against the trait and run against both the
//! in-memory and the SQLite store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rolegate_core::{ActionId, EntityKind, ObjectId, RoleId, SubjectId};
use rolegate_store::{
    ChangeEvent, ChangeObserver, EntityStore, MemoryStore, SqliteStore, StoreError,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<ChangeEvent>>);

impl Recorder {
    fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl ChangeObserver for Recorder {
    fn on_change(&self, event: &ChangeEvent) {
        self.0.lock().unwrap().push(*event);
    }
}

async fn role_delete_cascades<S: EntityStore>(store: S) {
    let admin = store.create_role("admin", None).await.unwrap();
    let editor = store.create_role("editor", Some(admin.id)).await.unwrap();
    let manage = store
        .create_permission("manage", ActionId::NONE, ObjectId::NONE)
        .await
        .unwrap();
    store.attach_permission(admin.id, manage.id).await.unwrap();
    store
        .assign_roles(SubjectId::new(1), &[admin.id, editor.id])
        .await
        .unwrap();

    store.delete_role(admin.id).await.unwrap();

    let editor = store.get_role(editor.id).await.unwrap().unwrap();
    assert!(editor.is_root());
    assert!(store.permission_roles(manage.id).await.unwrap().is_empty());
    assert_eq!(
        store.subject_roles(SubjectId::new(1)).await.unwrap(),
        vec![editor.id]
    );
    assert!(matches!(
        store.delete_role(admin.id).await,
        Err(StoreError::NotFound(_))
    ));
}

async fn classifier_delete_resets_permissions<S: EntityStore>(store: S) {
    let edit = store.create_action("edit").await.unwrap();
    let post = store.create_object("post").await.unwrap();
    let permission = store
        .create_permission("edit-post", edit.id, post.id)
        .await
        .unwrap();

    let catalogue = store.load_catalogue().await.unwrap();
    assert_eq!(catalogue.permissions_for_action(edit.id).len(), 1);
    assert_eq!(catalogue.permissions_for_object(post.id).len(), 1);

    store.delete_action(edit.id).await.unwrap();

    let permission = store.get_permission(permission.id).await.unwrap().unwrap();
    assert!(permission.action_id.is_none());
    assert_eq!(permission.object_id, post.id);
}

async fn unknown_classifier_is_rejected<S: EntityStore>(store: S) {
    let err = store
        .create_permission("edit-post", ActionId::new(9), ObjectId::NONE)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(store.find_permission_by_name("edit-post").await.unwrap().is_none());
}

async fn writes_publish_events<S: EntityStore>(store: S) {
    let recorder = Arc::new(Recorder::default());
    store.notifier().subscribe(&recorder);

    let role = store.create_role("editor", None).await.unwrap();
    let permission = store
        .create_permission("publish", ActionId::NONE, ObjectId::NONE)
        .await
        .unwrap();
    assert!(store.attach_permission(role.id, permission.id).await.unwrap());
    assert!(!store.attach_permission(role.id, permission.id).await.unwrap());
    store
        .assign_roles(SubjectId::new(3), &[role.id])
        .await
        .unwrap();
    store.delete_permission(permission.id).await.unwrap();

    let events = recorder.take();
    assert_eq!(
        events,
        vec![
            ChangeEvent::created(EntityKind::Role, role.id.get()),
            ChangeEvent::created(EntityKind::Permission, permission.id.get()),
            ChangeEvent::updated(EntityKind::Role, role.id.get()),
            ChangeEvent::updated(EntityKind::Subject, 3),
            ChangeEvent::deleted(EntityKind::Permission, permission.id.get()),
        ]
    );
}

async fn failed_writes_publish_nothing<S: EntityStore>(store: S) {
    store.create_role("admin", None).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    store.notifier().subscribe(&recorder);

    assert!(store.create_role("admin", None).await.is_err());
    assert!(store.create_role("", None).await.is_err());
    assert!(store.delete_object(ObjectId::new(77)).await.is_err());
    assert!(recorder.take().is_empty());
}

async fn assign_roles_is_all_or_nothing<S: EntityStore>(store: S) {
    let role = store.create_role("reader", None).await.unwrap();
    let subject = SubjectId::new(8);

    let err = store
        .assign_roles(subject, &[role.id, RoleId::new(404)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(store.subject_roles(subject).await.unwrap().is_empty());
}

async fn subject_queries<S: EntityStore>(store: S) {
    let a = store.create_role("a", None).await.unwrap();
    let b = store.create_role("b", None).await.unwrap();
    let c = store.create_role("c", None).await.unwrap();

    store.assign_roles(SubjectId::new(3), &[a.id, b.id]).await.unwrap();
    store.assign_roles(SubjectId::new(1), &[b.id]).await.unwrap();
    store.assign_roles(SubjectId::new(2), &[c.id]).await.unwrap();

    assert_eq!(
        store.subjects_with_roles(&[a.id, b.id]).await.unwrap(),
        vec![SubjectId::new(1), SubjectId::new(3)]
    );
    assert!(store.subjects_with_roles(&[]).await.unwrap().is_empty());
    assert_eq!(
        store.role_subjects(b.id).await.unwrap(),
        vec![SubjectId::new(1), SubjectId::new(3)]
    );

    assert!(store.remove_role(SubjectId::new(3), a.id).await.unwrap());
    assert!(!store.remove_role(SubjectId::new(3), a.id).await.unwrap());
    store.clear_roles(SubjectId::new(3)).await.unwrap();
    assert!(store.subject_roles(SubjectId::new(3)).await.unwrap().is_empty());
}

async fn direct_grants<S: EntityStore>(store: S) {
    let read = store
        .create_permission("read", ActionId::NONE, ObjectId::NONE)
        .await
        .unwrap();
    let write = store
        .create_permission("write", ActionId::NONE, ObjectId::NONE)
        .await
        .unwrap();
    let subject = SubjectId::new(4);

    assert!(store.grant_permission(subject, write.id).await.unwrap());
    assert!(store.grant_permission(subject, read.id).await.unwrap());
    assert_eq!(
        store.subject_permissions(subject).await.unwrap(),
        vec![write.id, read.id]
    );

    assert!(store.revoke_permission(subject, write.id).await.unwrap());
    assert!(!store.revoke_permission(subject, write.id).await.unwrap());
    assert_eq!(
        store.subject_permissions(subject).await.unwrap(),
        vec![read.id]
    );
}

async fn update_checks_names<S: EntityStore>(store: S) {
    let admin = store.create_role("admin", None).await.unwrap();
    let mut editor = store.create_role("editor", None).await.unwrap();

    editor.name = "admin".into();
    assert!(matches!(
        store.update_role(&editor).await,
        Err(StoreError::Duplicate(_))
    ));

    editor.name = "chief-editor".into();
    editor.parent_id = Some(admin.id);
    store.update_role(&editor).await.unwrap();

    let found = store.find_role_by_name("chief-editor").await.unwrap().unwrap();
    assert_eq!(found.parent_id, Some(admin.id));
    assert!(store.find_role_by_name("editor").await.unwrap().is_none());
}

macro_rules! backend_tests {
    ($backend:ident, $make:expr) => {
        mod $backend {
            use super::*;

            #[tokio::test]
            async fn test_role_delete_cascades() {
                role_delete_cascades($make).await;
            }

            #[tokio::test]
            async fn test_classifier_delete_resets_permissions() {
                classifier_delete_resets_permissions($make).await;
            }

            #[tokio::test]
            async fn test_unknown_classifier_is_rejected() {
                unknown_classifier_is_rejected($make).await;
            }

            #[tokio::test]
            async fn test_writes_publish_events() {
                writes_publish_events($make).await;
            }

            #[tokio::test]
            async fn test_failed_writes_publish_nothing() {
                failed_writes_publish_nothing($make).await;
            }

            #[tokio::test]
            async fn test_assign_roles_is_all_or_nothing() {
                assign_roles_is_all_or_nothing($make).await;
            }

            #[tokio::test]
            async fn test_subject_queries() {
                subject_queries($make).await;
            }

            #[tokio::test]
            async fn test_direct_grants() {
                direct_grants($make).await;
            }

            #[tokio::test]
            async fn test_update_checks_names() {
                update_checks_names($make).await;
            }
        }
    };
}

backend_tests!(memory, MemoryStore::new());
backend_tests!(sqlite, SqliteStore::open_memory().unwrap());

/// A write whose caller gives up while it waits on the file lock still
/// commits, and still tells observers once it does.
#[tokio::test]
async fn test_abandoned_sqlite_write_still_publishes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rolegate.db");
    let store = SqliteStore::open(&path).unwrap();
    let mut admin = store.create_role("admin", None).await.unwrap();

    let recorder = Arc::new(Recorder::default());
    store.notifier().subscribe(&recorder);

    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

    admin.name = "superuser".into();
    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), store.update_role(&admin)).await;
    assert!(abandoned.is_err());
    assert!(recorder.take().is_empty());

    holder.execute_batch("COMMIT").unwrap();

    let mut events = Vec::new();
    for _ in 0..200 {
        events.extend(recorder.take());
        if !events.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(
        events,
        vec![ChangeEvent::updated(EntityKind::Role, admin.id.get())]
    );
    assert!(store.find_role_by_name("superuser").await.unwrap().is_some());
}
