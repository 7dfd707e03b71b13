//! In-memory implementation of the EntityStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use rolegate_core::{
    validate_name, Action, ActionId, Catalogue, EntityKind, Object, ObjectId, Permission,
    PermissionId, Role, RoleId, SubjectId,
};

use crate::error::{Result, StoreError};
use crate::events::{ChangeEvent, Notifier};
use crate::traits::EntityStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    notifier: Notifier,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    actions: BTreeMap<ActionId, Action>,
    objects: BTreeMap<ObjectId, Object>,

    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    subject_roles: BTreeSet<(SubjectId, RoleId)>,
    /// Direct grants per subject, in grant order.
    subject_permissions: BTreeMap<SubjectId, Vec<PermissionId>>,

    /// Last id handed out per kind. Ids are never reused.
    last_role_id: u64,
    last_permission_id: u64,
    last_action_id: u64,
    last_object_id: u64,
}

impl MemoryStoreInner {
    fn require_role(&self, id: RoleId) -> Result<()> {
        if self.roles.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("role {}", id)))
        }
    }

    fn require_permission(&self, id: PermissionId) -> Result<()> {
        if self.permissions.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("permission {}", id)))
        }
    }

    /// Check the action and object a permission is composed from.
    fn require_classifiers(&self, action: ActionId, object: ObjectId) -> Result<()> {
        if !action.is_none() && !self.actions.contains_key(&action) {
            return Err(StoreError::NotFound(format!("action {}", action)));
        }
        if !object.is_none() && !self.objects.contains_key(&object) {
            return Err(StoreError::NotFound(format!("object {}", object)));
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(StoreError::poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(StoreError::poisoned)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let inner = self.read()?;
        Ok(inner.roles.values().find(|r| r.name == name).cloned())
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let inner = self.read()?;
        Ok(inner.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn find_action_by_name(&self, name: &str) -> Result<Option<Action>> {
        let inner = self.read()?;
        Ok(inner.actions.values().find(|a| a.name == name).cloned())
    }

    async fn find_object_by_name(&self, name: &str) -> Result<Option<Object>> {
        let inner = self.read()?;
        Ok(inner.objects.values().find(|o| o.name == name).cloned())
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.read()?.permissions.get(&id).cloned())
    }

    async fn role_parent(&self, id: RoleId) -> Result<Option<Role>> {
        let inner = self.read()?;
        Ok(inner
            .roles
            .get(&id)
            .and_then(|role| role.parent_id)
            .and_then(|parent| inner.roles.get(&parent))
            .cloned())
    }

    async fn role_permissions(&self, role: RoleId) -> Result<Vec<PermissionId>> {
        let inner = self.read()?;
        Ok(inner
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, p)| *p)
            .collect())
    }

    async fn permission_roles(&self, permission: PermissionId) -> Result<Vec<RoleId>> {
        let inner = self.read()?;
        Ok(inner
            .role_permissions
            .iter()
            .filter(|(_, p)| *p == permission)
            .map(|(r, _)| *r)
            .collect())
    }

    async fn role_subjects(&self, role: RoleId) -> Result<Vec<SubjectId>> {
        let inner = self.read()?;
        Ok(inner
            .subject_roles
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(s, _)| *s)
            .collect())
    }

    async fn subject_roles(&self, subject: SubjectId) -> Result<Vec<RoleId>> {
        let inner = self.read()?;
        Ok(inner
            .subject_roles
            .iter()
            .filter(|(s, _)| *s == subject)
            .map(|(_, r)| *r)
            .collect())
    }

    async fn subject_permissions(&self, subject: SubjectId) -> Result<Vec<PermissionId>> {
        let inner = self.read()?;
        Ok(inner
            .subject_permissions
            .get(&subject)
            .cloned()
            .unwrap_or_default())
    }

    async fn subjects_with_roles(&self, roles: &[RoleId]) -> Result<Vec<SubjectId>> {
        let inner = self.read()?;
        let subjects: BTreeSet<SubjectId> = inner
            .subject_roles
            .iter()
            .filter(|(_, r)| roles.contains(r))
            .map(|(s, _)| *s)
            .collect();
        Ok(subjects.into_iter().collect())
    }

    async fn load_catalogue(&self) -> Result<Catalogue> {
        let inner = self.read()?;
        Ok(Catalogue::builder()
            .roles(inner.roles.values().cloned())
            .permissions(inner.permissions.values().cloned())
            .actions(inner.actions.values().cloned())
            .objects(inner.objects.values().cloned())
            .attachments(inner.role_permissions.iter().copied())
            .build())
    }

    async fn create_role(&self, name: &str, parent: Option<RoleId>) -> Result<Role> {
        validate_name(name)?;

        let role = {
            let mut inner = self.write()?;
            if inner.roles.values().any(|r| r.name == name) {
                return Err(StoreError::Duplicate(format!("role `{}`", name)));
            }
            if let Some(parent) = parent {
                inner.require_role(parent)?;
            }

            inner.last_role_id += 1;
            let role = Role {
                id: RoleId::new(inner.last_role_id),
                name: name.to_owned(),
                parent_id: parent,
            };
            inner.roles.insert(role.id, role.clone());
            role
        };

        tracing::debug!(role = %role.name, id = %role.id, "created role");
        self.notifier
            .publish(ChangeEvent::created(EntityKind::Role, role.id.get()));
        Ok(role)
    }

    async fn update_role(&self, role: &Role) -> Result<()> {
        validate_name(&role.name)?;

        {
            let mut inner = self.write()?;
            inner.require_role(role.id)?;
            if inner
                .roles
                .values()
                .any(|r| r.name == role.name && r.id != role.id)
            {
                return Err(StoreError::Duplicate(format!("role `{}`", role.name)));
            }
            if let Some(parent) = role.parent_id {
                inner.require_role(parent)?;
            }
            inner.roles.insert(role.id, role.clone());
        }

        tracing::debug!(role = %role.name, id = %role.id, "updated role");
        self.notifier
            .publish(ChangeEvent::updated(EntityKind::Role, role.id.get()));
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        {
            let mut inner = self.write()?;
            if inner.roles.remove(&id).is_none() {
                return Err(StoreError::NotFound(format!("role {}", id)));
            }
            for child in inner.roles.values_mut() {
                if child.parent_id == Some(id) {
                    child.parent_id = None;
                }
            }
            inner.role_permissions.retain(|(r, _)| *r != id);
            inner.subject_roles.retain(|(_, r)| *r != id);
        }

        tracing::debug!(id = %id, "deleted role");
        self.notifier
            .publish(ChangeEvent::deleted(EntityKind::Role, id.get()));
        Ok(())
    }

    async fn create_permission(
        &self,
        name: &str,
        action: ActionId,
        object: ObjectId,
    ) -> Result<Permission> {
        validate_name(name)?;

        let permission = {
            let mut inner = self.write()?;
            if inner.permissions.values().any(|p| p.name == name) {
                return Err(StoreError::Duplicate(format!("permission `{}`", name)));
            }
            inner.require_classifiers(action, object)?;

            inner.last_permission_id += 1;
            let permission = Permission {
                id: PermissionId::new(inner.last_permission_id),
                name: name.to_owned(),
                object_id: object,
                action_id: action,
            };
            inner.permissions.insert(permission.id, permission.clone());
            permission
        };

        tracing::debug!(permission = %permission.name, id = %permission.id, "created permission");
        self.notifier.publish(ChangeEvent::created(
            EntityKind::Permission,
            permission.id.get(),
        ));
        Ok(permission)
    }

    async fn update_permission(&self, permission: &Permission) -> Result<()> {
        validate_name(&permission.name)?;

        {
            let mut inner = self.write()?;
            inner.require_permission(permission.id)?;
            if inner
                .permissions
                .values()
                .any(|p| p.name == permission.name && p.id != permission.id)
            {
                return Err(StoreError::Duplicate(format!(
                    "permission `{}`",
                    permission.name
                )));
            }
            inner.require_classifiers(permission.action_id, permission.object_id)?;
            inner.permissions.insert(permission.id, permission.clone());
        }

        tracing::debug!(permission = %permission.name, id = %permission.id, "updated permission");
        self.notifier.publish(ChangeEvent::updated(
            EntityKind::Permission,
            permission.id.get(),
        ));
        Ok(())
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        {
            let mut inner = self.write()?;
            if inner.permissions.remove(&id).is_none() {
                return Err(StoreError::NotFound(format!("permission {}", id)));
            }
            inner.role_permissions.retain(|(_, p)| *p != id);
            for grants in inner.subject_permissions.values_mut() {
                grants.retain(|p| *p != id);
            }
        }

        tracing::debug!(id = %id, "deleted permission");
        self.notifier
            .publish(ChangeEvent::deleted(EntityKind::Permission, id.get()));
        Ok(())
    }

    async fn create_action(&self, name: &str) -> Result<Action> {
        validate_name(name)?;

        let action = {
            let mut inner = self.write()?;
            if inner.actions.values().any(|a| a.name == name) {
                return Err(StoreError::Duplicate(format!("action `{}`", name)));
            }
            inner.last_action_id += 1;
            let action = Action::new(ActionId::new(inner.last_action_id), name);
            inner.actions.insert(action.id, action.clone());
            action
        };

        tracing::debug!(action = %action.name, id = %action.id, "created action");
        self.notifier
            .publish(ChangeEvent::created(EntityKind::Action, action.id.get()));
        Ok(action)
    }

    async fn update_action(&self, action: &Action) -> Result<()> {
        validate_name(&action.name)?;

        {
            let mut inner = self.write()?;
            if !inner.actions.contains_key(&action.id) {
                return Err(StoreError::NotFound(format!("action {}", action.id)));
            }
            if inner
                .actions
                .values()
                .any(|a| a.name == action.name && a.id != action.id)
            {
                return Err(StoreError::Duplicate(format!("action `{}`", action.name)));
            }
            inner.actions.insert(action.id, action.clone());
        }

        self.notifier
            .publish(ChangeEvent::updated(EntityKind::Action, action.id.get()));
        Ok(())
    }

    async fn delete_action(&self, id: ActionId) -> Result<()> {
        {
            let mut inner = self.write()?;
            if inner.actions.remove(&id).is_none() {
                return Err(StoreError::NotFound(format!("action {}", id)));
            }
            for permission in inner.permissions.values_mut() {
                if permission.action_id == id {
                    permission.action_id = ActionId::NONE;
                }
            }
        }

        tracing::debug!(id = %id, "deleted action");
        self.notifier
            .publish(ChangeEvent::deleted(EntityKind::Action, id.get()));
        Ok(())
    }

    async fn create_object(&self, name: &str) -> Result<Object> {
        validate_name(name)?;

        let object = {
            let mut inner = self.write()?;
            if inner.objects.values().any(|o| o.name == name) {
                return Err(StoreError::Duplicate(format!("object `{}`", name)));
            }
            inner.last_object_id += 1;
            let object = Object::new(ObjectId::new(inner.last_object_id), name);
            inner.objects.insert(object.id, object.clone());
            object
        };

        tracing::debug!(object = %object.name, id = %object.id, "created object");
        self.notifier
            .publish(ChangeEvent::created(EntityKind::Object, object.id.get()));
        Ok(object)
    }

    async fn update_object(&self, object: &Object) -> Result<()> {
        validate_name(&object.name)?;

        {
            let mut inner = self.write()?;
            if !inner.objects.contains_key(&object.id) {
                return Err(StoreError::NotFound(format!("object {}", object.id)));
            }
            if inner
                .objects
                .values()
                .any(|o| o.name == object.name && o.id != object.id)
            {
                return Err(StoreError::Duplicate(format!("object `{}`", object.name)));
            }
            inner.objects.insert(object.id, object.clone());
        }

        self.notifier
            .publish(ChangeEvent::updated(EntityKind::Object, object.id.get()));
        Ok(())
    }

    async fn delete_object(&self, id: ObjectId) -> Result<()> {
        {
            let mut inner = self.write()?;
            if inner.objects.remove(&id).is_none() {
                return Err(StoreError::NotFound(format!("object {}", id)));
            }
            for permission in inner.permissions.values_mut() {
                if permission.object_id == id {
                    permission.object_id = ObjectId::NONE;
                }
            }
        }

        tracing::debug!(id = %id, "deleted object");
        self.notifier
            .publish(ChangeEvent::deleted(EntityKind::Object, id.get()));
        Ok(())
    }

    async fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        let attached = {
            let mut inner = self.write()?;
            inner.require_role(role)?;
            inner.require_permission(permission)?;
            inner.role_permissions.insert((role, permission))
        };

        if attached {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Role, role.get()));
        }
        Ok(attached)
    }

    async fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool> {
        let detached = self.write()?.role_permissions.remove(&(role, permission));

        if detached {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Role, role.get()));
        }
        Ok(detached)
    }

    async fn assign_roles(&self, subject: SubjectId, roles: &[RoleId]) -> Result<()> {
        let changed = {
            let mut inner = self.write()?;
            for role in roles {
                inner.require_role(*role)?;
            }
            let mut changed = false;
            for role in roles {
                changed |= inner.subject_roles.insert((subject, *role));
            }
            changed
        };

        if changed {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Subject, subject.get()));
        }
        Ok(())
    }

    async fn remove_role(&self, subject: SubjectId, role: RoleId) -> Result<bool> {
        let removed = self.write()?.subject_roles.remove(&(subject, role));

        if removed {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Subject, subject.get()));
        }
        Ok(removed)
    }

    async fn clear_roles(&self, subject: SubjectId) -> Result<()> {
        let changed = {
            let mut inner = self.write()?;
            let before = inner.subject_roles.len();
            inner.subject_roles.retain(|(s, _)| *s != subject);
            inner.subject_roles.len() != before
        };

        if changed {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Subject, subject.get()));
        }
        Ok(())
    }

    async fn grant_permission(
        &self,
        subject: SubjectId,
        permission: PermissionId,
    ) -> Result<bool> {
        let granted = {
            let mut inner = self.write()?;
            inner.require_permission(permission)?;
            let grants = inner.subject_permissions.entry(subject).or_default();
            if grants.contains(&permission) {
                false
            } else {
                grants.push(permission);
                true
            }
        };

        if granted {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Subject, subject.get()));
        }
        Ok(granted)
    }

    async fn revoke_permission(
        &self,
        subject: SubjectId,
        permission: PermissionId,
    ) -> Result<bool> {
        let revoked = {
            let mut inner = self.write()?;
            match inner.subject_permissions.get_mut(&subject) {
                Some(grants) => {
                    let before = grants.len();
                    grants.retain(|p| *p != permission);
                    grants.len() != before
                }
                None => false,
            }
        };

        if revoked {
            self.notifier
                .publish(ChangeEvent::updated(EntityKind::Subject, subject.get()));
        }
        Ok(revoked)
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
