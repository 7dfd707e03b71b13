//! The catalogue: an immutable snapshot of every role, permission and
//! classifier together with their associations.
//!
//! A catalogue is what the authorization cache holds. It is built once from
//! the store via [`CatalogueBuilder`] and then only read, so it can be shared
//! across threads behind an `Arc` while many subjects resolve against it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::entity::{Action, Object, Permission, Role};
use crate::error::{CoreError, Result};
use crate::reference::{PermissionRef, RoleRef};
use crate::types::{ActionId, ObjectId, PermissionId, RoleId};

/// Immutable snapshot of the authorization facts.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    roles: BTreeMap<RoleId, Role>,
    /// Ordered by id.
    permissions: Vec<Permission>,
    permission_index: HashMap<PermissionId, usize>,
    actions: BTreeMap<ActionId, Action>,
    objects: BTreeMap<ObjectId, Object>,

    role_permissions: HashMap<RoleId, BTreeSet<PermissionId>>,
    permission_roles: HashMap<PermissionId, BTreeSet<RoleId>>,

    role_names: HashMap<String, RoleId>,
    permission_names: HashMap<String, PermissionId>,
    action_names: HashMap<String, ActionId>,
    object_names: HashMap<String, ObjectId>,
}

impl Catalogue {
    /// Start building a catalogue.
    pub fn builder() -> CatalogueBuilder {
        CatalogueBuilder::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entity access
    // ─────────────────────────────────────────────────────────────────────────

    /// All permissions, ordered by id.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// All roles, ordered by id.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn role(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(&id)
    }

    pub fn permission(&self, id: PermissionId) -> Option<&Permission> {
        self.permission_index
            .get(&id)
            .map(|&index| &self.permissions[index])
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(&id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Number of roles in the snapshot.
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Number of permissions in the snapshot.
    pub fn permission_count(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
            && self.permissions.is_empty()
            && self.actions.is_empty()
            && self.objects.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Name lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Find a role by its name.
    pub fn find_role_by_name(&self, name: &str) -> Result<&Role> {
        self.role_names
            .get(name)
            .and_then(|id| self.roles.get(id))
            .ok_or_else(|| CoreError::RoleDoesNotExist(name.to_owned()))
    }

    /// Find a permission by its name.
    pub fn find_permission_by_name(&self, name: &str) -> Result<&Permission> {
        self.permission_names
            .get(name)
            .and_then(|&id| self.permission(id))
            .ok_or_else(|| CoreError::PermissionDoesNotExist(name.to_owned()))
    }

    /// Find an action by its name.
    pub fn find_action_by_name(&self, name: &str) -> Result<&Action> {
        self.action_names
            .get(name)
            .and_then(|id| self.actions.get(id))
            .ok_or_else(|| CoreError::ActionDoesNotExist(name.to_owned()))
    }

    /// Find an object by its name.
    pub fn find_object_by_name(&self, name: &str) -> Result<&Object> {
        self.object_names
            .get(name)
            .and_then(|id| self.objects.get(id))
            .ok_or_else(|| CoreError::ObjectDoesNotExist(name.to_owned()))
    }

    /// Resolve a role reference to an id.
    ///
    /// Names are looked up; instances are taken at their word.
    pub fn resolve_role(&self, role: &RoleRef) -> Result<RoleId> {
        match role {
            RoleRef::Name(name) => self.find_role_by_name(name).map(|r| r.id),
            RoleRef::Role(role) => Ok(role.id),
        }
    }

    /// Resolve a permission reference to an id.
    pub fn resolve_permission(&self, permission: &PermissionRef) -> Result<PermissionId> {
        match permission {
            PermissionRef::Name(name) => self.find_permission_by_name(name).map(|p| p.id),
            PermissionRef::Permission(permission) => Ok(permission.id),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Associations
    // ─────────────────────────────────────────────────────────────────────────

    /// Ids of the permissions directly attached to a role.
    pub fn role_permission_ids(&self, role: RoleId) -> impl Iterator<Item = PermissionId> + '_ {
        self.role_permissions
            .get(&role)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Permissions directly attached to a role, ordered by id.
    pub fn role_permissions(&self, role: RoleId) -> impl Iterator<Item = &Permission> + '_ {
        self.role_permission_ids(role)
            .filter_map(move |id| self.permission(id))
    }

    /// Whether the permission is directly attached to the role.
    pub fn role_has_permission(&self, role: RoleId, permission: PermissionId) -> bool {
        self.role_permissions
            .get(&role)
            .is_some_and(|ids| ids.contains(&permission))
    }

    /// Ids of the roles a permission is attached to.
    pub fn permission_role_ids(
        &self,
        permission: PermissionId,
    ) -> impl Iterator<Item = RoleId> + '_ {
        self.permission_roles
            .get(&permission)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    /// Roles a permission is attached to, ordered by id.
    pub fn permission_roles(&self, permission: PermissionId) -> impl Iterator<Item = &Role> + '_ {
        self.permission_role_ids(permission)
            .filter_map(move |id| self.roles.get(&id))
    }

    /// Permissions composed with the given action.
    pub fn permissions_for_action(&self, action: ActionId) -> Vec<&Permission> {
        self.permissions
            .iter()
            .filter(|p| p.action_id == action)
            .collect()
    }

    /// Permissions composed with the given object.
    pub fn permissions_for_object(&self, object: ObjectId) -> Vec<&Permission> {
        self.permissions
            .iter()
            .filter(|p| p.object_id == object)
            .collect()
    }

    /// Roles whose parent is `role`.
    pub fn children_of(&self, role: RoleId) -> Vec<&Role> {
        self.roles
            .values()
            .filter(|r| r.parent_id == Some(role))
            .collect()
    }
}

/// Incremental builder for a [`Catalogue`].
///
/// Later entries with the same id replace earlier ones. Attachments that
/// reference unknown ids are kept; lookups simply skip them.
#[derive(Debug, Default)]
pub struct CatalogueBuilder {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    actions: Vec<Action>,
    objects: Vec<Object>,
    attachments: Vec<(RoleId, PermissionId)>,
}

impl CatalogueBuilder {
    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    pub fn objects(mut self, objects: impl IntoIterator<Item = Object>) -> Self {
        self.objects.extend(objects);
        self
    }

    /// Attach a permission to a role.
    pub fn attach(mut self, role: RoleId, permission: PermissionId) -> Self {
        self.attachments.push((role, permission));
        self
    }

    pub fn attachments(
        mut self,
        attachments: impl IntoIterator<Item = (RoleId, PermissionId)>,
    ) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Finish the snapshot and build its indexes.
    pub fn build(self) -> Catalogue {
        let mut catalogue = Catalogue::default();

        for role in self.roles {
            catalogue.role_names.insert(role.name.clone(), role.id);
            catalogue.roles.insert(role.id, role);
        }

        let mut permissions: BTreeMap<PermissionId, Permission> = BTreeMap::new();
        for permission in self.permissions {
            permissions.insert(permission.id, permission);
        }
        for (index, permission) in permissions.into_values().enumerate() {
            catalogue
                .permission_names
                .insert(permission.name.clone(), permission.id);
            catalogue.permission_index.insert(permission.id, index);
            catalogue.permissions.push(permission);
        }

        for action in self.actions {
            catalogue.action_names.insert(action.name.clone(), action.id);
            catalogue.actions.insert(action.id, action);
        }

        for object in self.objects {
            catalogue.object_names.insert(object.name.clone(), object.id);
            catalogue.objects.insert(object.id, object);
        }

        for (role, permission) in self.attachments {
            catalogue
                .role_permissions
                .entry(role)
                .or_default()
                .insert(permission);
            catalogue
                .permission_roles
                .entry(permission)
                .or_default()
                .insert(role);
        }

        catalogue
    }
}
