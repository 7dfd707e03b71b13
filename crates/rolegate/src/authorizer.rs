//! The Authorizer: unified API for Rolegate.
//!
//! Ties a store, the catalogue cache and the permission resolver together.
//! Catalogue facts come from the cached snapshot; subject facts are read from
//! the store for every call.

use std::sync::Arc;

use rolegate_core::{
    Action, ActionId, Catalogue, CoreError, Object, ObjectId, Permission, PermissionRef, Role,
    RoleQuery, RoleRef, SubjectId,
};
use rolegate_perms::{
    HierarchyResolver, ResolverConfig, RoleAuthority, SubjectAuthority, SubjectGrants,
};
use rolegate_store::EntityStore;

use crate::cache::AuthorizationCache;
use crate::config::AuthorizerConfig;
use crate::error::{AuthzError, Result};

/// The main Authorizer struct.
///
/// Provides a unified API for:
/// - Role and permission checks on subjects
/// - Role-scoped queries over the hierarchy
/// - Catalogue and assignment writes
/// - Managing the catalogue cache
pub struct Authorizer<S: EntityStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Catalogue snapshot, subscribed to the store's change events.
    cache: Arc<AuthorizationCache>,
    /// Configuration.
    config: AuthorizerConfig,
}

impl<S: EntityStore> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

impl<S: EntityStore + 'static> Authorizer<S> {
    /// Create an authorizer with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, AuthorizerConfig::default())
    }

    pub fn with_config(store: S, config: AuthorizerConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    /// Create an authorizer over a store that is shared with other code.
    ///
    /// Writes made through the shared handle invalidate this authorizer's
    /// cache just like writes made through the authorizer.
    pub fn from_arc(store: Arc<S>, config: AuthorizerConfig) -> Self {
        let cache = Arc::new(AuthorizationCache::new(config.cache.clone()));
        store.notifier().subscribe(&cache);
        Self {
            store,
            cache,
            config,
        }
    }
}

impl<S: EntityStore> Authorizer<S> {
    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &AuthorizationCache {
        &self.cache
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────────

    /// The catalogue snapshot, loaded on first use.
    pub async fn get_permissions(&self) -> Result<Arc<Catalogue>> {
        Ok(self.cache.get_permissions(self.store.as_ref()).await?)
    }

    /// Drop the snapshot so the next check reloads it.
    pub fn forget_cached_permissions(&self) {
        self.cache.forget_cached_permissions();
    }

    /// Load the catalogue ahead of the first check.
    pub async fn warm(&self) -> Result<()> {
        let catalogue = self.get_permissions().await?;
        tracing::debug!(
            roles = catalogue.role_count(),
            permissions = catalogue.permission_count(),
            "authorization cache warmed"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn find_role(&self, name: &str) -> Result<Role> {
        Ok(self.get_permissions().await?.find_role_by_name(name)?.clone())
    }

    pub async fn find_permission(&self, name: &str) -> Result<Permission> {
        Ok(self
            .get_permissions()
            .await?
            .find_permission_by_name(name)?
            .clone())
    }

    pub async fn find_action(&self, name: &str) -> Result<Action> {
        Ok(self.get_permissions().await?.find_action_by_name(name)?.clone())
    }

    pub async fn find_object(&self, name: &str) -> Result<Object> {
        Ok(self.get_permissions().await?.find_object_by_name(name)?.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subject checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Load everything needed to answer questions about one subject.
    ///
    /// The handle is a point-in-time view; use it to batch several checks.
    pub async fn subject(&self, subject: SubjectId) -> Result<SubjectHandle> {
        let catalogue = self.get_permissions().await?;
        let grants = SubjectGrants::new(subject)
            .with_roles(self.store.subject_roles(subject).await?)
            .with_permissions(self.store.subject_permissions(subject).await?);

        Ok(SubjectHandle {
            grants,
            catalogue,
            resolver: self.config.resolver.clone(),
        })
    }

    pub async fn has_role(&self, subject: SubjectId, roles: impl Into<RoleQuery>) -> Result<bool> {
        let roles = roles.into();
        self.subject(subject).await?.has_role(roles)
    }

    pub async fn has_any_role(
        &self,
        subject: SubjectId,
        roles: impl Into<RoleQuery>,
    ) -> Result<bool> {
        let roles = roles.into();
        self.subject(subject).await?.has_any_role(roles)
    }

    pub async fn has_all_roles(
        &self,
        subject: SubjectId,
        roles: impl Into<RoleQuery>,
    ) -> Result<bool> {
        let roles = roles.into();
        self.subject(subject).await?.has_all_roles(roles)
    }

    pub async fn has_permission_to(
        &self,
        subject: SubjectId,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into();
        self.subject(subject).await?.has_permission_to(permission)
    }

    pub async fn has_any_permission<I, P>(&self, subject: SubjectId, permissions: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionRef>,
    {
        let permissions: Vec<PermissionRef> = permissions.into_iter().map(Into::into).collect();
        self.subject(subject).await?.has_any_permission(permissions)
    }

    pub async fn has_direct_permission(
        &self,
        subject: SubjectId,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into();
        Ok(self.subject(subject).await?.has_direct_permission(permission))
    }

    pub async fn get_direct_permissions(&self, subject: SubjectId) -> Result<Vec<Permission>> {
        Ok(owned(self.subject(subject).await?.get_direct_permissions()))
    }

    pub async fn get_permissions_via_roles(&self, subject: SubjectId) -> Result<Vec<Permission>> {
        Ok(owned(self.subject(subject).await?.get_permissions_via_roles()))
    }

    pub async fn get_all_permissions(&self, subject: SubjectId) -> Result<Vec<Permission>> {
        Ok(owned(self.subject(subject).await?.get_all_permissions()))
    }

    pub async fn get_effective_permissions(&self, subject: SubjectId) -> Result<Vec<Permission>> {
        Ok(owned(self.subject(subject).await?.get_effective_permissions()?))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subject writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign one or more roles. Every name must exist; nothing is assigned
    /// otherwise.
    pub async fn assign_role(&self, subject: SubjectId, roles: impl Into<RoleQuery>) -> Result<()> {
        let roles = roles.into();
        let ids = {
            let catalogue = self.get_permissions().await?;
            roles
                .refs()
                .iter()
                .map(|role| lookup_role(&catalogue, role).map(|r| r.id))
                .collect::<Result<Vec<_>>>()?
        };

        self.store.assign_roles(subject, &ids).await?;
        tracing::debug!(subject = %subject, count = ids.len(), "roles assigned");
        Ok(())
    }

    /// Remove one role. Returns whether the subject held it.
    pub async fn remove_role(&self, subject: SubjectId, role: impl Into<RoleRef>) -> Result<bool> {
        let role = role.into();
        let id = lookup_role(&*self.get_permissions().await?, &role)?.id;
        Ok(self.store.remove_role(subject, id).await?)
    }

    /// Replace the subject's roles with exactly the given ones.
    ///
    /// Names are resolved before anything is removed.
    pub async fn sync_roles(&self, subject: SubjectId, roles: impl Into<RoleQuery>) -> Result<()> {
        let roles = roles.into();
        let ids = {
            let catalogue = self.get_permissions().await?;
            roles
                .refs()
                .iter()
                .map(|role| lookup_role(&catalogue, role).map(|r| r.id))
                .collect::<Result<Vec<_>>>()?
        };

        self.store.clear_roles(subject).await?;
        self.store.assign_roles(subject, &ids).await?;
        Ok(())
    }

    /// Grant permissions directly. Every name must exist.
    pub async fn give_permission_to<I, P>(&self, subject: SubjectId, permissions: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionRef>,
    {
        let permissions: Vec<PermissionRef> = permissions.into_iter().map(Into::into).collect();
        let ids = {
            let catalogue = self.get_permissions().await?;
            permissions
                .iter()
                .map(|permission| lookup_permission(&catalogue, permission).map(|p| p.id))
                .collect::<Result<Vec<_>>>()?
        };

        for id in ids {
            self.store.grant_permission(subject, id).await?;
        }
        Ok(())
    }

    /// Revoke a direct grant. Returns whether it was held.
    pub async fn revoke_permission_to(
        &self,
        subject: SubjectId,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into();
        let id = lookup_permission(&*self.get_permissions().await?, &permission)?.id;
        Ok(self.store.revoke_permission(subject, id).await?)
    }

    /// Subjects directly assigned any of the roles, ordered by id.
    pub async fn subjects_with_role(&self, roles: impl Into<RoleQuery>) -> Result<Vec<SubjectId>> {
        let roles = roles.into();
        let ids = {
            let catalogue = self.get_permissions().await?;
            roles
                .refs()
                .iter()
                .map(|role| lookup_role(&catalogue, role).map(|r| r.id))
                .collect::<Result<Vec<_>>>()?
        };
        Ok(self.store.subjects_with_roles(&ids).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role queries
    // ─────────────────────────────────────────────────────────────────────────

    async fn with_role<T, F>(&self, role: RoleRef, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&RoleAuthority<'c>) -> rolegate_perms::Result<T>,
    {
        let catalogue = self.get_permissions().await?;
        let role = lookup_role(&catalogue, &role)?;
        let authority = RoleAuthority::with_config(role, &catalogue, self.config.resolver.clone());
        Ok(f(&authority)?)
    }

    /// Whether the permission is attached to the role itself.
    pub async fn role_has_permission_to(
        &self,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into();
        self.with_role(role.into(), |authority| {
            authority.has_permission_to(permission)
        })
        .await
    }

    /// Ancestors of the role, nearest first.
    pub async fn get_parent_roles(&self, role: impl Into<RoleRef>) -> Result<Vec<Role>> {
        self.with_role(role.into(), |authority| {
            Ok(owned(authority.get_parent_roles()?))
        })
        .await
    }

    /// Permissions of each ancestor that has any, nearest first.
    pub async fn parent_permissions(&self, role: impl Into<RoleRef>) -> Result<Vec<Vec<Permission>>> {
        self.with_role(role.into(), |authority| {
            Ok(authority
                .parent_permissions()?
                .into_iter()
                .map(owned)
                .collect())
        })
        .await
    }

    pub async fn parent_permissions_flat(&self, role: impl Into<RoleRef>) -> Result<Vec<Permission>> {
        self.with_role(role.into(), |authority| {
            Ok(owned(authority.parent_permissions_flat()?))
        })
        .await
    }

    pub async fn parents_have_permission_to(
        &self,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let permission = permission.into();
        self.with_role(role.into(), |authority| {
            authority.parents_have_permission_to(permission)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalogue writes
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_role(&self, name: &str, parent: Option<RoleRef>) -> Result<Role> {
        let parent = match parent {
            Some(parent) => Some(lookup_role(&*self.get_permissions().await?, &parent)?.id),
            None => None,
        };
        Ok(self.store.create_role(name, parent).await?)
    }

    pub async fn rename_role(&self, role: impl Into<RoleRef>, name: &str) -> Result<Role> {
        let role = role.into();
        let mut role = lookup_role(&*self.get_permissions().await?, &role)?.clone();
        role.name = name.to_owned();
        self.store.update_role(&role).await?;
        Ok(role)
    }

    /// Move a role under a new parent, or make it a root.
    ///
    /// Refused when the new parent is the role itself or one of its
    /// descendants.
    pub async fn set_role_parent(
        &self,
        role: impl Into<RoleRef>,
        parent: Option<RoleRef>,
    ) -> Result<Role> {
        let role = role.into();
        let updated = {
            let catalogue = self.get_permissions().await?;
            let mut updated = lookup_role(&catalogue, &role)?.clone();

            updated.parent_id = match parent {
                Some(parent) => {
                    let parent = lookup_role(&catalogue, &parent)?;
                    let resolver =
                        HierarchyResolver::with_config(&catalogue, self.config.resolver.clone());
                    if resolver.would_create_cycle(updated.id, parent.id)? {
                        tracing::warn!(
                            role = %updated.name,
                            parent = %parent.name,
                            "refusing parent change that would create a cycle"
                        );
                        return Err(AuthzError::InvalidOperation(format!(
                            "making `{}` the parent of `{}` would create a cycle",
                            parent.name, updated.name
                        )));
                    }
                    Some(parent.id)
                }
                None => None,
            };
            updated
        };

        self.store.update_role(&updated).await?;
        Ok(updated)
    }

    /// Delete a role. Children become roots; attachments and memberships go
    /// with it.
    pub async fn delete_role(&self, role: impl Into<RoleRef>) -> Result<()> {
        let role = role.into();
        let id = lookup_role(&*self.get_permissions().await?, &role)?.id;
        Ok(self.store.delete_role(id).await?)
    }

    /// Create a permission, optionally classified by action and object name.
    pub async fn create_permission(
        &self,
        name: &str,
        action: Option<&str>,
        object: Option<&str>,
    ) -> Result<Permission> {
        let (action, object) = {
            let catalogue = self.get_permissions().await?;
            let action = match action {
                Some(action) => catalogue.find_action_by_name(action)?.id,
                None => ActionId::NONE,
            };
            let object = match object {
                Some(object) => catalogue.find_object_by_name(object)?.id,
                None => ObjectId::NONE,
            };
            (action, object)
        };
        Ok(self.store.create_permission(name, action, object).await?)
    }

    pub async fn update_permission(&self, permission: &Permission) -> Result<()> {
        Ok(self.store.update_permission(permission).await?)
    }

    pub async fn delete_permission(&self, permission: impl Into<PermissionRef>) -> Result<()> {
        let permission = permission.into();
        let id = lookup_permission(&*self.get_permissions().await?, &permission)?.id;
        Ok(self.store.delete_permission(id).await?)
    }

    pub async fn create_action(&self, name: &str) -> Result<Action> {
        Ok(self.store.create_action(name).await?)
    }

    pub async fn rename_action(&self, name: &str, new_name: &str) -> Result<Action> {
        let mut action = self.find_action(name).await?;
        action.name = new_name.to_owned();
        self.store.update_action(&action).await?;
        Ok(action)
    }

    /// Delete an action. Permissions classified by it become unclassified.
    pub async fn delete_action(&self, name: &str) -> Result<()> {
        let action = self.find_action(name).await?;
        Ok(self.store.delete_action(action.id).await?)
    }

    pub async fn create_object(&self, name: &str) -> Result<Object> {
        Ok(self.store.create_object(name).await?)
    }

    pub async fn rename_object(&self, name: &str, new_name: &str) -> Result<Object> {
        let mut object = self.find_object(name).await?;
        object.name = new_name.to_owned();
        self.store.update_object(&object).await?;
        Ok(object)
    }

    /// Delete an object. Permissions classified by it become unclassified.
    pub async fn delete_object(&self, name: &str) -> Result<()> {
        let object = self.find_object(name).await?;
        Ok(self.store.delete_object(object.id).await?)
    }

    /// Attach a permission to a role. Returns whether it was newly attached.
    pub async fn attach_permission(
        &self,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let (role, permission) = (role.into(), permission.into());
        let (role, permission) = {
            let catalogue = self.get_permissions().await?;
            (
                lookup_role(&catalogue, &role)?.id,
                lookup_permission(&catalogue, &permission)?.id,
            )
        };
        Ok(self.store.attach_permission(role, permission).await?)
    }

    /// Detach a permission from a role. Returns whether it was attached.
    pub async fn detach_permission(
        &self,
        role: impl Into<RoleRef>,
        permission: impl Into<PermissionRef>,
    ) -> Result<bool> {
        let (role, permission) = (role.into(), permission.into());
        let (role, permission) = {
            let catalogue = self.get_permissions().await?;
            (
                lookup_role(&catalogue, &role)?.id,
                lookup_permission(&catalogue, &permission)?.id,
            )
        };
        Ok(self.store.detach_permission(role, permission).await?)
    }
}

/// A subject's grants together with the catalogue they were read against.
#[derive(Debug, Clone)]
pub struct SubjectHandle {
    grants: SubjectGrants,
    catalogue: Arc<Catalogue>,
    resolver: ResolverConfig,
}

impl SubjectHandle {
    pub fn grants(&self) -> &SubjectGrants {
        &self.grants
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn authority(&self) -> SubjectAuthority<'_> {
        SubjectAuthority::with_config(&self.grants, &self.catalogue, self.resolver.clone())
    }

    pub fn has_role(&self, roles: impl Into<RoleQuery>) -> Result<bool> {
        Ok(self.authority().has_role(roles)?)
    }

    pub fn has_any_role(&self, roles: impl Into<RoleQuery>) -> Result<bool> {
        Ok(self.authority().has_any_role(roles)?)
    }

    pub fn has_all_roles(&self, roles: impl Into<RoleQuery>) -> Result<bool> {
        Ok(self.authority().has_all_roles(roles)?)
    }

    pub fn has_permission_to(&self, permission: impl Into<PermissionRef>) -> Result<bool> {
        Ok(self.authority().has_permission_to(permission)?)
    }

    pub fn has_any_permission<I, P>(&self, permissions: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionRef>,
    {
        Ok(self.authority().has_any_permission(permissions)?)
    }

    pub fn has_direct_permission(&self, permission: impl Into<PermissionRef>) -> bool {
        self.authority().has_direct_permission(permission)
    }

    pub fn get_direct_permissions(&self) -> Vec<&Permission> {
        self.authority().get_direct_permissions()
    }

    pub fn get_permissions_via_roles(&self) -> Vec<&Permission> {
        self.authority().get_permissions_via_roles()
    }

    pub fn get_all_permissions(&self) -> Vec<&Permission> {
        self.authority().get_all_permissions()
    }

    pub fn get_effective_permissions(&self) -> Result<Vec<&Permission>> {
        Ok(self.authority().get_effective_permissions()?)
    }
}

/// Resolve a role reference against the catalogue.
///
/// An instance must still exist in the catalogue.
fn lookup_role<'c>(catalogue: &'c Catalogue, role: &RoleRef) -> Result<&'c Role> {
    let id = catalogue.resolve_role(role)?;
    catalogue
        .role(id)
        .ok_or_else(|| CoreError::RoleDoesNotExist(role.name().to_owned()).into())
}

fn lookup_permission<'c>(
    catalogue: &'c Catalogue,
    permission: &PermissionRef,
) -> Result<&'c Permission> {
    let id = catalogue.resolve_permission(permission)?;
    catalogue
        .permission(id)
        .ok_or_else(|| CoreError::PermissionDoesNotExist(permission.name().to_owned()).into())
}

fn owned<T: Clone>(items: Vec<&T>) -> Vec<T> {
    items.into_iter().cloned().collect()
}
