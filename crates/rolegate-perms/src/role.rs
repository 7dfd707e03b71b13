//! Decisions about a single role and its ancestors.

use std::collections::BTreeMap;

use rolegate_core::{Catalogue, Permission, PermissionId, PermissionRef, Role};

use crate::error::Result;
use crate::resolver::{HierarchyResolver, ResolverConfig};

/// Evaluates permission questions scoped to one role.
pub struct RoleAuthority<'a> {
    role: &'a Role,
    resolver: HierarchyResolver<'a>,
}

impl<'a> RoleAuthority<'a> {
    pub fn new(role: &'a Role, catalogue: &'a Catalogue) -> Self {
        Self::with_config(role, catalogue, ResolverConfig::default())
    }

    pub fn with_config(role: &'a Role, catalogue: &'a Catalogue, config: ResolverConfig) -> Self {
        Self {
            role,
            resolver: HierarchyResolver::with_config(catalogue, config),
        }
    }

    pub fn role(&self) -> &'a Role {
        self.role
    }

    /// Whether the permission is attached to this role itself.
    ///
    /// Ancestors are not consulted; see
    /// [`parents_have_permission_to`](Self::parents_have_permission_to).
    pub fn has_permission_to(&self, permission: impl Into<PermissionRef>) -> Result<bool> {
        let catalogue = self.resolver.catalogue();
        let id = catalogue.resolve_permission(&permission.into())?;
        Ok(catalogue.role_has_permission(self.role.id, id))
    }

    /// Permissions attached to this role, ordered by id.
    pub fn permissions(&self) -> Vec<&'a Permission> {
        self.resolver
            .catalogue()
            .role_permissions(self.role.id)
            .collect()
    }

    /// Ancestors, nearest first.
    pub fn get_parent_roles(&self) -> Result<Vec<&'a Role>> {
        self.resolver.ancestors_of(self.role)
    }

    /// One group per ancestor that has any permissions, nearest first.
    pub fn parent_permissions(&self) -> Result<Vec<Vec<&'a Permission>>> {
        let catalogue = self.resolver.catalogue();
        Ok(self
            .get_parent_roles()?
            .into_iter()
            .map(|ancestor| catalogue.role_permissions(ancestor.id).collect::<Vec<_>>())
            .filter(|group| !group.is_empty())
            .collect())
    }

    /// Ancestor permissions as a single list, deduplicated and ordered by id.
    pub fn parent_permissions_flat(&self) -> Result<Vec<&'a Permission>> {
        let flat: BTreeMap<PermissionId, &'a Permission> = self
            .parent_permissions()?
            .into_iter()
            .flatten()
            .map(|permission| (permission.id, permission))
            .collect();
        Ok(flat.into_values().collect())
    }

    /// Whether any ancestor, excluding this role, has the permission attached.
    pub fn parents_have_permission_to(&self, permission: impl Into<PermissionRef>) -> Result<bool> {
        let catalogue = self.resolver.catalogue();
        let id = catalogue.resolve_permission(&permission.into())?;
        Ok(self
            .get_parent_roles()?
            .iter()
            .any(|ancestor| catalogue.role_has_permission(ancestor.id, id)))
    }
}
