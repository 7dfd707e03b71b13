//! Decisions about a subject.
//!
//! A subject's own facts (assigned roles, direct grants) are read fresh from
//! the store for every decision and carried in [`SubjectGrants`]. Everything
//! else comes from the shared [`Catalogue`].

use std::collections::BTreeSet;

use rolegate_core::{Catalogue, Permission, PermissionId, PermissionRef, RoleId, RoleQuery, SubjectId};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resolver::{HierarchyResolver, ResolverConfig, RoleClosure};

/// The roles and direct permissions held by one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrants {
    pub subject: SubjectId,
    /// Roles assigned to the subject, without ancestors.
    pub roles: Vec<RoleId>,
    /// Permissions granted to the subject directly, in grant order.
    pub permissions: Vec<PermissionId>,
}

impl SubjectGrants {
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = PermissionId>) -> Self {
        self.permissions.extend(permissions);
        self
    }
}

/// Evaluates role and permission questions for one subject.
pub struct SubjectAuthority<'a> {
    grants: &'a SubjectGrants,
    resolver: HierarchyResolver<'a>,
}

impl<'a> SubjectAuthority<'a> {
    pub fn new(grants: &'a SubjectGrants, catalogue: &'a Catalogue) -> Self {
        Self::with_config(grants, catalogue, ResolverConfig::default())
    }

    pub fn with_config(
        grants: &'a SubjectGrants,
        catalogue: &'a Catalogue,
        config: ResolverConfig,
    ) -> Self {
        Self {
            grants,
            resolver: HierarchyResolver::with_config(catalogue, config),
        }
    }

    fn catalogue(&self) -> &'a Catalogue {
        self.resolver.catalogue()
    }

    /// Assigned roles plus all of their ancestors.
    pub fn role_closure(&self) -> Result<RoleClosure<'a>> {
        self.resolver.closure_of(self.grants.roles.iter().copied())
    }

    /// Whether the subject holds the role, or any role in a list, counting
    /// inherited roles. An empty list yields `false`.
    pub fn has_role(&self, query: impl Into<RoleQuery>) -> Result<bool> {
        let query = query.into();
        let closure = self.role_closure()?;
        Ok(query.refs().iter().any(|role| closure.contains(role)))
    }

    /// Same as [`has_role`](Self::has_role).
    pub fn has_any_role(&self, query: impl Into<RoleQuery>) -> Result<bool> {
        self.has_role(query)
    }

    /// Whether the subject holds every listed role, compared by name.
    ///
    /// A single reference behaves like [`has_role`](Self::has_role). An empty
    /// list yields `true`.
    pub fn has_all_roles(&self, query: impl Into<RoleQuery>) -> Result<bool> {
        let closure = self.role_closure()?;
        match query.into() {
            RoleQuery::One(role) => Ok(closure.contains(&role)),
            RoleQuery::Many(roles) => Ok(roles.iter().all(|role| closure.contains_name(role.name()))),
        }
    }

    /// Whether the subject has the permission directly or through any role in
    /// its closure.
    ///
    /// Fails with `PermissionDoesNotExist` for an unknown name.
    pub fn has_permission_to(&self, permission: impl Into<PermissionRef>) -> Result<bool> {
        let id = self.catalogue().resolve_permission(&permission.into())?;

        if self.grants.permissions.contains(&id) {
            return Ok(true);
        }

        let closure = self.role_closure()?;
        Ok(self
            .catalogue()
            .permission_role_ids(id)
            .any(|role| closure.contains_id(role)))
    }

    /// Whether the subject was granted the permission directly.
    ///
    /// Unknown names yield `false`.
    pub fn has_direct_permission(&self, permission: impl Into<PermissionRef>) -> bool {
        match self.catalogue().resolve_permission(&permission.into()) {
            Ok(id) => self.grants.permissions.contains(&id),
            Err(_) => false,
        }
    }

    /// Whether any of the permissions passes [`has_permission_to`](Self::has_permission_to).
    ///
    /// Stops at the first match; an unknown name before that is an error.
    pub fn has_any_permission<I, P>(&self, permissions: I) -> Result<bool>
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionRef>,
    {
        for permission in permissions {
            if self.has_permission_to(permission)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Directly granted permissions, in grant order.
    pub fn get_direct_permissions(&self) -> Vec<&'a Permission> {
        self.grants
            .permissions
            .iter()
            .filter_map(|id| self.catalogue().permission(*id))
            .collect()
    }

    /// Permissions attached to the assigned roles, without inheritance,
    /// deduplicated and ordered by id.
    pub fn get_permissions_via_roles(&self) -> Vec<&'a Permission> {
        let ids: BTreeSet<PermissionId> = self
            .grants
            .roles
            .iter()
            .flat_map(|role| self.catalogue().role_permission_ids(*role))
            .collect();
        self.lookup(ids)
    }

    /// Direct permissions plus those via assigned roles, deduplicated and
    /// ordered by id.
    pub fn get_all_permissions(&self) -> Vec<&'a Permission> {
        let ids: BTreeSet<PermissionId> = self
            .grants
            .roles
            .iter()
            .flat_map(|role| self.catalogue().role_permission_ids(*role))
            .chain(self.grants.permissions.iter().copied())
            .collect();
        self.lookup(ids)
    }

    /// Every permission [`has_permission_to`](Self::has_permission_to) would
    /// allow, ordered by id.
    pub fn get_effective_permissions(&self) -> Result<Vec<&'a Permission>> {
        let closure = self.role_closure()?;
        let ids: BTreeSet<PermissionId> = closure
            .ids()
            .flat_map(|role| self.catalogue().role_permission_ids(role))
            .chain(self.grants.permissions.iter().copied())
            .collect();
        Ok(self.lookup(ids))
    }

    fn lookup(&self, ids: BTreeSet<PermissionId>) -> Vec<&'a Permission> {
        ids.into_iter()
            .filter_map(|id| self.catalogue().permission(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermsError;
    use rolegate_core::{CoreError, Role, RoleRef};

    fn catalogue() -> Catalogue {
        Catalogue::builder()
            .role(Role::new(RoleId::new(1), "admin"))
            .role(Role::new(RoleId::new(2), "editor").with_parent(RoleId::new(1)))
            .role(Role::new(RoleId::new(3), "writer"))
            .permission(Permission::new(PermissionId::new(1), "manage-users"))
            .permission(Permission::new(PermissionId::new(2), "publish-post"))
            .permission(Permission::new(PermissionId::new(3), "edit-post"))
            .permission(Permission::new(PermissionId::new(4), "comment"))
            .attach(RoleId::new(1), PermissionId::new(1))
            .attach(RoleId::new(2), PermissionId::new(2))
            .attach(RoleId::new(3), PermissionId::new(3))
            .attach(RoleId::new(2), PermissionId::new(3))
            .build()
    }

    fn names(permissions: &[&Permission]) -> Vec<String> {
        permissions.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_inherited_role_and_permission() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1)).with_roles([RoleId::new(2)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        assert!(subject.has_role("editor").unwrap());
        assert!(subject.has_role("admin").unwrap());
        assert!(!subject.has_role("writer").unwrap());
        assert!(subject.has_permission_to("publish-post").unwrap());
        assert!(subject.has_permission_to("manage-users").unwrap());
    }

    #[test]
    fn test_closure_does_not_flow_downwards() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(2)).with_roles([RoleId::new(1)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        assert!(subject.has_role("admin").unwrap());
        assert!(!subject.has_role("editor").unwrap());
        assert!(!subject.has_permission_to("publish-post").unwrap());
    }

    #[test]
    fn test_role_lists() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1)).with_roles([RoleId::new(2)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        assert!(subject.has_any_role(["writer", "admin"]).unwrap());
        assert!(!subject.has_any_role(["writer", "ghost"]).unwrap());
        assert!(!subject.has_role(Vec::<RoleRef>::new()).unwrap());

        assert!(subject.has_all_roles(["admin", "editor"]).unwrap());
        assert!(!subject.has_all_roles(["admin", "writer"]).unwrap());
        assert!(subject.has_all_roles(Vec::<RoleRef>::new()).unwrap());
    }

    #[test]
    fn test_role_instance_matches_by_id() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1)).with_roles([RoleId::new(2)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        let editor = catalogue.role(RoleId::new(2)).unwrap();
        assert!(subject.has_role(editor).unwrap());

        // Same name, different identity.
        let impostor = Role::new(RoleId::new(99), "editor");
        assert!(!subject.has_role(impostor).unwrap());
    }

    #[test]
    fn test_unknown_permission_name() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1));
        let subject = SubjectAuthority::new(&grants, &catalogue);

        let err = subject.has_permission_to("does-not-exist").unwrap_err();
        assert_eq!(
            err,
            PermsError::Core(CoreError::PermissionDoesNotExist("does-not-exist".into()))
        );
        assert!(!subject.has_direct_permission("does-not-exist"));
        assert!(subject
            .has_any_permission(["does-not-exist", "comment"])
            .is_err());
    }

    #[test]
    fn test_direct_grants() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1))
            .with_roles([RoleId::new(3)])
            .with_permissions([PermissionId::new(4), PermissionId::new(1)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        assert!(subject.has_direct_permission("comment"));
        assert!(!subject.has_direct_permission("edit-post"));
        assert!(subject.has_permission_to("edit-post").unwrap());
        assert!(subject.has_any_permission(["publish-post", "comment"]).unwrap());

        assert_eq!(
            names(&subject.get_direct_permissions()),
            vec!["comment", "manage-users"]
        );
        assert_eq!(
            names(&subject.get_all_permissions()),
            vec!["manage-users", "edit-post", "comment"]
        );
    }

    #[test]
    fn test_via_roles_excludes_ancestors() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(1))
            .with_roles([RoleId::new(2), RoleId::new(3)]);
        let subject = SubjectAuthority::new(&grants, &catalogue);

        // edit-post is on both roles and appears once; admin's grant is inherited only.
        assert_eq!(
            names(&subject.get_permissions_via_roles()),
            vec!["publish-post", "edit-post"]
        );
        assert_eq!(
            names(&subject.get_effective_permissions().unwrap()),
            vec!["manage-users", "publish-post", "edit-post"]
        );
    }

    #[test]
    fn test_no_grants() {
        let catalogue = catalogue();
        let grants = SubjectGrants::new(SubjectId::new(7));
        let subject = SubjectAuthority::new(&grants, &catalogue);

        assert!(!subject.has_role("admin").unwrap());
        assert!(!subject.has_permission_to("comment").unwrap());
        assert!(subject.get_all_permissions().is_empty());
    }
}
