//! Name-or-instance references used at the API boundary.
//!
//! Callers may name a role or permission, or hand over an instance they
//! already loaded. Each operation resolves the reference once on entry.

use crate::entity::{Permission, Role};

/// A role given by name or as a loaded instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    /// Match by unique name.
    Name(String),
    /// Match by identity.
    Role(Role),
}

impl RoleRef {
    /// The role name this reference carries.
    pub fn name(&self) -> &str {
        match self {
            RoleRef::Name(name) => name,
            RoleRef::Role(role) => &role.name,
        }
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_owned())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<&String> for RoleRef {
    fn from(name: &String) -> Self {
        RoleRef::Name(name.clone())
    }
}

impl From<Role> for RoleRef {
    fn from(role: Role) -> Self {
        RoleRef::Role(role)
    }
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        RoleRef::Role(role.clone())
    }
}

/// A role query: either a single role or a set of alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery {
    /// Exactly this role.
    One(RoleRef),
    /// Any (or, for `has_all_roles`, every) role in the list.
    Many(Vec<RoleRef>),
}

impl RoleQuery {
    /// Build a list query from anything convertible into role references.
    pub fn many<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RoleRef>,
    {
        RoleQuery::Many(roles.into_iter().map(Into::into).collect())
    }

    /// The references in this query, in order.
    pub fn refs(&self) -> &[RoleRef] {
        match self {
            RoleQuery::One(role) => std::slice::from_ref(role),
            RoleQuery::Many(roles) => roles,
        }
    }
}

impl From<RoleRef> for RoleQuery {
    fn from(role: RoleRef) -> Self {
        RoleQuery::One(role)
    }
}

impl From<&str> for RoleQuery {
    fn from(name: &str) -> Self {
        RoleQuery::One(name.into())
    }
}

impl From<String> for RoleQuery {
    fn from(name: String) -> Self {
        RoleQuery::One(name.into())
    }
}

impl From<Role> for RoleQuery {
    fn from(role: Role) -> Self {
        RoleQuery::One(role.into())
    }
}

impl From<&Role> for RoleQuery {
    fn from(role: &Role) -> Self {
        RoleQuery::One(role.into())
    }
}

impl<T: Into<RoleRef>> From<Vec<T>> for RoleQuery {
    fn from(roles: Vec<T>) -> Self {
        RoleQuery::many(roles)
    }
}

impl<T: Into<RoleRef>, const N: usize> From<[T; N]> for RoleQuery {
    fn from(roles: [T; N]) -> Self {
        RoleQuery::many(roles)
    }
}

impl<T: Into<RoleRef>> FromIterator<T> for RoleQuery {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        RoleQuery::many(iter)
    }
}

/// A permission given by name or as a loaded instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRef {
    Name(String),
    Permission(Permission),
}

impl PermissionRef {
    pub fn name(&self) -> &str {
        match self {
            PermissionRef::Name(name) => name,
            PermissionRef::Permission(permission) => &permission.name,
        }
    }
}

impl From<&str> for PermissionRef {
    fn from(name: &str) -> Self {
        PermissionRef::Name(name.to_owned())
    }
}

impl From<String> for PermissionRef {
    fn from(name: String) -> Self {
        PermissionRef::Name(name)
    }
}

impl From<&String> for PermissionRef {
    fn from(name: &String) -> Self {
        PermissionRef::Name(name.clone())
    }
}

impl From<Permission> for PermissionRef {
    fn from(permission: Permission) -> Self {
        PermissionRef::Permission(permission)
    }
}

impl From<&Permission> for PermissionRef {
    fn from(permission: &Permission) -> Self {
        PermissionRef::Permission(permission.clone())
    }
}
