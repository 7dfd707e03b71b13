//! Entity records as the store hands them out.
//!
//! Entities are plain data. Associations (role permissions, subject
//! memberships) live in the store and, once loaded, in the
//! [`Catalogue`](crate::Catalogue).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ActionId, ObjectId, PermissionId, RoleId};

/// A named grouping of permissions, optionally parented by another role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Parent role. `None` makes this role a root of the hierarchy.
    pub parent_id: Option<RoleId>,
}

impl Role {
    /// Create a root role.
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
        }
    }

    /// Set the parent role.
    pub fn with_parent(mut self, parent: RoleId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Whether this role has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A named grant, optionally composed of an action on an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    #[serde(default)]
    pub object_id: ObjectId,
    #[serde(default)]
    pub action_id: ActionId,
}

impl Permission {
    /// Create a permission with no action or object.
    pub fn new(id: PermissionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            object_id: ObjectId::NONE,
            action_id: ActionId::NONE,
        }
    }

    /// Compose the permission from an action on an object.
    pub fn on(mut self, action: ActionId, object: ObjectId) -> Self {
        self.action_id = action;
        self.object_id = object;
        self
    }
}

/// A verb classifier for permissions ("edit", "publish").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub name: String,
}

impl Action {
    pub fn new(id: ActionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A target classifier for permissions ("post", "invoice").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
}

impl Object {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The kinds of entity a store can mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Role,
    Permission,
    Action,
    Object,
    /// Subject memberships and direct grants.
    Subject,
}

impl EntityKind {
    /// Whether entities of this kind are part of the cached catalogue.
    pub fn is_catalogued(self) -> bool {
        !matches!(self, EntityKind::Subject)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Role => "role",
            EntityKind::Permission => "permission",
            EntityKind::Action => "action",
            EntityKind::Object => "object",
            EntityKind::Subject => "subject",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
