//! EntityStore trait: the abstract interface for authorization facts.
//!
//! This trait keeps the authorizer storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use rolegate_core::{
    Action, ActionId, Catalogue, Object, ObjectId, Permission, PermissionId, Role, RoleId,
    SubjectId,
};

use crate::error::Result;
use crate::events::Notifier;

/// The EntityStore trait: async interface for roles, permissions, their
/// classifiers and subject assignments.
///
/// # Design Notes
///
/// - **Ids**: assigned by the store, starting at 1 and never reused.
/// - **Names**: validated and unique per kind; a clash is `StoreError::Duplicate`.
/// - **Events**: every write that changes state publishes a `ChangeEvent` on
///   [`notifier`](Self::notifier) before returning. Role/permission
///   attachment is published as an update of the role; subject writes are
///   published with `EntityKind::Subject`.
/// - **Cascades**: deleting a role detaches it everywhere and turns its
///   children into roots; deleting an action or object resets the
///   permissions that used it to the unspecified sentinel.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>>;

    async fn find_action_by_name(&self, name: &str) -> Result<Option<Action>>;

    async fn find_object_by_name(&self, name: &str) -> Result<Option<Object>>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>>;

    /// The parent of a role, if it has one.
    async fn role_parent(&self, id: RoleId) -> Result<Option<Role>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Associations
    // ─────────────────────────────────────────────────────────────────────────

    /// Permissions attached to a role, ordered by id.
    async fn role_permissions(&self, role: RoleId) -> Result<Vec<PermissionId>>;

    /// Roles a permission is attached to, ordered by id.
    async fn permission_roles(&self, permission: PermissionId) -> Result<Vec<RoleId>>;

    /// Subjects assigned a role, ordered by id.
    async fn role_subjects(&self, role: RoleId) -> Result<Vec<SubjectId>>;

    /// Roles assigned to a subject, ordered by id.
    async fn subject_roles(&self, subject: SubjectId) -> Result<Vec<RoleId>>;

    /// Permissions granted directly to a subject, in grant order.
    async fn subject_permissions(&self, subject: SubjectId) -> Result<Vec<PermissionId>>;

    /// Subjects assigned any of the given roles, deduplicated and ordered by id.
    async fn subjects_with_roles(&self, roles: &[RoleId]) -> Result<Vec<SubjectId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Load every role, permission, action and object with their
    /// role/permission attachments.
    async fn load_catalogue(&self) -> Result<Catalogue>;

    // ─────────────────────────────────────────────────────────────────────────
    // Catalogue Writes
    // ─────────────────────────────────────────────────────────────────────────

    async fn create_role(&self, name: &str, parent: Option<RoleId>) -> Result<Role>;

    /// Replace a role's name and parent.
    ///
    /// No cycle check happens here; callers that accept untrusted parents
    /// must check first.
    async fn update_role(&self, role: &Role) -> Result<()>;

    async fn delete_role(&self, id: RoleId) -> Result<()>;

    async fn create_permission(
        &self,
        name: &str,
        action: ActionId,
        object: ObjectId,
    ) -> Result<Permission>;

    async fn update_permission(&self, permission: &Permission) -> Result<()>;

    async fn delete_permission(&self, id: PermissionId) -> Result<()>;

    async fn create_action(&self, name: &str) -> Result<Action>;

    async fn update_action(&self, action: &Action) -> Result<()>;

    async fn delete_action(&self, id: ActionId) -> Result<()>;

    async fn create_object(&self, name: &str) -> Result<Object>;

    async fn update_object(&self, object: &Object) -> Result<()>;

    async fn delete_object(&self, id: ObjectId) -> Result<()>;

    /// Attach a permission to a role. Returns `false` if it already was.
    async fn attach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool>;

    /// Detach a permission from a role. Returns `false` if it was not attached.
    async fn detach_permission(&self, role: RoleId, permission: PermissionId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Subject Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign roles to a subject. Roles already held are left alone.
    async fn assign_roles(&self, subject: SubjectId, roles: &[RoleId]) -> Result<()>;

    /// Returns `false` if the subject did not hold the role.
    async fn remove_role(&self, subject: SubjectId, role: RoleId) -> Result<bool>;

    /// Remove every role from a subject.
    async fn clear_roles(&self, subject: SubjectId) -> Result<()>;

    /// Grant a permission directly. Returns `false` if already granted.
    async fn grant_permission(&self, subject: SubjectId, permission: PermissionId)
        -> Result<bool>;

    /// Returns `false` if the permission was not granted directly.
    async fn revoke_permission(
        &self,
        subject: SubjectId,
        permission: PermissionId,
    ) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Notification
    // ─────────────────────────────────────────────────────────────────────────

    /// The registry this store publishes change events to.
    fn notifier(&self) -> &Notifier;
}
