//! # Rolegate Permissions
//!
//! Role hierarchy resolution and the permission decision algorithm.
//!
//! ## Overview
//!
//! Everything here is a pure computation over a [`Catalogue`] snapshot and,
//! for subject questions, the subject's own [`SubjectGrants`]. Nothing
//! blocks and nothing touches the store.
//!
//! A child role inherits everything its ancestors grant. A subject holds a
//! role if that role is in the closure of its assigned roles, and holds a
//! permission if it was granted directly or is attached to any role in that
//! closure.
//!
//! ## Key Types
//!
//! - [`HierarchyResolver`] - Bounded ancestor walks and role closures
//! - [`SubjectAuthority`] - `has_role`, `has_permission_to` and friends
//! - [`RoleAuthority`] - Role-scoped queries over the ancestor chain
//!
//! ## Usage
//!
//! ```rust
//! use rolegate_core::{Catalogue, Permission, PermissionId, Role, RoleId, SubjectId};
//! use rolegate_perms::{SubjectAuthority, SubjectGrants};
//!
//! let catalogue = Catalogue::builder()
//!     .role(Role::new(RoleId::new(1), "admin"))
//!     .role(Role::new(RoleId::new(2), "editor").with_parent(RoleId::new(1)))
//!     .permission(Permission::new(PermissionId::new(1), "publish-post"))
//!     .attach(RoleId::new(2), PermissionId::new(1))
//!     .build();
//!
//! let grants = SubjectGrants::new(SubjectId::new(1)).with_roles([RoleId::new(2)]);
//! let subject = SubjectAuthority::new(&grants, &catalogue);
//!
//! assert!(subject.has_role("admin").unwrap());
//! assert!(subject.has_permission_to("publish-post").unwrap());
//! ```
//!
//! [`Catalogue`]: rolegate_core::Catalogue

pub mod error;
pub mod resolver;
pub mod role;
pub mod subject;

pub use error::{PermsError, Result};
pub use resolver::{HierarchyResolver, ResolverConfig, RoleClosure, DEFAULT_MAX_DEPTH};
pub use role::RoleAuthority;
pub use subject::{SubjectAuthority, SubjectGrants};
