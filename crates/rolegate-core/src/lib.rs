//! # Rolegate Core
//!
//! Pure primitives for Rolegate: roles, permissions, their classifiers and
//! the catalogue snapshot that authorization decisions are made against.
//!
//! This crate contains no I/O and no storage. Stores produce these types,
//! the resolver in `rolegate-perms` consumes them.
//!
//! ## Key Types
//!
//! - [`Role`] - A named grouping of permissions with an optional parent
//! - [`Permission`] - A named grant, optionally an [`Action`] on an [`Object`]
//! - [`Catalogue`] - Immutable snapshot of every entity and association
//! - [`RoleRef`] / [`PermissionRef`] - Name-or-instance references
//! - [`RoleQuery`] - One role, or a list of alternatives
//!
//! ## Usage
//!
//! ```rust
//! use rolegate_core::{Catalogue, Permission, PermissionId, Role, RoleId};
//!
//! let catalogue = Catalogue::builder()
//!     .role(Role::new(RoleId::new(1), "admin"))
//!     .role(Role::new(RoleId::new(2), "editor").with_parent(RoleId::new(1)))
//!     .permission(Permission::new(PermissionId::new(1), "publish-post"))
//!     .attach(RoleId::new(2), PermissionId::new(1))
//!     .build();
//!
//! let editor = catalogue.find_role_by_name("editor").unwrap();
//! assert_eq!(editor.parent_id, Some(RoleId::new(1)));
//! assert!(catalogue.find_permission_by_name("does-not-exist").is_err());
//! ```

pub mod catalogue;
pub mod entity;
pub mod error;
pub mod reference;
pub mod types;
pub mod validation;

pub use catalogue::{Catalogue, CatalogueBuilder};
pub use entity::{Action, EntityKind, Object, Permission, Role};
pub use error::{CoreError, Result};
pub use reference::{PermissionRef, RoleQuery, RoleRef};
pub use types::{ActionId, ObjectId, PermissionId, RoleId, SubjectId};
pub use validation::{validate_name, MAX_NAME_LEN};
