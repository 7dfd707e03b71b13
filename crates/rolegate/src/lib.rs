//! # Rolegate
//!
//! Role-based access control with hierarchical roles, direct grants and a
//! catalogue cache that stays coherent with the store.
//!
//! ## Overview
//!
//! - **Roles** form a forest. A child role inherits every permission its
//!   ancestors hold, and holding a child role counts as holding its
//!   ancestors.
//! - **Permissions** are attached to roles or granted to a subject directly,
//!   and may be classified by an action and an object.
//! - **Subjects** are opaque ids owned by the host application.
//!
//! Roles, permissions, actions and objects make up the catalogue. The
//! [`Authorizer`] keeps one catalogue snapshot in its [`AuthorizationCache`]
//! and drops it whenever the store reports a catalogue change. Subject
//! assignments are read from the store on every check.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolegate::{Authorizer, SubjectId};
//! use rolegate::store::SqliteStore;
//!
//! async fn example() -> rolegate::Result<()> {
//!     let store = SqliteStore::open("rolegate.db")?;
//!     let authz = Authorizer::new(store);
//!
//!     authz.create_role("admin", None).await?;
//!     authz.create_role("editor", Some("admin".into())).await?;
//!     authz.create_permission("publish-post", None, None).await?;
//!     authz.attach_permission("editor", "publish-post").await?;
//!
//!     let alice = SubjectId::new(1);
//!     authz.assign_role(alice, "editor").await?;
//!
//!     assert!(authz.has_role(alice, "admin").await?);
//!     assert!(authz.has_permission_to(alice, "publish-post").await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `rolegate::core` - Entities, ids and the catalogue snapshot
//! - `rolegate::store` - Storage abstraction, SQLite and in-memory stores
//! - `rolegate::perms` - Hierarchy resolution and the decision algorithm

pub mod authorizer;
pub mod cache;
pub mod config;
pub mod error;

// Re-export component crates
pub use rolegate_core as core;
pub use rolegate_perms as perms;
pub use rolegate_store as store;

// Re-export main types for convenience
pub use authorizer::{Authorizer, SubjectHandle};
pub use cache::{AuthorizationCache, CacheState, CacheStats};
pub use config::{AuthorizerConfig, CacheConfig};
pub use error::{AuthzError, Result};

// Re-export commonly used core types
pub use rolegate_core::{
    Action, ActionId, Catalogue, EntityKind, Object, ObjectId, Permission, PermissionId,
    PermissionRef, Role, RoleId, RoleQuery, RoleRef, SubjectId,
};
