//! # Rolegate Store
//!
//! Storage abstraction for Rolegate. Provides a trait-based interface for
//! roles, permissions, their classifiers and subject assignments, with SQLite
//! and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`EntityStore`] trait,
//! allowing the authorizer to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! Every successful write publishes a [`ChangeEvent`] on the store's
//! [`Notifier`] before returning. That is how caches built on top of a store
//! learn that their snapshot went stale.
//!
//! ## Key Types
//!
//! - [`EntityStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Notifier`] / [`ChangeObserver`] - Synchronous change notification
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rolegate_core::{ActionId, ObjectId};
//! use rolegate_store::{EntityStore, SqliteStore};
//!
//! async fn example() -> rolegate_store::Result<()> {
//!     let store = SqliteStore::open("rolegate.db")?;
//!
//!     let admin = store.create_role("admin", None).await?;
//!     let editor = store.create_role("editor", Some(admin.id)).await?;
//!     let publish = store
//!         .create_permission("publish-post", ActionId::NONE, ObjectId::NONE)
//!         .await?;
//!     store.attach_permission(editor.id, publish.id).await?;
//!
//!     let catalogue = store.load_catalogue().await?;
//!     assert_eq!(catalogue.role_count(), 2);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use events::{ChangeEvent, ChangeObserver, ChangeOp, Notifier};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::EntityStore;
