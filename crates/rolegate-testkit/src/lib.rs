//! # Rolegate Testkit
//!
//! Testing utilities for Rolegate.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Seeded authorizers described by name, loadable from JSON
//! - **Generators**: Proptest strategies for role forests and subjects
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use rolegate_testkit::generators::ForestParams;
//!
//! proptest! {
//!     #[test]
//!     fn closure_contains_assigned_roles(params: ForestParams) {
//!         let catalogue = params.catalogue();
//!         let grants = params.grants();
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use rolegate_testkit::fixtures::FixtureSpec;
//!
//! let spec = FixtureSpec::from_json(r#"{
//!     "roles": [
//!         { "name": "admin" },
//!         { "name": "editor", "parent": "admin" }
//!     ],
//!     "subjects": [ { "id": 1, "roles": ["editor"] } ]
//! }"#).unwrap();
//! assert_eq!(spec.roles.len(), 2);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{FixtureSpec, PermissionSpec, RoleSpec, SubjectSpec, TestFixture};
pub use generators::{catalogue_from_parents, ring, role_forest, ForestParams};
