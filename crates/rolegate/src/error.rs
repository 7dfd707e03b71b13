//! Error types for the authorizer.

use rolegate_core::CoreError;
use rolegate_perms::PermsError;
use rolegate_store::StoreError;
use thiserror::Error;

/// Errors that can occur during authorization operations.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A name did not resolve to an entity.
    #[error("lookup error: {0}")]
    Core(#[from] CoreError),

    /// Hierarchy resolution failed.
    #[error("resolution error: {0}")]
    Perms(#[from] PermsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The request is well-formed but not allowed.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl AuthzError {
    /// Whether this error reports a missing role, permission, action or object.
    pub fn is_not_found(&self) -> bool {
        match self {
            AuthzError::Core(e) => e.is_not_found(),
            AuthzError::Perms(e) => e.is_not_found(),
            AuthzError::Store(StoreError::NotFound(_)) => true,
            AuthzError::Store(StoreError::Core(e)) => e.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error reports a cycle in the role hierarchy.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, AuthzError::Perms(PermsError::CyclicHierarchy { .. }))
    }
}

/// Result type for authorizer operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
