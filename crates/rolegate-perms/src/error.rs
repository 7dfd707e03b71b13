//! Error types for permission resolution.

use thiserror::Error;

/// Errors that can occur while resolving roles and permissions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// A role was reached twice while walking up the hierarchy.
    #[error("cyclic role hierarchy: role `{role}` is its own ancestor")]
    CyclicHierarchy { role: String },

    /// The ancestor chain is longer than the configured limit.
    #[error("role hierarchy above `{role}` exceeds {limit} levels")]
    HierarchyTooDeep { role: String, limit: usize },

    /// Name resolution failed.
    #[error("core error: {0}")]
    Core(#[from] rolegate_core::CoreError),
}

impl PermsError {
    /// Whether this error reports a failed name lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PermsError::Core(e) if e.is_not_found())
    }
}

/// Result type for permission resolution.
pub type Result<T> = std::result::Result<T, PermsError>;
