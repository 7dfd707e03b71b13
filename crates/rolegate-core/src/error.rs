//! Error types for Rolegate Core.

use thiserror::Error;

/// Errors raised when resolving names or validating entity data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No role with the given name exists.
    #[error("there is no role named `{0}`")]
    RoleDoesNotExist(String),

    /// No permission with the given name exists.
    #[error("there is no permission named `{0}`")]
    PermissionDoesNotExist(String),

    /// No object with the given name exists.
    #[error("there is no object named `{0}`")]
    ObjectDoesNotExist(String),

    /// No action with the given name exists.
    #[error("there is no action named `{0}`")]
    ActionDoesNotExist(String),

    /// An entity name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl CoreError {
    /// Whether this error reports a failed name lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::RoleDoesNotExist(_)
                | CoreError::PermissionDoesNotExist(_)
                | CoreError::ObjectDoesNotExist(_)
                | CoreError::ActionDoesNotExist(_)
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
