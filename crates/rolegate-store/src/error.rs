//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entity with the same unique name already exists.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// A stored or requested id does not fit SQLite's signed integers.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Entity data failed validation.
    #[error("core error: {0}")]
    Core(#[from] rolegate_core::CoreError),
}

impl StoreError {
    pub(crate) fn poisoned(err: impl std::fmt::Display) -> Self {
        StoreError::LockPoisoned(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::IntegralValueOutOfRange(column, value) => StoreError::InvalidData(
                format!("column {} holds out-of-range id {}", column, value),
            ),
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
