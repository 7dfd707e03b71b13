//! Validation of entity data before it reaches a store.

use crate::error::{CoreError, Result};

/// Longest accepted entity name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Validate an entity name.
///
/// Names must be non-empty, at most [`MAX_NAME_LEN`] bytes, free of
/// surrounding whitespace and free of control characters.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidName("name must not be empty".into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::InvalidName(format!(
            "name exceeds {} bytes",
            MAX_NAME_LEN
        )));
    }

    if name.trim() != name {
        return Err(CoreError::InvalidName(format!(
            "`{}` has leading or trailing whitespace",
            name
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(CoreError::InvalidName(
            "name contains control characters".into(),
        ));
    }

    Ok(())
}
