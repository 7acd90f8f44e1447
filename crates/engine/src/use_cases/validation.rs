//! Common validation helpers for use cases.

use questkeep_domain::WorldId;

/// Largest page any listing or search returns.
pub const MAX_LIMIT: u32 = 500;

/// Validation error type.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{field_name} cannot be empty")]
    Empty { field_name: &'static str },

    #[error("{field_name} is invalid: {reason}")]
    Invalid {
        field_name: &'static str,
        reason: String,
    },

    #[error("{entity_type} {id} belongs to another world")]
    ForeignWorld {
        entity_type: &'static str,
        id: String,
    },
}

/// Validate a string is non-empty after trimming.
pub fn require_non_empty(value: &str, field_name: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field_name });
    }
    Ok(())
}

/// Validate that a referenced record lives in the world being written.
pub fn require_same_world(
    entity_type: &'static str,
    id: impl ToString,
    owner: WorldId,
    expected: WorldId,
) -> Result<(), ValidationError> {
    if owner != expected {
        return Err(ValidationError::ForeignWorld {
            entity_type,
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Resolve an optional page size against a default. Zero and anything above
/// [`MAX_LIMIT`] are rejected.
pub fn page_limit(limit: Option<u32>, default: u32) -> Result<usize, ValidationError> {
    let limit = limit.unwrap_or(default);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ValidationError::Invalid {
            field_name: "limit",
            reason: format!("must be between 1 and {}", MAX_LIMIT),
        });
    }
    Ok(limit as usize)
}
