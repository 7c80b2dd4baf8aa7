//! Error types for field specifications

use thiserror::Error;

/// Result type for field specification operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors raised while building or checking a field specification.
///
/// Validation failures of candidate values are never reported through this
/// type; they are returned as data in a `ValidationResult`.
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Two constraints on the same field share a name
    #[error("duplicate constraint name on field '{field}': {name}")]
    DuplicateConstraintName { field: String, name: String },

    /// A value domain violates its structural invariants
    #[error("invalid value domain: {reason}")]
    InvalidDomain { reason: String },

    /// A constraint's parameter bag does not match its type
    #[error("invalid parameters for constraint '{name}': {reason}")]
    InvalidParams { name: String, reason: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldsError {
    pub(crate) fn invalid_domain(reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_params(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
