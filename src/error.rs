//! Crate-wide error type.

use crate::typed::ValidationErrors;
use thiserror::Error;

/// Error is returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: String, id: String },

    #[error("{path}: shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("{entity}: unknown field: {field}")]
    UnknownField { entity: String, field: String },

    #[error("{entity}: primary key cannot be changed")]
    PrimaryKeyChange { entity: String },

    #[error("{entity} with id {id} already exists")]
    DuplicateEntity { entity: String, id: String },

    #[error("entity is not tracked: {0}")]
    NotTracked(String),

    #[error("{path}: invalid path: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot encode document: {0}")]
    Encode(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage: {0}")]
    Storage(String),
}

impl Error {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(
        path: impl std::fmt::Display,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::ShapeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns true if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::shape_mismatch(".instructions.cooking", "map", "list");
        assert_eq!(
            err.to_string(),
            ".instructions.cooking: shape mismatch: expected map, got list"
        );
        assert_eq!(
            Error::not_found("Recipe", 7).to_string(),
            "Recipe with id 7 not found"
        );
        assert!(Error::not_found("Recipe", 7).is_not_found());
    }
}
