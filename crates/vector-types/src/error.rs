//! Error taxonomy for dense vector fields.
//!
//! Configuration and schema-evolution errors abort the whole mapping change.
//! Every other variant is local to one document or one query.

use thiserror::Error;

/// Errors raised while defining, writing or querying a dense vector field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Invalid combination of element type, similarity, index options and dims
    #[error("Configuration error for field [{field}]: {reason}")]
    Configuration { field: String, reason: String },

    /// Vector length differs from the mapped dimensions
    #[error("The [dense_vector] field [{field}] has a different number of dimensions [{actual}] than defined in the mapping [{expected}]")]
    DimensionMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// More elements arrived than the mapping allows
    #[error("The [dense_vector] field [{field}] has more dimensions than defined in the mapping [{expected}]")]
    DimensionExceeded { field: String, expected: usize },

    /// Out-of-range, non-integral, NaN or infinite component
    #[error("Invalid element in field [{field}]: {message}")]
    InvalidElement { field: String, message: String },

    /// Zero-magnitude cosine vector or non-unit dot-product vector
    #[error("Invalid magnitude in field [{field}]: {message}")]
    InvalidMagnitude { field: String, message: String },

    /// kNN search against a field mapped with `index: false`
    #[error("to perform knn search on field [{field}], its mapping must have [index] set to [true]")]
    FieldNotIndexed { field: String },

    /// The query shape is not supported for the field's element type
    #[error("Field [{field}] with element_type [{element_type}] does not support {operation}")]
    UnsupportedElementTypeForQuery {
        field: String,
        element_type: String,
        operation: String,
    },

    /// An `index_options` (or other parameter) update that cannot be applied in place
    #[error("Mapping update rejected for field [{field}]: {reason}")]
    SchemaEvolutionRejected { field: String, reason: String },

    /// Malformed input token
    #[error("Failed to parse field [{field}]: {message}")]
    Parse { field: String, message: String },
}

impl FieldError {
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError::Parse {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the error is local to a single document or query.
    ///
    /// Non-local errors abort the entire mapping change.
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            FieldError::Configuration { .. } | FieldError::SchemaEvolutionRejected { .. }
        )
    }
}

/// Error loading [`crate::Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Layered config could not be built or deserialized
    #[error("Configuration error: {0}")]
    Load(String),

    /// Values loaded but inconsistent
    #[error("Invalid settings: {0}")]
    Invalid(String),
}
