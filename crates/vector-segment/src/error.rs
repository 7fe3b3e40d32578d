//! Segment error types.

use thiserror::Error;
use vector_types::FieldError;

/// Errors raised while building or searching a segment.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A document value failed validation
    #[error(transparent)]
    Field(#[from] FieldError),

    /// usearch graph error
    #[error("Index error: {0}")]
    Index(String),

    /// Query vector width differs from the graph
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Documents must be JSON objects
    #[error("Malformed document: {0}")]
    Document(String),

    /// No dense_vector field with this name
    #[error("Unknown field: {0}")]
    UnknownField(String),
}
