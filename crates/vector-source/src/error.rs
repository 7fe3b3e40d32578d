//! Source reconstruction error types.

use thiserror::Error;
use vector_codec::BufferError;
use vector_segment::{DocId, SegmentError};

/// Errors raised while replaying a document's vector source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Stored data does not match the field configuration
    #[error("field [{field}] doc [{doc}]: corrupted vector, expected {expected} elements but found {actual}")]
    Corrupted {
        field: String,
        doc: DocId,
        expected: usize,
        actual: usize,
    },

    /// Raw buffer could not be decoded
    #[error("field [{field}] doc [{doc}]: {source}")]
    Buffer {
        field: String,
        doc: DocId,
        #[source]
        source: BufferError,
    },

    #[error(transparent)]
    Segment(#[from] SegmentError),
}
