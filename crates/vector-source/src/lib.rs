//! # vector-source
//!
//! Synthetic source for dense vector fields: rebuilds the value a document
//! was indexed with from whatever the segment stored for it.
//!
//! Byte and bit vectors come back exactly. Normalized cosine float vectors
//! come back within floating point rounding of the original (relative error
//! well under `1e-3`).

pub mod error;
pub mod loader;

pub use error::SourceError;
pub use loader::{
    synthesize_source, vector_to_json, DocValuesVectorLoader, IndexedVectorLoader,
    VectorSourceLoader,
};
