//! # vector-segment
//!
//! An in-memory, read-only segment for dense vector fields.
//!
//! Documents are encoded with `vector-codec` and their index entries are
//! kept in per-field stores:
//! - Vector values addressed by ordinal, with doc/ordinal maps
//! - Numeric doc values (cosine magnitudes)
//! - Binary doc values (raw buffers of non-indexed fields)
//! - A usearch HNSW graph for float fields whose format has one

pub mod error;
pub mod graph;
pub mod segment;
pub mod values;

pub use error::SegmentError;
pub use graph::VectorGraph;
pub use segment::{Segment, SegmentBuilder, SegmentReader};
pub use values::{DocId, KnnVectorValues};
