//! # vector-mapping
//!
//! Field definitions for dense vectors.
//!
//! This crate turns mapping objects into immutable field configurations:
//! - Index option variants and the order in which they may be upgraded
//! - `index_options` parsing, gated by format epoch and feature flags
//! - Default selection, deferred until dims are known
//! - Mapping updates (schema evolution)
//! - Vectors format descriptors for the segment layer

pub mod field;
pub mod format;
pub mod index_options;
pub mod parse;

pub use field::{
    default_index_options, validate_dims, DefaultIndexOptions, DenseVectorField, FieldConfig,
    FieldMapping, MappingContext, PendingField, CONTENT_TYPE, MAGNITUDE_SUFFIX,
};
pub use format::{ClusterParams, GraphParams, Quantization, VectorsFormat};
pub use index_options::{
    IndexOptions, RescoreVector, VectorIndexType, BBQ_DIMS_DEFAULT_THRESHOLD, BBQ_MIN_DIMS,
    DEFAULT_EF_CONSTRUCTION, DEFAULT_M, DEFAULT_N_PROBE, DEFAULT_OVERSAMPLE,
};
pub use parse::parse_index_options;
