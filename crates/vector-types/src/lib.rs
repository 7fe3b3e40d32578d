//! # vector-types
//!
//! Shared vocabulary for dense vector fields.
//!
//! This crate defines the types every other crate builds on:
//! - Element types and decoded vector payloads
//! - Similarities, their native comparison functions and scoring
//! - Format epochs pinning evolved behaviour per field
//! - The field error taxonomy
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use vector_types::{ElementType, VectorSimilarity};
//!
//! let score = VectorSimilarity::Cosine.score(1.0, ElementType::Float, 3);
//! assert_eq!(score, 1.0);
//! ```

pub mod config;
pub mod element;
pub mod epoch;
pub mod error;
pub mod heuristic;
pub mod similarity;

pub use config::Settings;
pub use element::{
    popcount, preview_elements, ByteOrder, ElementType, VectorData, MAGNITUDE_BYTES,
    MAX_DIMS_COUNT, MAX_DIMS_COUNT_BIT,
};
pub use epoch::FormatEpoch;
pub use error::{FieldError, SettingsError};
pub use heuristic::FilterHeuristic;
pub use similarity::{SimilarityFunction, VectorSimilarity};

/// Tolerance for unit-length checks and float comparisons.
pub const EPS: f32 = 1e-3;
