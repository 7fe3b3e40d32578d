//! # vector-codec
//!
//! Validation and encoding of dense vector values.
//!
//! - Input parsing: number arrays and hex strings, with incremental
//!   dimension checks
//! - Element checks (range, integrality, finiteness) and magnitude checks
//! - Index entries: vectors, cosine magnitudes and raw buffers
//! - Per-document parsing, including promotion of fields without dims
//! - Query vector preparation

pub mod buffer;
pub mod document;
pub mod encoder;
pub mod input;
pub mod validate;

pub use buffer::{decode_raw_buffer, encode_raw_buffer, raw_buffer_len, BufferError};
pub use document::ParsedDocument;
pub use encoder::{IndexEntry, VectorEncoder};
pub use input::{decode_hex, encode_hex, parse_dimension_count, VectorInput, VectorShape};
pub use validate::{check_magnitude, check_vector_errors, is_not_unit_vector};

#[cfg(test)]
mod proptests;
