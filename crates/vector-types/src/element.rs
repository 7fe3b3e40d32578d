//! Element types and vector payloads.
//!
//! The element type fixes the per-component wire width, the value bounds,
//! how magnitude is computed and the byte order of raw buffers.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::epoch::FormatEpoch;

/// Maximum dims for byte and float vectors.
pub const MAX_DIMS_COUNT: usize = 4096;

/// Maximum dims for bit vectors (in bits).
pub const MAX_DIMS_COUNT_BIT: usize = 4096 * 8;

/// Width of the trailing magnitude in raw buffers.
pub const MAGNITUDE_BYTES: usize = 4;

/// Byte order of a raw vector buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    pub fn put_f32(self, buf: &mut impl BufMut, value: f32) {
        match self {
            ByteOrder::BigEndian => buf.put_f32(value),
            ByteOrder::LittleEndian => buf.put_f32_le(value),
        }
    }

    /// Read the next f32; the caller checks `remaining() >= 4`.
    pub fn get_f32(self, buf: &mut impl Buf) -> f32 {
        match self {
            ByteOrder::BigEndian => buf.get_f32(),
            ByteOrder::LittleEndian => buf.get_f32_le(),
        }
    }
}

/// Component type of a dense vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Signed 8-bit integers
    Byte,
    /// IEEE-754 single precision
    #[default]
    Float,
    /// Packed bits, 8 dims per byte
    Bit,
}

impl ElementType {
    pub const ALL: [ElementType; 3] = [ElementType::Byte, ElementType::Float, ElementType::Bit];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Byte => "byte",
            ElementType::Float => "float",
            ElementType::Bit => "bit",
        }
    }

    /// Parse from a mapping name, returning None for unknown types.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "byte" => Some(ElementType::Byte),
            "float" => Some(ElementType::Float),
            "bit" => Some(ElementType::Bit),
            _ => None,
        }
    }

    /// Number of bytes the components of a `dims`-wide vector occupy.
    pub fn num_bytes(&self, dims: usize) -> usize {
        match self {
            ElementType::Byte => dims,
            ElementType::Float => dims * 4,
            ElementType::Bit => dims / 8,
        }
    }

    /// Number of stored components for `dims` (bit vectors pack 8 dims per byte).
    pub fn num_elements(&self, dims: usize) -> usize {
        match self {
            ElementType::Bit => dims / 8,
            ElementType::Byte | ElementType::Float => dims,
        }
    }

    /// Dims represented by `elements` stored components.
    pub fn dims_for_elements(&self, elements: usize) -> usize {
        match self {
            ElementType::Bit => elements * 8,
            ElementType::Byte | ElementType::Float => elements,
        }
    }

    /// Inclusive `(min, max)` dims accepted in a mapping.
    pub fn dims_range(&self) -> (usize, usize) {
        match self {
            ElementType::Bit => (8, MAX_DIMS_COUNT_BIT),
            ElementType::Byte | ElementType::Float => (1, MAX_DIMS_COUNT),
        }
    }

    /// Byte order of raw buffers for fields created at `epoch`.
    ///
    /// Only float buffers ever switched to little-endian.
    pub fn byte_order(&self, epoch: FormatEpoch) -> ByteOrder {
        match self {
            ElementType::Float if epoch.on_or_after(FormatEpoch::LittleEndianFloats) => {
                ByteOrder::LittleEndian
            }
            _ => ByteOrder::BigEndian,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "invalid element_type [{}]; available types are [byte, float, bit]",
                s
            )
        })
    }
}

/// A decoded vector payload.
///
/// Byte and bit vectors share the signed-byte representation; bit vectors
/// are never unpacked to booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorData {
    Floats(Vec<f32>),
    Bytes(Vec<i8>),
}

impl VectorData {
    pub fn len(&self) -> usize {
        match self {
            VectorData::Floats(v) => v.len(),
            VectorData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            VectorData::Floats(v) => Some(v),
            VectorData::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[i8]> {
        match self {
            VectorData::Bytes(v) => Some(v),
            VectorData::Floats(_) => None,
        }
    }

    /// Squared magnitude under `element_type`.
    ///
    /// Bit vectors report their popcount.
    pub fn squared_magnitude(&self, element_type: ElementType) -> f32 {
        match (self, element_type) {
            (VectorData::Bytes(v), ElementType::Bit) => popcount(v) as f32,
            (VectorData::Bytes(v), _) => v.iter().map(|&b| (b as i32 * b as i32) as f32).sum(),
            (VectorData::Floats(v), _) => v.iter().map(|x| x * x).sum(),
        }
    }

    /// Up to five leading components, as embedded in error messages.
    pub fn preview(&self) -> String {
        match self {
            VectorData::Floats(v) => preview_elements(v),
            VectorData::Bytes(v) => preview_elements(v),
        }
    }
}

/// Number of set bits across a packed bit vector.
pub fn popcount(bits: &[i8]) -> u32 {
    bits.iter().map(|&b| (b as u8).count_ones()).sum()
}

/// Render `Preview of invalid vector: [a, b, c, d, e, ...]`.
pub fn preview_elements<T: std::fmt::Debug>(values: &[T]) -> String {
    let shown: Vec<String> = values.iter().take(5).map(|v| format!("{:?}", v)).collect();
    let ellipsis = if values.len() >= 5 { ", ..." } else { "" };
    format!("Preview of invalid vector: [{}{}]", shown.join(", "), ellipsis)
}
