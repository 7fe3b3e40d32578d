//! Raw binary layout for non-indexed vectors.
//!
//! Components are written back to back in the field's byte order, followed
//! by a 4-byte magnitude when the field's epoch stores one. The magnitude is
//! the plain vector length (popcount for bit vectors) and is never applied
//! on read.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use vector_types::{ElementType, FormatEpoch, VectorData, MAGNITUDE_BYTES};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("raw vector buffer holds {actual} bytes but {expected} were expected")]
    Length { expected: usize, actual: usize },

    #[error("raw vector buffer does not match element type [{element_type}]")]
    ElementType { element_type: ElementType },
}

/// Expected buffer size for a `dims`-wide vector.
pub fn raw_buffer_len(element_type: ElementType, dims: usize, epoch: FormatEpoch) -> usize {
    let magnitude = if epoch.stores_magnitude() {
        MAGNITUDE_BYTES
    } else {
        0
    };
    element_type.num_bytes(dims) + magnitude
}

pub fn encode_raw_buffer(
    element_type: ElementType,
    epoch: FormatEpoch,
    vector: &VectorData,
) -> Result<Bytes, BufferError> {
    let dims = element_type.dims_for_elements(vector.len());
    let order = element_type.byte_order(epoch);
    let mut buf = BytesMut::with_capacity(raw_buffer_len(element_type, dims, epoch));
    match (element_type, vector) {
        (ElementType::Float, VectorData::Floats(values)) => {
            for &value in values {
                order.put_f32(&mut buf, value);
            }
        }
        (ElementType::Byte | ElementType::Bit, VectorData::Bytes(values)) => {
            for &value in values {
                buf.put_i8(value);
            }
        }
        _ => return Err(BufferError::ElementType { element_type }),
    }
    if epoch.stores_magnitude() {
        order.put_f32(&mut buf, vector.squared_magnitude(element_type).sqrt());
    }
    Ok(buf.freeze())
}

/// Decode a buffer written by [`encode_raw_buffer`].
///
/// Returns the components and the trailing magnitude when present.
pub fn decode_raw_buffer(
    element_type: ElementType,
    dims: usize,
    epoch: FormatEpoch,
    raw: &[u8],
) -> Result<(VectorData, Option<f32>), BufferError> {
    let expected = raw_buffer_len(element_type, dims, epoch);
    if raw.len() != expected {
        return Err(BufferError::Length {
            expected,
            actual: raw.len(),
        });
    }
    let order = element_type.byte_order(epoch);
    let mut buf = raw;
    let elements = element_type.num_elements(dims);
    let vector = match element_type {
        ElementType::Float => {
            VectorData::Floats((0..elements).map(|_| order.get_f32(&mut buf)).collect())
        }
        ElementType::Byte | ElementType::Bit => {
            VectorData::Bytes((0..elements).map(|_| buf.get_i8()).collect())
        }
    };
    let magnitude = (buf.remaining() >= MAGNITUDE_BYTES).then(|| order.get_f32(&mut buf));
    Ok((vector, magnitude))
}
