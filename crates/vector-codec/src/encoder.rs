//! Turns validated vectors into index entries.

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;
use vector_mapping::FieldConfig;
use vector_types::{ElementType, FieldError, SimilarityFunction, VectorData};

use crate::buffer::encode_raw_buffer;
use crate::input::{VectorInput, VectorShape};
use crate::validate::{check_magnitude, is_not_unit_vector};

/// One unit of index output for a document.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEntry {
    /// Vector handed to the nearest-neighbour structure
    KnnVector {
        field: String,
        vector: VectorData,
        function: SimilarityFunction,
    },
    /// Original length of a normalized cosine vector
    Magnitude { field: String, magnitude: f32 },
    /// Raw buffer of a non-indexed vector
    BinaryDocValue { field: String, bytes: Bytes },
}

impl IndexEntry {
    pub fn field(&self) -> &str {
        match self {
            IndexEntry::KnnVector { field, .. }
            | IndexEntry::Magnitude { field, .. }
            | IndexEntry::BinaryDocValue { field, .. } => field,
        }
    }
}

/// Encoder bound to one resolved field.
#[derive(Debug, Clone, Copy)]
pub struct VectorEncoder<'a> {
    config: &'a FieldConfig,
}

impl<'a> VectorEncoder<'a> {
    pub fn new(config: &'a FieldConfig) -> Self {
        Self { config }
    }

    pub fn shape(&self) -> VectorShape<'a> {
        VectorShape {
            field: self.config.name(),
            element_type: self.config.element_type(),
            dims: self.config.dims(),
        }
    }

    /// Parse and encode one document value. `null` produces no entries.
    pub fn encode_value(&self, value: &Value) -> Result<Vec<IndexEntry>, FieldError> {
        match self.shape().parse_value(value)? {
            Some(vector) => self.encode(vector),
            None => Ok(Vec::new()),
        }
    }

    /// Encode a vector whose components already passed element checks.
    pub fn encode(&self, vector: VectorData) -> Result<Vec<IndexEntry>, FieldError> {
        let config = self.config;
        if !config.indexed() {
            let bytes = encode_raw_buffer(config.element_type(), config.epoch(), &vector)
                .map_err(|e| FieldError::parse(config.name(), e.to_string()))?;
            debug!(field = %config.name(), len = bytes.len(), "Encoded raw vector");
            return Ok(vec![IndexEntry::BinaryDocValue {
                field: config.name().to_string(),
                bytes,
            }]);
        }

        let function = config.similarity_function().ok_or_else(|| {
            FieldError::configuration(config.name(), "indexed field has no similarity")
        })?;
        check_magnitude(
            config.name(),
            config.element_type(),
            config.similarity(),
            &vector,
        )?;

        let mut entries = Vec::with_capacity(2);
        let (vector, magnitude) = self.normalize(vector);
        entries.push(IndexEntry::KnnVector {
            field: config.name().to_string(),
            vector,
            function,
        });
        if let Some(magnitude) = magnitude {
            entries.push(IndexEntry::Magnitude {
                field: config.magnitude_field_name(),
                magnitude,
            });
        }
        debug!(field = %config.name(), normalized = magnitude.is_some(), "Encoded vector");
        Ok(entries)
    }

    /// Validate a query vector and return the copy used for search.
    ///
    /// Cosine float fields receive a normalized copy; the input is untouched.
    pub fn prepare_query(&self, input: &VectorInput) -> Result<VectorData, FieldError> {
        let vector = self.shape().parse_input(input)?;
        check_magnitude(
            self.config.name(),
            self.config.element_type(),
            self.config.similarity(),
            &vector,
        )?;
        Ok(self.normalize(vector).0)
    }

    fn normalize(&self, vector: VectorData) -> (VectorData, Option<f32>) {
        if !self.config.normalizes_cosine() {
            return (vector, None);
        }
        let squared = vector.squared_magnitude(ElementType::Float);
        match vector {
            VectorData::Floats(mut values) if is_not_unit_vector(squared) => {
                let length = squared.sqrt();
                for value in values.iter_mut() {
                    *value /= length;
                }
                (VectorData::Floats(values), Some(length))
            }
            other => (other, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vector_mapping::{DenseVectorField, MappingContext};
    use vector_types::FormatEpoch;

    fn config(mapping: Value, epoch: FormatEpoch) -> FieldConfig {
        DenseVectorField::from_json("emb", &mapping, &MappingContext::new(epoch))
            .unwrap()
            .as_ready()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_cosine_normalizes_and_stores_magnitude() {
        let cfg = config(json!({"dims": 3, "similarity": "cosine"}), FormatEpoch::CURRENT);
        let entries = VectorEncoder::new(&cfg).encode_value(&json!([3, 4, 0])).unwrap();
        assert_eq!(
            entries,
            vec![
                IndexEntry::KnnVector {
                    field: "emb".into(),
                    vector: VectorData::Floats(vec![0.6, 0.8, 0.0]),
                    function: SimilarityFunction::DotProduct,
                },
                IndexEntry::Magnitude {
                    field: "emb.magnitude".into(),
                    magnitude: 5.0,
                },
            ]
        );
    }

    #[test]
    fn test_unit_cosine_vector_is_not_rewritten() {
        let cfg = config(json!({"dims": 2, "similarity": "cosine"}), FormatEpoch::CURRENT);
        let entries = VectorEncoder::new(&cfg).encode_value(&json!([0.6, 0.8])).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_cosine_before_normalization_epoch() {
        let cfg = config(
            json!({"dims": 2, "similarity": "cosine", "index": true}),
            FormatEpoch::LittleEndianFloats,
        );
        let entries = VectorEncoder::new(&cfg).encode_value(&json!([3, 4])).unwrap();
        assert_eq!(
            entries,
            vec![IndexEntry::KnnVector {
                field: "emb".into(),
                vector: VectorData::Floats(vec![3.0, 4.0]),
                function: SimilarityFunction::Cosine,
            }]
        );
    }

    #[test]
    fn test_byte_field_entries() {
        let cfg = config(
            json!({"dims": 2, "element_type": "byte", "similarity": "dot_product"}),
            FormatEpoch::CURRENT,
        );
        let entries = VectorEncoder::new(&cfg).encode_value(&json!([10, -20])).unwrap();
        assert_eq!(
            entries,
            vec![IndexEntry::KnnVector {
                field: "emb".into(),
                vector: VectorData::Bytes(vec![10, -20]),
                function: SimilarityFunction::DotProduct,
            }]
        );
    }

    #[test]
    fn test_non_indexed_writes_raw_buffer() {
        let cfg = config(json!({"dims": 2, "index": false}), FormatEpoch::CURRENT);
        let entries = VectorEncoder::new(&cfg).encode_value(&json!([3, 4])).unwrap();
        match &entries[..] {
            [IndexEntry::BinaryDocValue { field, bytes }] => {
                assert_eq!(field, "emb");
                assert_eq!(bytes.len(), 12);
            }
            other => panic!("unexpected entries {other:?}"),
        }
    }

    #[test]
    fn test_non_indexed_skips_magnitude_checks() {
        let cfg = config(json!({"dims": 2, "index": false}), FormatEpoch::CURRENT);
        assert!(VectorEncoder::new(&cfg).encode_value(&json!([0, 0])).is_ok());
        assert!(VectorEncoder::new(&cfg).encode_value(&json!([1, 1e40])).is_err());
    }

    #[test]
    fn test_null_produces_nothing() {
        let cfg = config(json!({"dims": 2}), FormatEpoch::CURRENT);
        assert!(VectorEncoder::new(&cfg)
            .encode_value(&Value::Null)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_prepare_query_copies_and_normalizes() {
        let cfg = config(json!({"dims": 2, "similarity": "cosine"}), FormatEpoch::CURRENT);
        let input = VectorInput::from(vec![3.0f32, 4.0]);
        let prepared = VectorEncoder::new(&cfg).prepare_query(&input).unwrap();
        assert_eq!(prepared, VectorData::Floats(vec![0.6, 0.8]));
        assert_eq!(input, VectorInput::Numbers(vec![3.0, 4.0]));
    }

    #[test]
    fn test_prepare_query_rejects_zero_cosine() {
        let cfg = config(json!({"dims": 2, "similarity": "cosine"}), FormatEpoch::CURRENT);
        let err = VectorEncoder::new(&cfg)
            .prepare_query(&VectorInput::from(vec![0.0f32, 0.0]))
            .unwrap_err();
        assert!(matches!(err, FieldError::InvalidMagnitude { .. }));
    }
}
