//! Per-field vector source loaders.
//!
//! Indexed fields are read back from the stored vector values, with cosine
//! magnitudes multiplied back in. Non-indexed fields decode their raw doc
//! value buffer; its trailing magnitude is read and dropped.

use serde_json::{Map, Number, Value};
use tracing::debug;
use vector_codec::{decode_raw_buffer, BufferError};
use vector_mapping::{DenseVectorField, FieldConfig};
use vector_segment::{DocId, SegmentReader};
use vector_types::{ElementType, VectorData};

use crate::error::SourceError;

/// Reads vectors of indexed fields.
#[derive(Debug, Clone, Copy)]
pub struct IndexedVectorLoader<'a> {
    config: &'a FieldConfig,
}

impl IndexedVectorLoader<'_> {
    pub fn load<R: SegmentReader + ?Sized>(
        &self,
        reader: &R,
        doc: DocId,
    ) -> Result<Option<VectorData>, SourceError> {
        let field = self.config.name();
        let Some(stored) = reader
            .vector_values(field)
            .and_then(|values| values.vector_for_doc(doc))
        else {
            return Ok(None);
        };

        let element_type = self.config.element_type();
        if matches!(stored, VectorData::Floats(_)) != (element_type == ElementType::Float) {
            return Err(SourceError::Buffer {
                field: field.to_string(),
                doc,
                source: BufferError::ElementType { element_type },
            });
        }
        let expected = self.config.num_elements();
        if stored.len() != expected {
            return Err(SourceError::Corrupted {
                field: field.to_string(),
                doc,
                expected,
                actual: stored.len(),
            });
        }

        let magnitude = reader.numeric_doc_value(&self.config.magnitude_field_name(), doc);
        let vector = match (stored, magnitude) {
            (VectorData::Floats(values), Some(magnitude)) => {
                VectorData::Floats(values.iter().map(|v| v * magnitude).collect())
            }
            _ => stored.clone(),
        };
        Ok(Some(vector))
    }
}

/// Reads raw buffers of non-indexed fields.
#[derive(Debug, Clone, Copy)]
pub struct DocValuesVectorLoader<'a> {
    config: &'a FieldConfig,
}

impl DocValuesVectorLoader<'_> {
    pub fn load<R: SegmentReader + ?Sized>(
        &self,
        reader: &R,
        doc: DocId,
    ) -> Result<Option<VectorData>, SourceError> {
        let field = self.config.name();
        let Some(raw) = reader.binary_doc_value(field, doc) else {
            return Ok(None);
        };
        let (vector, _magnitude) = decode_raw_buffer(
            self.config.element_type(),
            self.config.dims(),
            self.config.epoch(),
            raw,
        )
        .map_err(|source| SourceError::Buffer {
            field: field.to_string(),
            doc,
            source,
        })?;
        Ok(Some(vector))
    }
}

/// Loader for one field, chosen by whether the field is indexed.
#[derive(Debug, Clone, Copy)]
pub enum VectorSourceLoader<'a> {
    Indexed(IndexedVectorLoader<'a>),
    DocValues(DocValuesVectorLoader<'a>),
}

impl<'a> VectorSourceLoader<'a> {
    pub fn new(config: &'a FieldConfig) -> Self {
        if config.indexed() {
            VectorSourceLoader::Indexed(IndexedVectorLoader { config })
        } else {
            VectorSourceLoader::DocValues(DocValuesVectorLoader { config })
        }
    }

    /// The field's value for `doc`, or `None` if the document has none.
    pub fn load<R: SegmentReader + ?Sized>(
        &self,
        reader: &R,
        doc: DocId,
    ) -> Result<Option<VectorData>, SourceError> {
        match self {
            VectorSourceLoader::Indexed(loader) => loader.load(reader, doc),
            VectorSourceLoader::DocValues(loader) => loader.load(reader, doc),
        }
    }
}

/// JSON form of a reconstructed vector.
///
/// Floats use their shortest `f32` representation; byte and bit vectors
/// are plain integers.
pub fn vector_to_json(vector: &VectorData) -> Value {
    match vector {
        VectorData::Floats(values) => Value::Array(
            values
                .iter()
                .map(|&v| {
                    let shortest = v.to_string().parse::<f64>().unwrap_or(f64::from(v));
                    Number::from_f64(shortest).map_or(Value::Null, Value::Number)
                })
                .collect(),
        ),
        VectorData::Bytes(values) => Value::Array(values.iter().map(|&v| Value::from(v)).collect()),
    }
}

/// Rebuild the vector part of a document's source.
///
/// Fields without a value for `doc` and fields still waiting for their
/// dims are left out.
pub fn synthesize_source<R: SegmentReader + ?Sized>(
    reader: &R,
    doc: DocId,
) -> Result<Map<String, Value>, SourceError> {
    let mut source = Map::new();
    for name in reader.field_names() {
        let Some(config) = reader.field(name).and_then(DenseVectorField::as_ready) else {
            continue;
        };
        if let Some(vector) = VectorSourceLoader::new(config).load(reader, doc)? {
            source.insert(name.to_string(), vector_to_json(&vector));
        }
    }
    debug!(doc, fields = source.len(), "Synthesized vector source");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vector_mapping::MappingContext;
    use vector_segment::{KnnVectorValues, Segment, SegmentBuilder};
    use vector_types::{FormatEpoch, SimilarityFunction};

    fn field(mapping: Value, ctx: &MappingContext) -> DenseVectorField {
        DenseVectorField::from_json("emb", &mapping, ctx).unwrap()
    }

    fn segment(mapping: Value, docs: &[Value]) -> Segment {
        let mut builder =
            SegmentBuilder::new().with_field(field(mapping, &MappingContext::default()));
        for doc in docs {
            builder.add_document(&json!({ "emb": doc })).unwrap();
        }
        builder.build().unwrap()
    }

    fn load(segment: &Segment, doc: DocId) -> Option<VectorData> {
        let config = segment.config("emb").unwrap().unwrap();
        VectorSourceLoader::new(config).load(segment, doc).unwrap()
    }

    /// Hand-built reader for feeding damaged data to the loaders.
    struct FakeReader {
        field: DenseVectorField,
        values: KnnVectorValues,
        raw: Option<Vec<u8>>,
    }

    impl SegmentReader for FakeReader {
        fn max_doc(&self) -> DocId {
            1
        }

        fn field_names(&self) -> Vec<&str> {
            vec![self.field.name()]
        }

        fn field(&self, name: &str) -> Option<&DenseVectorField> {
            (name == self.field.name()).then_some(&self.field)
        }

        fn vector_values(&self, _field: &str) -> Option<&KnnVectorValues> {
            Some(&self.values)
        }

        fn numeric_doc_value(&self, _field: &str, _doc: DocId) -> Option<f32> {
            None
        }

        fn binary_doc_value(&self, _field: &str, doc: DocId) -> Option<&[u8]> {
            self.raw.as_deref().filter(|_| doc == 0)
        }
    }

    #[test]
    fn test_cosine_magnitude_restored() {
        let seg = segment(json!({"dims": 3, "similarity": "cosine"}), &[json!([3, 4, 0])]);
        let stored = seg.vector_values("emb").unwrap().vector_for_doc(0).unwrap();
        assert_eq!(stored, &VectorData::Floats(vec![0.6, 0.8, 0.0]));

        let Some(VectorData::Floats(restored)) = load(&seg, 0) else {
            panic!("expected floats");
        };
        for (got, want) in restored.iter().zip([3.0f32, 4.0, 0.0]) {
            assert!((got - want).abs() <= 1e-3 * want.abs().max(1.0));
        }
    }

    #[test]
    fn test_byte_vector_exact() {
        let seg = segment(
            json!({"dims": 3, "element_type": "byte", "similarity": "l2_norm"}),
            &[json!([-128, 0, 127])],
        );
        assert_eq!(load(&seg, 0), Some(VectorData::Bytes(vec![-128, 0, 127])));
        assert_eq!(
            synthesize_source(&seg, 0).unwrap()["emb"],
            json!([-128, 0, 127])
        );
    }

    #[test]
    fn test_bit_vector_stays_packed() {
        let seg = segment(json!({"dims": 16, "element_type": "bit"}), &[json!("ff01")]);
        assert_eq!(load(&seg, 0), Some(VectorData::Bytes(vec![-1, 1])));
    }

    #[test]
    fn test_doc_values_ignore_magnitude() {
        let seg = segment(json!({"dims": 2, "index": false}), &[json!([3.5, -4.25])]);
        assert!(seg.binary_doc_value("emb", 0).is_some());
        assert_eq!(load(&seg, 0), Some(VectorData::Floats(vec![3.5, -4.25])));
    }

    #[test]
    fn test_doc_values_big_endian_epoch() {
        let ctx = MappingContext::new(FormatEpoch::MagnitudeStored);
        let mut builder = SegmentBuilder::new().with_field(field(json!({"dims": 2}), &ctx));
        builder.add_document(&json!({"emb": [1.5, 2.0]})).unwrap();
        let seg = builder.build().unwrap();

        let raw = seg.binary_doc_value("emb", 0).unwrap();
        assert_eq!(&raw[0..4], &1.5f32.to_be_bytes());
        assert_eq!(load(&seg, 0), Some(VectorData::Floats(vec![1.5, 2.0])));
    }

    #[test]
    fn test_missing_doc_is_none() {
        let seg = segment(json!({"dims": 2}), &[json!([1, 0])]);
        assert_eq!(load(&seg, 5), None);
    }

    #[test]
    fn test_truncated_buffer_is_reported() {
        let reader = FakeReader {
            field: field(json!({"dims": 4, "index": false}), &MappingContext::default()),
            values: KnnVectorValues::new(SimilarityFunction::Euclidean),
            raw: Some(vec![0u8; 10]),
        };
        let err = synthesize_source(&reader, 0).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Buffer {
                source: BufferError::Length {
                    expected: 20,
                    actual: 10
                },
                ..
            }
        ));
    }

    #[test]
    fn test_short_vector_is_corruption() {
        let mut values = KnnVectorValues::new(SimilarityFunction::Euclidean);
        values.push(0, VectorData::Floats(vec![1.0, 2.0]));
        let reader = FakeReader {
            field: field(json!({"dims": 3, "similarity": "l2_norm"}), &MappingContext::default()),
            values,
            raw: None,
        };
        let err = synthesize_source(&reader, 0).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Corrupted {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(err.to_string().contains("field [emb] doc [0]"));
    }

    #[test]
    fn test_pending_field_skipped() {
        let seg = SegmentBuilder::new()
            .with_field(field(json!({}), &MappingContext::default()))
            .build()
            .unwrap();
        assert!(synthesize_source(&seg, 0).unwrap().is_empty());
    }

    #[test]
    fn test_float_json_uses_shortest_form() {
        assert_eq!(
            vector_to_json(&VectorData::Floats(vec![0.6, -1.0])),
            json!([0.6, -1.0])
        );
    }

    #[test]
    fn test_random_cosine_vectors_within_tolerance() {
        use rand::Rng;
        let mut rng = rand::rng();
        let vectors: Vec<Vec<f32>> = (0..20)
            .map(|_| (0..16).map(|_| rng.random_range(-10.0f32..10.0)).collect())
            .collect();
        let docs: Vec<Value> = vectors.iter().map(|v| json!(v)).collect();
        let seg = segment(json!({"dims": 16, "similarity": "cosine"}), &docs);

        for (doc, original) in vectors.iter().enumerate() {
            let Some(VectorData::Floats(restored)) = load(&seg, doc as DocId) else {
                panic!("expected floats");
            };
            for (got, want) in restored.iter().zip(original) {
                assert!((got - want).abs() <= 1e-3 * want.abs().max(1.0));
            }
        }
    }
}
