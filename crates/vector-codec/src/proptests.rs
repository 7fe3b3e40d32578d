use proptest::prelude::*;
use serde_json::{json, Value};
use vector_mapping::{DenseVectorField, FieldConfig, MappingContext};
use vector_types::{ElementType, FieldError, VectorData};

use crate::encoder::{IndexEntry, VectorEncoder};
use crate::input::VectorShape;

fn cosine_field(dims: usize) -> FieldConfig {
    DenseVectorField::from_json(
        "emb",
        &json!({"dims": dims, "similarity": "cosine"}),
        &MappingContext::default(),
    )
    .ok()
    .and_then(|f| f.as_ready().cloned())
    .expect("valid mapping")
}

fn arb_vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-1000.0f32..1000.0, 1..64)
        .prop_filter("non-zero magnitude", |v| v.iter().any(|x| x.abs() > 1e-3))
}

proptest! {
    /// Normalized cosine vectors are unit length and scale back to the input.
    #[test]
    fn prop_cosine_normalization(values in arb_vector()) {
        let cfg = cosine_field(values.len());
        let entries = VectorEncoder::new(&cfg).encode(VectorData::Floats(values.clone())).unwrap();
        let stored = match &entries[0] {
            IndexEntry::KnnVector { vector: VectorData::Floats(v), .. } => v.clone(),
            other => panic!("unexpected entry {other:?}"),
        };
        let magnitude = match entries.get(1) {
            Some(IndexEntry::Magnitude { magnitude, .. }) => *magnitude,
            _ => 1.0,
        };

        let length: f32 = stored.iter().map(|x| x * x).sum::<f32>().sqrt();
        prop_assert!((length - 1.0).abs() <= 1e-3);
        for (original, normalized) in values.iter().zip(&stored) {
            let restored = normalized * magnitude;
            prop_assert!((restored - original).abs() <= 1e-3 * original.abs().max(1.0));
        }
    }

    /// Integral byte components are accepted exactly within the signed byte range.
    #[test]
    fn prop_byte_range(value in -1000i32..1000) {
        let shape = VectorShape { field: "emb", element_type: ElementType::Byte, dims: 1 };
        let result = shape.parse_value(&json!([value]));
        if (-128..=127).contains(&value) {
            prop_assert_eq!(result.unwrap(), Some(VectorData::Bytes(vec![value as i8])));
        } else {
            let is_invalid_element = matches!(result, Err(FieldError::InvalidElement { .. }));
            prop_assert!(is_invalid_element);
        }
    }

    /// Any length other than the mapped dims fails.
    #[test]
    fn prop_wrong_length_rejected(dims in 1usize..32, len in 0usize..40) {
        prop_assume!(dims != len);
        let shape = VectorShape { field: "emb", element_type: ElementType::Float, dims };
        let value = Value::Array((0..len).map(|i| json!(i as f64 + 1.0)).collect());
        let err = shape.parse_value(&value).unwrap_err();
        let expected = if len > dims {
            matches!(err, FieldError::DimensionExceeded { .. })
        } else {
            matches!(err, FieldError::DimensionMismatch { .. })
        };
        prop_assert!(expected);
    }
}

#[test]
fn test_random_vectors_encode() {
    use rand::Rng;
    let mut rng = rand::rng();
    let cfg = cosine_field(16);
    for _ in 0..100 {
        let values: Vec<f32> = (0..16).map(|_| rng.random::<f32>() + 0.01).collect();
        let entries = VectorEncoder::new(&cfg)
            .encode(VectorData::Floats(values))
            .unwrap();
        assert!(!entries.is_empty());
    }
}
