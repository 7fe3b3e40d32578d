//! End-to-end test infrastructure for dense vector fields.
//!
//! Provides a shared TestHarness and helper functions for scenario tests
//! covering the mapping -> encode -> segment -> query -> source pipeline.

use rand::Rng;
use serde_json::Value;

use vector_mapping::{DenseVectorField, FieldConfig, MappingContext};
use vector_query::{create_knn_query, Hit, KnnExecutor, KnnQuery, KnnRequest, SearchDefaults};
use vector_segment::{DocId, Segment, SegmentBuilder, SegmentReader};

/// Name of the vector field every harness maps.
pub const FIELD: &str = "emb";

/// Shared test harness for E2E tests.
///
/// Holds one dense_vector field and the segment built from the documents
/// handed to it.
pub struct TestHarness {
    pub segment: Segment,
    pub defaults: SearchDefaults,
}

impl TestHarness {
    /// Map [`FIELD`] with `mapping` and index `vectors`, one per document.
    pub fn new(mapping: Value, vectors: &[Value]) -> Self {
        Self::with_context(mapping, vectors, &MappingContext::default())
    }

    pub fn with_context(mapping: Value, vectors: &[Value], ctx: &MappingContext) -> Self {
        let field = DenseVectorField::from_json(FIELD, &mapping, ctx)
            .expect("Failed to resolve test mapping");
        let mut builder = SegmentBuilder::new().with_field(field);
        for vector in vectors {
            builder
                .add_document(&document(vector.clone()))
                .expect("Failed to index test document");
        }
        Self {
            segment: builder.build().expect("Failed to build test segment"),
            defaults: SearchDefaults::default(),
        }
    }

    pub fn field(&self) -> &DenseVectorField {
        self.segment.field(FIELD).expect("Test field missing")
    }

    pub fn config(&self) -> &FieldConfig {
        self.field().as_ready().expect("Test field has no dims")
    }

    /// Compose the query for `request`.
    pub fn query(&self, request: &KnnRequest) -> KnnQuery {
        create_knn_query(self.field(), request, &self.defaults).expect("Failed to build query")
    }

    /// Compose and run `request`.
    pub fn search(&self, request: &KnnRequest) -> Vec<Hit> {
        KnnExecutor::new(&self.segment)
            .execute(&self.query(request))
            .expect("Failed to execute query")
    }

    pub fn doc_count(&self) -> DocId {
        self.segment.max_doc()
    }
}

/// A document holding `value` under [`FIELD`].
pub fn document(value: Value) -> Value {
    let mut doc = serde_json::Map::new();
    doc.insert(FIELD.to_string(), value);
    Value::Object(doc)
}

/// `prefix` followed by zeros up to `dims` components.
pub fn padded(prefix: &[f32], dims: usize) -> Vec<f32> {
    let mut vector = prefix.to_vec();
    vector.resize(dims, 0.0);
    vector
}

/// Random vector with components in `[-scale, scale)`, never all zero.
pub fn random_vector(dims: usize, scale: f32) -> Vec<f32> {
    let mut rng = rand::rng();
    let mut vector: Vec<f32> = (0..dims).map(|_| rng.random_range(-scale..scale)).collect();
    vector[0] += scale * 2.0;
    vector
}

/// Random vector of length one.
pub fn random_unit_vector(dims: usize) -> Vec<f32> {
    let vector = random_vector(dims, 1.0);
    let length = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    vector.into_iter().map(|v| v / length).collect()
}

/// Assert `|actual - expected| <= tolerance * max(|expected|, 1)` per component.
pub fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "length differs");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance * e.abs().max(1.0),
            "component {} differs: {} vs {}",
            i,
            a,
            e
        );
    }
}
