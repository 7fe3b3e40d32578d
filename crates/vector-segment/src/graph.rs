//! HNSW graph over float vectors using usearch.
//!
//! Graph parameters come from the field's vectors format. Quantized formats
//! store reduced-precision scalars, so distances returned by a search are
//! approximate and callers rescore when they need exact values.

use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};
use vector_mapping::{GraphParams, Quantization, VectorsFormat};
use vector_types::{SimilarityFunction, VectorData};

use crate::error::SegmentError;
use crate::values::{DocId, KnnVectorValues};

/// Search depth used when the caller does not ask for more candidates.
pub const DEFAULT_EXPANSION_SEARCH: usize = 100;

/// HNSW graph wrapper around usearch.
pub struct VectorGraph {
    index: Index,
    function: SimilarityFunction,
    dims: usize,
    format_name: &'static str,
}

impl std::fmt::Debug for VectorGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorGraph")
            .field("format", &self.format_name)
            .field("function", &self.function)
            .field("dims", &self.dims)
            .field("size", &self.index.size())
            .finish()
    }
}

/// usearch options for a graph with `params`.
pub fn index_options(
    dims: usize,
    params: GraphParams,
    quantization: Quantization,
    function: SimilarityFunction,
) -> IndexOptions {
    IndexOptions {
        dimensions: dims,
        metric: metric(function),
        quantization: scalar_kind(quantization, function),
        connectivity: params.m as usize,
        expansion_add: params.ef_construction as usize,
        expansion_search: DEFAULT_EXPANSION_SEARCH,
        multi: false, // Single vector per doc
    }
}

fn metric(function: SimilarityFunction) -> MetricKind {
    match function {
        SimilarityFunction::Euclidean => MetricKind::L2sq,
        SimilarityFunction::Cosine => MetricKind::Cos,
        SimilarityFunction::DotProduct | SimilarityFunction::MaximumInnerProduct => {
            MetricKind::IP
        }
    }
}

// i8 scalars assume components in [-1, 1], which only holds for unit vectors.
fn scalar_kind(quantization: Quantization, function: SimilarityFunction) -> ScalarKind {
    let unit = matches!(
        function,
        SimilarityFunction::Cosine | SimilarityFunction::DotProduct
    );
    match quantization {
        Quantization::None => ScalarKind::F32,
        Quantization::Int8 | Quantization::Int4 if unit => ScalarKind::I8,
        Quantization::Int8 | Quantization::Int4 | Quantization::Binary => ScalarKind::F16,
    }
}

/// Convert a usearch distance back to the raw value of `function`.
fn raw_similarity(function: SimilarityFunction, distance: f32) -> f32 {
    match function {
        SimilarityFunction::Euclidean => distance.max(0.0).sqrt(),
        SimilarityFunction::Cosine
        | SimilarityFunction::DotProduct
        | SimilarityFunction::MaximumInnerProduct => 1.0 - distance,
    }
}

impl VectorGraph {
    /// Build a graph holding every vector in `values`.
    ///
    /// Returns `None` when the format has no graph or the values are not floats.
    pub fn build(
        format: &VectorsFormat,
        dims: usize,
        values: &KnnVectorValues,
    ) -> Result<Option<Self>, SegmentError> {
        let Some(params) = format.graph else {
            return Ok(None);
        };
        let options = index_options(dims, params, format.quantization, values.function());
        let index = Index::new(&options).map_err(|e| SegmentError::Index(e.to_string()))?;
        index
            .reserve(values.len())
            .map_err(|e| SegmentError::Index(e.to_string()))?;

        for (doc, vector) in values.iter() {
            let VectorData::Floats(components) = vector else {
                return Ok(None);
            };
            index
                .add(u64::from(doc), components)
                .map_err(|e| SegmentError::Index(e.to_string()))?;
        }

        info!(
            format = format.name,
            dims,
            vectors = index.size(),
            m = params.m,
            "Built vector graph"
        );
        Ok(Some(Self {
            index,
            function: values.function(),
            dims,
            format_name: format.name,
        }))
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format_name(&self) -> &'static str {
        self.format_name
    }

    /// Nearest `count` documents accepted by `filter`, best first, as
    /// `(doc, raw similarity)` pairs.
    pub fn search(
        &self,
        query: &[f32],
        count: usize,
        filter: impl Fn(DocId) -> bool,
    ) -> Result<Vec<(DocId, f32)>, SegmentError> {
        if query.len() != self.dims {
            return Err(SegmentError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }
        let results = self
            .index
            .filtered_search(query, count, |key: u64| {
                DocId::try_from(key).is_ok_and(&filter)
            })
            .map_err(|e| SegmentError::Index(e.to_string()))?;

        let hits: Vec<(DocId, f32)> = results
            .keys
            .iter()
            .zip(results.distances.iter())
            .filter_map(|(&key, &distance)| {
                DocId::try_from(key)
                    .ok()
                    .map(|doc| (doc, raw_similarity(self.function, distance)))
            })
            .collect();

        debug!(count, found = hits.len(), "Graph search complete");
        Ok(hits)
    }
}
