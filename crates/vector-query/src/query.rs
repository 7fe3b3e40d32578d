//! Composed kNN queries.
//!
//! A query is a base search (exact scan, graph search or cluster probe)
//! wrapped by zero or more adapters. The value is inert; executing it is
//! the job of [`crate::executor`].

use serde::Serialize;
use vector_types::{FilterHeuristic, SimilarityFunction, VectorData, VectorSimilarity};

use crate::filter::DocIdSet;

/// Early-termination defaults for the patience adapter.
pub const DEFAULT_SATURATION_THRESHOLD: f64 = 0.995;
pub const MIN_PATIENCE: usize = 7;

/// How a filtered graph search explores neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchStrategy {
    /// Filter selectivity (percent) below which only matching neighbors are compared
    pub filtered_search_threshold: u32,
}

impl From<FilterHeuristic> for SearchStrategy {
    fn from(heuristic: FilterHeuristic) -> Self {
        let filtered_search_threshold = match heuristic {
            FilterHeuristic::Fanout => 0,
            FilterHeuristic::Acorn => 60,
        };
        Self {
            filtered_search_threshold,
        }
    }
}

/// Graph-based approximate search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproximateQuery {
    pub field: String,
    pub vector: VectorData,
    pub k: usize,
    pub num_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocIdSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_filter: Option<DocIdSet>,
    pub strategy: SearchStrategy,
}

/// Cluster-probe search over an IVF structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IvfQuery {
    pub field: String,
    pub vector: VectorData,
    pub k: usize,
    pub num_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocIdSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_filter: Option<DocIdSet>,
    /// -1 lets the searcher pick
    pub n_probe: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnnQuery {
    /// Field has no data yet
    MatchNone { reason: String },

    /// Brute-force comparison against every vector of the field
    Exact { field: String, vector: VectorData },

    /// Keep only the best child per parent block
    DiversifyingParentBlock {
        parents: DocIdSet,
        query: Box<KnnQuery>,
    },

    /// `SHOULD(query) FILTER(filter)`
    Boolean {
        should: Box<KnnQuery>,
        filter: DocIdSet,
    },

    Approximate(ApproximateQuery),

    Ivf(IvfQuery),

    /// Stops graph traversal once results saturate
    Patience {
        saturation_threshold: f64,
        patience: usize,
        query: Box<KnnQuery>,
    },

    /// Re-rank candidates with full precision vectors, keep the top `k`
    Rescore {
        field: String,
        vector: VectorData,
        function: SimilarityFunction,
        k: usize,
        candidates: usize,
        query: Box<KnnQuery>,
    },

    /// Drop hits whose score is below `min_score`
    SimilarityThreshold {
        similarity: VectorSimilarity,
        threshold: f32,
        min_score: f32,
        query: Box<KnnQuery>,
    },
}

impl KnnQuery {
    /// Short name of the outermost node.
    pub fn kind(&self) -> &'static str {
        match self {
            KnnQuery::MatchNone { .. } => "match_none",
            KnnQuery::Exact { .. } => "exact",
            KnnQuery::DiversifyingParentBlock { .. } => "diversifying_parent_block",
            KnnQuery::Boolean { .. } => "boolean",
            KnnQuery::Approximate(_) => "approximate",
            KnnQuery::Ivf(_) => "ivf",
            KnnQuery::Patience { .. } => "patience",
            KnnQuery::Rescore { .. } => "rescore",
            KnnQuery::SimilarityThreshold { .. } => "similarity_threshold",
        }
    }

    /// The wrapped query, for adapters.
    pub fn inner(&self) -> Option<&KnnQuery> {
        match self {
            KnnQuery::DiversifyingParentBlock { query, .. }
            | KnnQuery::Patience { query, .. }
            | KnnQuery::Rescore { query, .. }
            | KnnQuery::SimilarityThreshold { query, .. } => Some(query),
            KnnQuery::Boolean { should, .. } => Some(should),
            KnnQuery::MatchNone { .. }
            | KnnQuery::Exact { .. }
            | KnnQuery::Approximate(_)
            | KnnQuery::Ivf(_) => None,
        }
    }

    /// Node kinds from the outermost adapter down to the base search.
    pub fn layers(&self) -> Vec<&'static str> {
        let mut layers = vec![self.kind()];
        let mut current = self;
        while let Some(inner) = current.inner() {
            layers.push(inner.kind());
            current = inner;
        }
        layers
    }

    /// Patience value used for a graph search that collects `k` results.
    pub fn patience_for(k: usize) -> usize {
        MIN_PATIENCE.max((k as f64 * 0.3) as usize)
    }
}

impl std::fmt::Display for KnnQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.layers().join(" > "))
    }
}
