//! kNN search requests.

use serde::{Deserialize, Serialize};
use vector_codec::VectorInput;
use vector_types::{FieldError, FilterHeuristic, FormatEpoch, Settings};

use crate::filter::DocIdSet;

/// Upper bound on candidates gathered for rescoring, and on `num_candidates`.
pub const OVERSAMPLE_LIMIT: usize = 10_000;

/// Field- or node-scoped defaults for options a request may leave unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchDefaults {
    pub filter_heuristic: FilterHeuristic,
    pub early_termination: bool,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            filter_heuristic: FilterHeuristic::default_for(FormatEpoch::CURRENT),
            early_termination: false,
        }
    }
}

impl SearchDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            filter_heuristic: settings.filter_heuristic(),
            early_termination: settings.hnsw_early_termination,
        }
    }
}

/// A single kNN search against one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnRequest {
    pub field: String,
    pub query_vector: VectorInput,
    pub k: usize,
    pub num_candidates: usize,

    /// Overrides the field's `rescore_vector.oversample`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversample: Option<f32>,

    /// Raw similarity threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DocIdSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_filter: Option<DocIdSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_heuristic: Option<FilterHeuristic>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_termination: Option<bool>,
}

impl KnnRequest {
    pub fn new(
        field: impl Into<String>,
        query_vector: impl Into<VectorInput>,
        k: usize,
        num_candidates: usize,
    ) -> Self {
        Self {
            field: field.into(),
            query_vector: query_vector.into(),
            k,
            num_candidates,
            oversample: None,
            similarity: None,
            filter: None,
            parent_filter: None,
            filter_heuristic: None,
            early_termination: None,
        }
    }

    pub fn with_oversample(mut self, oversample: f32) -> Self {
        self.oversample = Some(oversample);
        self
    }

    pub fn with_similarity(mut self, threshold: f32) -> Self {
        self.similarity = Some(threshold);
        self
    }

    pub fn with_filter(mut self, filter: DocIdSet) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_parent_filter(mut self, parents: DocIdSet) -> Self {
        self.parent_filter = Some(parents);
        self
    }

    pub fn with_filter_heuristic(mut self, heuristic: FilterHeuristic) -> Self {
        self.filter_heuristic = Some(heuristic);
        self
    }

    pub fn with_early_termination(mut self, enabled: bool) -> Self {
        self.early_termination = Some(enabled);
        self
    }

    /// Check request-level bounds.
    pub fn validate(&self) -> Result<(), FieldError> {
        let fail = |message: String| Err(FieldError::parse(&self.field, message));
        if self.k == 0 {
            return fail("[k] must be greater than 0".to_string());
        }
        if self.num_candidates < self.k {
            return fail(format!(
                "[num_candidates] cannot be less than [k]; [num_candidates] = {}, [k] = {}",
                self.num_candidates, self.k
            ));
        }
        if self.num_candidates > OVERSAMPLE_LIMIT {
            return fail(format!(
                "[num_candidates] cannot exceed [{}]; found [{}]",
                OVERSAMPLE_LIMIT, self.num_candidates
            ));
        }
        if let Some(oversample) = self.oversample {
            if !(oversample == 0.0 || (1.0..=10.0).contains(&oversample)) {
                return fail(format!(
                    "[oversample] must be 0 or between 1 and 10; found [{}]",
                    oversample
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal() {
        let request: KnnRequest = serde_json::from_value(json!({
            "field": "emb",
            "query_vector": [1.0, 2.0],
            "k": 5,
            "num_candidates": 50
        }))
        .unwrap();
        assert_eq!(request, KnnRequest::new("emb", vec![1.0f32, 2.0], 5, 50));
    }

    #[test]
    fn test_deserialize_options() {
        let request: KnnRequest = serde_json::from_value(json!({
            "field": "emb",
            "query_vector": "0102",
            "k": 1,
            "num_candidates": 1,
            "filter": [4, 2],
            "filter_heuristic": "fanout",
            "early_termination": true
        }))
        .unwrap();
        assert_eq!(request.query_vector, VectorInput::Hex("0102".into()));
        assert_eq!(request.filter.map(|f| f.len()), Some(2));
        assert_eq!(request.filter_heuristic, Some(FilterHeuristic::Fanout));
    }

    #[test]
    fn test_validate_bounds() {
        assert!(KnnRequest::new("emb", vec![1.0f32], 0, 10).validate().is_err());
        assert!(KnnRequest::new("emb", vec![1.0f32], 10, 5).validate().is_err());
        assert!(KnnRequest::new("emb", vec![1.0f32], 10, 10_001).validate().is_err());
        assert!(KnnRequest::new("emb", vec![1.0f32], 10, 10)
            .with_oversample(0.5)
            .validate()
            .is_err());
        assert!(KnnRequest::new("emb", vec![1.0f32], 10, 100)
            .with_oversample(2.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_default_defaults_follow_current_epoch() {
        assert_eq!(
            SearchDefaults::default(),
            SearchDefaults::from_settings(&Settings::default())
        );

        let legacy = Settings {
            format_epoch: FormatEpoch::DefaultBbqHnsw,
            ..Settings::default()
        };
        assert_eq!(
            SearchDefaults::from_settings(&legacy).filter_heuristic,
            FilterHeuristic::Fanout
        );
    }
}
