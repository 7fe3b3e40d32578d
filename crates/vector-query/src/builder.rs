//! kNN query construction.
//!
//! A query is built in two stages. First the base search is chosen from the
//! field's index options. Then every adapter whose condition holds is
//! collected, in order, as a [`Step`] and folded over the base.

use tracing::debug;
use vector_codec::{VectorEncoder, VectorInput};
use vector_mapping::{DenseVectorField, FieldConfig, IndexOptions};
use vector_types::{ElementType, FieldError, SimilarityFunction, VectorData, VectorSimilarity};

use crate::filter::DocIdSet;
use crate::query::{
    ApproximateQuery, IvfQuery, KnnQuery, SearchStrategy, DEFAULT_SATURATION_THRESHOLD,
};
use crate::request::{KnnRequest, SearchDefaults, OVERSAMPLE_LIMIT};

/// One adapter applied on top of the base search.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    DiversifyParents(DocIdSet),
    Filter(DocIdSet),
    Patience {
        patience: usize,
    },
    Rescore {
        field: String,
        vector: VectorData,
        function: SimilarityFunction,
        k: usize,
        candidates: usize,
    },
    Threshold {
        similarity: VectorSimilarity,
        threshold: f32,
        min_score: f32,
    },
}

impl Step {
    pub fn wrap(self, query: KnnQuery) -> KnnQuery {
        let query = Box::new(query);
        match self {
            Step::DiversifyParents(parents) => KnnQuery::DiversifyingParentBlock { parents, query },
            Step::Filter(filter) => KnnQuery::Boolean {
                should: query,
                filter,
            },
            Step::Patience { patience } => KnnQuery::Patience {
                saturation_threshold: DEFAULT_SATURATION_THRESHOLD,
                patience,
                query,
            },
            Step::Rescore {
                field,
                vector,
                function,
                k,
                candidates,
            } => KnnQuery::Rescore {
                field,
                vector,
                function,
                k,
                candidates,
                query,
            },
            Step::Threshold {
                similarity,
                threshold,
                min_score,
            } => KnnQuery::SimilarityThreshold {
                similarity,
                threshold,
                min_score,
                query,
            },
        }
    }
}

/// Apply `steps` in order, innermost first.
pub fn compose(base: KnnQuery, steps: Vec<Step>) -> KnnQuery {
    steps.into_iter().fold(base, |query, step| step.wrap(query))
}

/// Candidate counts after oversampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePlan {
    pub rescore: bool,
    pub adjusted_k: usize,
    pub num_candidates: usize,
}

impl CandidatePlan {
    pub fn new(k: usize, num_candidates: usize, oversample: Option<f32>, quantized: bool) -> Self {
        match oversample {
            Some(oversample) if quantized && oversample > 0.0 => {
                let adjusted_k =
                    ((k as f64 * f64::from(oversample)).ceil() as usize).min(OVERSAMPLE_LIMIT);
                Self {
                    rescore: true,
                    adjusted_k,
                    num_candidates: adjusted_k.max(num_candidates),
                }
            }
            _ => Self {
                rescore: false,
                adjusted_k: k,
                num_candidates,
            },
        }
    }
}

/// Build the composed query for `request` against `field`.
pub fn create_knn_query(
    field: &DenseVectorField,
    request: &KnnRequest,
    defaults: &SearchDefaults,
) -> Result<KnnQuery, FieldError> {
    request.validate()?;
    let Some(config) = ready_indexed(field)? else {
        return Ok(match_none(field));
    };
    let query = KnnQueryBuilder::new(config).build(request, defaults)?;
    debug!(field = %config.name(), layers = %query, "Composed kNN query");
    Ok(query)
}

/// Brute-force query over every vector of `field`.
pub fn create_exact_knn_query(
    field: &DenseVectorField,
    vector: &VectorInput,
    similarity_threshold: Option<f32>,
) -> Result<KnnQuery, FieldError> {
    let Some(config) = ready_indexed(field)? else {
        return Ok(match_none(field));
    };
    let builder = KnnQueryBuilder::new(config);
    let vector = builder.prepare_vector(vector)?;
    let base = KnnQuery::Exact {
        field: config.name().to_string(),
        vector,
    };
    let steps = similarity_threshold
        .map(|t| builder.threshold_step(t))
        .transpose()?
        .into_iter()
        .collect();
    Ok(compose(base, steps))
}

fn ready_indexed(field: &DenseVectorField) -> Result<Option<&FieldConfig>, FieldError> {
    if !field.indexed() {
        return Err(FieldError::FieldNotIndexed {
            field: field.name().to_string(),
        });
    }
    Ok(field.as_ready())
}

fn match_none(field: &DenseVectorField) -> KnnQuery {
    KnnQuery::MatchNone {
        reason: format!("No data has been indexed for field [{}]", field.name()),
    }
}

/// Query builder bound to one resolved field.
#[derive(Debug, Clone, Copy)]
pub struct KnnQueryBuilder<'a> {
    config: &'a FieldConfig,
}

impl<'a> KnnQueryBuilder<'a> {
    pub fn new(config: &'a FieldConfig) -> Self {
        Self { config }
    }

    fn unsupported(&self, operation: &str) -> FieldError {
        FieldError::UnsupportedElementTypeForQuery {
            field: self.config.name().to_string(),
            element_type: self.config.element_type().to_string(),
            operation: operation.to_string(),
        }
    }

    /// Validate the query vector and return the (possibly normalized) copy.
    pub fn prepare_vector(&self, input: &VectorInput) -> Result<VectorData, FieldError> {
        if self.config.element_type() == ElementType::Float && matches!(input, VectorInput::Hex(_))
        {
            return Err(self.unsupported("hex-encoded query vectors"));
        }
        VectorEncoder::new(self.config).prepare_query(input)
    }

    fn threshold_step(&self, threshold: f32) -> Result<Step, FieldError> {
        let similarity = self.config.similarity().ok_or_else(|| {
            FieldError::configuration(self.config.name(), "indexed field has no similarity")
        })?;
        Ok(Step::Threshold {
            similarity,
            threshold,
            min_score: similarity.score(
                threshold,
                self.config.element_type(),
                self.config.dims(),
            ),
        })
    }

    pub fn build(&self, request: &KnnRequest, defaults: &SearchDefaults) -> Result<KnnQuery, FieldError> {
        let config = self.config;
        let element_type = config.element_type();
        if element_type != ElementType::Float && request.oversample.is_some_and(|o| o > 0.0) {
            return Err(self.unsupported("rescoring with [oversample]"));
        }
        let vector = self.prepare_vector(&request.query_vector)?;

        let options = config.index_options();
        let flat = options.is_some_and(IndexOptions::is_flat);
        let oversample = request.oversample.or_else(|| config.rescore_oversample());
        let plan = CandidatePlan::new(
            request.k,
            request.num_candidates,
            oversample,
            element_type == ElementType::Float && config.is_quantized(),
        );
        let heuristic = request
            .filter_heuristic
            .unwrap_or(defaults.filter_heuristic);
        let early_termination = request
            .early_termination
            .unwrap_or(defaults.early_termination);

        let field = config.name().to_string();
        let (base, graph) = match options {
            _ if flat => (
                KnnQuery::Exact {
                    field: field.clone(),
                    vector: vector.clone(),
                },
                false,
            ),
            Some(IndexOptions::BbqDisk {
                default_n_probe, ..
            }) => (
                KnnQuery::Ivf(IvfQuery {
                    field: field.clone(),
                    vector: vector.clone(),
                    k: plan.adjusted_k,
                    num_candidates: plan.num_candidates,
                    filter: request.filter.clone(),
                    parent_filter: request.parent_filter.clone(),
                    n_probe: *default_n_probe,
                }),
                false,
            ),
            _ => (
                KnnQuery::Approximate(ApproximateQuery {
                    field: field.clone(),
                    vector: vector.clone(),
                    k: plan.adjusted_k,
                    num_candidates: plan.num_candidates,
                    filter: request.filter.clone(),
                    parent_filter: request.parent_filter.clone(),
                    strategy: SearchStrategy::from(heuristic),
                }),
                true,
            ),
        };
        let patience =
            graph && early_termination && options.is_some_and(IndexOptions::is_hnsw_family);

        let diversify_step = request
            .parent_filter
            .clone()
            .filter(|_| flat)
            .map(Step::DiversifyParents);
        let filter_step = request.filter.clone().filter(|_| flat).map(Step::Filter);
        let patience_step = patience.then(|| Step::Patience {
            patience: KnnQuery::patience_for(plan.adjusted_k),
        });
        let rescore_step = plan.rescore.then(|| Step::Rescore {
            field,
            vector,
            function: config
                .similarity_function()
                .unwrap_or(SimilarityFunction::Euclidean),
            k: request.k,
            candidates: plan.adjusted_k,
        });
        let threshold_step = request
            .similarity
            .map(|t| self.threshold_step(t))
            .transpose()?;

        let steps: Vec<Step> = [
            diversify_step,
            filter_step,
            patience_step,
            rescore_step,
            threshold_step,
        ]
        .into_iter()
        .flatten()
        .collect();

        debug!(
            field = %config.name(),
            rescore = plan.rescore,
            adjusted_k = plan.adjusted_k,
            num_candidates = plan.num_candidates,
            steps = steps.len(),
            "Planned kNN query"
        );
        Ok(compose(base, steps))
    }
}
