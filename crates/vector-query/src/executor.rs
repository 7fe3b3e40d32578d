//! Reference execution of composed queries against a [`Segment`].
//!
//! Graph searches use the segment's usearch graph when one exists. Every
//! other base search, including cluster probes, scans all vectors of the
//! field. Patience adapters run their inner query unchanged.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;
use vector_segment::{DocId, KnnVectorValues, Segment, SegmentError, SegmentReader};
use vector_types::{ElementType, SimilarityFunction, VectorData, VectorSimilarity};

use crate::filter::{DocFilter, DocIdSet};
use crate::query::KnnQuery;

/// A scored document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    pub doc: DocId,
    pub score: f32,
}

/// Best score first; ties go to the lower doc id.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.doc.cmp(&b.doc))
    });
}

/// Keep the best hit per parent block. `hits` must be sorted.
pub fn diversify(hits: Vec<Hit>, parents: &DocIdSet) -> Vec<Hit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| {
            parents
                .next_at_or_above(hit.doc)
                .is_some_and(|parent| seen.insert(parent))
        })
        .collect()
}

struct Scorer<'a> {
    similarity: VectorSimilarity,
    element_type: ElementType,
    dims: usize,
    values: &'a KnnVectorValues,
}

impl Scorer<'_> {
    fn score(&self, raw: f32) -> f32 {
        self.similarity.score(raw, self.element_type, self.dims)
    }

    fn compare(&self, function: SimilarityFunction, query: &VectorData, doc: DocId) -> Option<f32> {
        let stored = self.values.vector_for_doc(doc)?;
        function
            .compare(query, stored, self.element_type)
            .map(|raw| self.score(raw))
    }

    fn scan(&self, query: &VectorData, filter: Option<&DocIdSet>) -> Vec<Hit> {
        let function = self.values.function();
        let mut hits: Vec<Hit> = self
            .values
            .iter()
            .filter(|(doc, _)| filter.is_none_or(|f| f.matches(*doc)))
            .filter_map(|(doc, stored)| {
                function
                    .compare(query, stored, self.element_type)
                    .map(|raw| Hit {
                        doc,
                        score: self.score(raw),
                    })
            })
            .collect();
        sort_hits(&mut hits);
        hits
    }
}

/// Runs composed queries against one segment.
#[derive(Debug, Clone, Copy)]
pub struct KnnExecutor<'a> {
    segment: &'a Segment,
}

impl<'a> KnnExecutor<'a> {
    pub fn new(segment: &'a Segment) -> Self {
        Self { segment }
    }

    fn scorer(&self, field: &str) -> Result<Option<Scorer<'a>>, SegmentError> {
        let Some(config) = self.segment.config(field)? else {
            return Ok(None);
        };
        let (Some(similarity), Some(values)) =
            (config.similarity(), self.segment.vector_values(field))
        else {
            return Ok(None);
        };
        Ok(Some(Scorer {
            similarity,
            element_type: config.element_type(),
            dims: config.dims(),
            values,
        }))
    }

    /// Matching documents, best first.
    pub fn execute(&self, query: &KnnQuery) -> Result<Vec<Hit>, SegmentError> {
        let hits = match query {
            KnnQuery::MatchNone { .. } => Vec::new(),
            KnnQuery::Exact { field, vector } => match self.scorer(field)? {
                Some(scorer) => scorer.scan(vector, None),
                None => Vec::new(),
            },
            KnnQuery::DiversifyingParentBlock { parents, query } => {
                diversify(self.execute(query)?, parents)
            }
            KnnQuery::Boolean { should, filter } => self
                .execute(should)?
                .into_iter()
                .filter(|hit| filter.matches(hit.doc))
                .collect(),
            KnnQuery::Approximate(approx) => {
                let Some(scorer) = self.scorer(&approx.field)? else {
                    return Ok(Vec::new());
                };
                let filter = approx.filter.as_ref();
                let mut hits = match (self.segment.graph(&approx.field), &approx.vector) {
                    (Some(graph), VectorData::Floats(components)) => {
                        let mut hits: Vec<Hit> = graph
                            .search(components, approx.num_candidates.max(approx.k), |doc| {
                                filter.is_none_or(|f| f.matches(doc))
                            })?
                            .into_iter()
                            .map(|(doc, raw)| Hit {
                                doc,
                                score: scorer.score(raw),
                            })
                            .collect();
                        sort_hits(&mut hits);
                        hits
                    }
                    _ => scorer.scan(&approx.vector, filter),
                };
                if let Some(parents) = &approx.parent_filter {
                    hits = diversify(hits, parents);
                }
                hits.truncate(approx.k);
                hits
            }
            KnnQuery::Ivf(ivf) => {
                let Some(scorer) = self.scorer(&ivf.field)? else {
                    return Ok(Vec::new());
                };
                let mut hits = scorer.scan(&ivf.vector, ivf.filter.as_ref());
                if let Some(parents) = &ivf.parent_filter {
                    hits = diversify(hits, parents);
                }
                hits.truncate(ivf.k);
                hits
            }
            KnnQuery::Patience { query, .. } => self.execute(query)?,
            KnnQuery::Rescore {
                field,
                vector,
                function,
                k,
                candidates,
                query,
            } => {
                let Some(scorer) = self.scorer(field)? else {
                    return Ok(Vec::new());
                };
                let mut hits: Vec<Hit> = self
                    .execute(query)?
                    .into_iter()
                    .take(*candidates)
                    .filter_map(|hit| {
                        scorer
                            .compare(*function, vector, hit.doc)
                            .map(|score| Hit { doc: hit.doc, score })
                    })
                    .collect();
                sort_hits(&mut hits);
                hits.truncate(*k);
                hits
            }
            KnnQuery::SimilarityThreshold {
                query, min_score, ..
            } => self
                .execute(query)?
                .into_iter()
                .filter(|hit| hit.score.partial_cmp(min_score) != Some(Ordering::Less))
                .collect(),
        };
        debug!(query = query.kind(), hits = hits.len(), "Executed query node");
        Ok(hits)
    }
}
