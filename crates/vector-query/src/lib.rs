//! # vector-query
//!
//! kNN query construction for dense vector fields.
//!
//! A request is validated, its query vector is prepared like an indexed
//! value, and a base search is picked from the field's index options:
//! - `flat` variants: exact scan (plus block-join and filter adapters)
//! - `bbq_disk`: cluster probe
//! - everything else: graph search
//!
//! Patience, rescoring and similarity-threshold adapters wrap the base
//! search in that order. [`KnnExecutor`] runs the result against a segment.

pub mod builder;
pub mod executor;
pub mod filter;
pub mod query;
pub mod request;

pub use builder::{create_exact_knn_query, create_knn_query, CandidatePlan, KnnQueryBuilder};
pub use executor::{Hit, KnnExecutor};
pub use filter::{DocFilter, DocIdSet};
pub use query::{ApproximateQuery, IvfQuery, KnnQuery, SearchStrategy};
pub use request::{KnnRequest, SearchDefaults, OVERSAMPLE_LIMIT};
