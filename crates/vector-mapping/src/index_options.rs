//! Index option variants and their update order.
//!
//! Each variant names the structure backing an indexed field. The
//! [`IndexOptions::updatable_to`] relation decides whether an existing
//! structure can absorb a mapping update without a reindex.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use vector_types::{ElementType, FieldError};

/// Default graph connectivity.
pub const DEFAULT_M: u32 = 16;
/// Default build-time beam width.
pub const DEFAULT_EF_CONSTRUCTION: u32 = 100;
pub const MAX_M: u32 = 512;
pub const MAX_EF_CONSTRUCTION: u32 = 3200;

/// Binary quantization needs at least this many dims.
pub const BBQ_MIN_DIMS: usize = 64;
/// Dims at or above which float fields default to `bbq_hnsw`.
pub const BBQ_DIMS_DEFAULT_THRESHOLD: usize = 384;

pub const DEFAULT_OVERSAMPLE: f32 = 3.0;
pub const MAX_OVERSAMPLE: f32 = 10.0;

pub const DEFAULT_VECTORS_PER_CLUSTER: u32 = 384;
pub const MIN_VECTORS_PER_CLUSTER: u32 = 64;
pub const MAX_VECTORS_PER_CLUSTER: u32 = 1 << 16;
/// `-1` lets the searcher pick the probe count.
pub const DEFAULT_N_PROBE: i32 = -1;
/// Int4 confidence interval selecting dynamic quantiles.
pub const DYNAMIC_CONFIDENCE_INTERVAL: f32 = 0.0;

/// Name-level identity of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorIndexType {
    Hnsw,
    Int8Hnsw,
    Int4Hnsw,
    Flat,
    Int8Flat,
    Int4Flat,
    BbqHnsw,
    BbqFlat,
    BbqDisk,
}

impl VectorIndexType {
    pub const ALL: [VectorIndexType; 9] = [
        VectorIndexType::Hnsw,
        VectorIndexType::Int8Hnsw,
        VectorIndexType::Int4Hnsw,
        VectorIndexType::Flat,
        VectorIndexType::Int8Flat,
        VectorIndexType::Int4Flat,
        VectorIndexType::BbqHnsw,
        VectorIndexType::BbqFlat,
        VectorIndexType::BbqDisk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VectorIndexType::Hnsw => "hnsw",
            VectorIndexType::Int8Hnsw => "int8_hnsw",
            VectorIndexType::Int4Hnsw => "int4_hnsw",
            VectorIndexType::Flat => "flat",
            VectorIndexType::Int8Flat => "int8_flat",
            VectorIndexType::Int4Flat => "int4_flat",
            VectorIndexType::BbqHnsw => "bbq_hnsw",
            VectorIndexType::BbqFlat => "bbq_flat",
            VectorIndexType::BbqDisk => "bbq_disk",
        }
    }

    /// Look up an enabled type by name.
    pub fn from_name(name: &str, ivf_format_enabled: bool) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| t.is_enabled(ivf_format_enabled))
            .find(|t| t.name() == name)
    }

    /// `bbq_disk` sits behind a feature flag.
    pub fn is_enabled(&self, ivf_format_enabled: bool) -> bool {
        match self {
            VectorIndexType::BbqDisk => ivf_format_enabled,
            _ => true,
        }
    }

    pub fn is_quantized(&self) -> bool {
        !matches!(self, VectorIndexType::Hnsw | VectorIndexType::Flat)
    }

    pub fn supports_element_type(&self, element_type: ElementType) -> bool {
        match self {
            VectorIndexType::Hnsw | VectorIndexType::Flat => true,
            _ => element_type == ElementType::Float,
        }
    }

    pub fn supports_dimension(&self, dims: usize) -> bool {
        match self {
            VectorIndexType::Int4Hnsw | VectorIndexType::Int4Flat => dims % 2 == 0,
            VectorIndexType::BbqHnsw | VectorIndexType::BbqFlat => dims >= BBQ_MIN_DIMS,
            _ => true,
        }
    }
}

impl std::fmt::Display for VectorIndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Query-time oversampling for quantized structures.
///
/// An oversample of `0` disables rescoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RescoreVector {
    pub oversample: f32,
}

impl RescoreVector {
    pub fn new(oversample: f32) -> Self {
        Self { oversample }
    }
}

/// A fully parsed `index_options` object.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOptions {
    Flat,
    Hnsw {
        m: u32,
        ef_construction: u32,
    },
    Int8Hnsw {
        m: u32,
        ef_construction: u32,
        confidence_interval: Option<f32>,
        rescore_vector: Option<RescoreVector>,
    },
    /// Confidence interval defaults to [`DYNAMIC_CONFIDENCE_INTERVAL`].
    Int4Hnsw {
        m: u32,
        ef_construction: u32,
        confidence_interval: f32,
        rescore_vector: Option<RescoreVector>,
    },
    Int8Flat {
        confidence_interval: Option<f32>,
        rescore_vector: Option<RescoreVector>,
    },
    Int4Flat {
        confidence_interval: f32,
        rescore_vector: Option<RescoreVector>,
    },
    BbqHnsw {
        m: u32,
        ef_construction: u32,
        rescore_vector: Option<RescoreVector>,
    },
    BbqFlat {
        rescore_vector: Option<RescoreVector>,
    },
    BbqDisk {
        cluster_size: u32,
        default_n_probe: i32,
        rescore_vector: Option<RescoreVector>,
    },
}

impl IndexOptions {
    pub fn hnsw(m: u32, ef_construction: u32) -> Self {
        IndexOptions::Hnsw { m, ef_construction }
    }

    pub fn int8_hnsw(m: u32, ef_construction: u32) -> Self {
        IndexOptions::Int8Hnsw {
            m,
            ef_construction,
            confidence_interval: None,
            rescore_vector: None,
        }
    }

    pub fn bbq_hnsw(m: u32, ef_construction: u32, oversample: Option<f32>) -> Self {
        IndexOptions::BbqHnsw {
            m,
            ef_construction,
            rescore_vector: oversample.map(RescoreVector::new),
        }
    }

    pub fn index_type(&self) -> VectorIndexType {
        match self {
            IndexOptions::Flat => VectorIndexType::Flat,
            IndexOptions::Hnsw { .. } => VectorIndexType::Hnsw,
            IndexOptions::Int8Hnsw { .. } => VectorIndexType::Int8Hnsw,
            IndexOptions::Int4Hnsw { .. } => VectorIndexType::Int4Hnsw,
            IndexOptions::Int8Flat { .. } => VectorIndexType::Int8Flat,
            IndexOptions::Int4Flat { .. } => VectorIndexType::Int4Flat,
            IndexOptions::BbqHnsw { .. } => VectorIndexType::BbqHnsw,
            IndexOptions::BbqFlat { .. } => VectorIndexType::BbqFlat,
            IndexOptions::BbqDisk { .. } => VectorIndexType::BbqDisk,
        }
    }

    /// Exhaustive structures with no ANN acceleration.
    pub fn is_flat(&self) -> bool {
        matches!(
            self,
            IndexOptions::Flat
                | IndexOptions::Int8Flat { .. }
                | IndexOptions::Int4Flat { .. }
                | IndexOptions::BbqFlat { .. }
        )
    }

    pub fn is_quantized(&self) -> bool {
        self.index_type().is_quantized()
    }

    /// Graph variants eligible for early termination.
    pub fn is_hnsw_family(&self) -> bool {
        matches!(
            self,
            IndexOptions::Hnsw { .. }
                | IndexOptions::Int8Hnsw { .. }
                | IndexOptions::Int4Hnsw { .. }
                | IndexOptions::BbqHnsw { .. }
        )
    }

    /// Graph connectivity, for variants that build a graph.
    pub fn m(&self) -> Option<u32> {
        match self {
            IndexOptions::Hnsw { m, .. }
            | IndexOptions::Int8Hnsw { m, .. }
            | IndexOptions::Int4Hnsw { m, .. }
            | IndexOptions::BbqHnsw { m, .. } => Some(*m),
            _ => None,
        }
    }

    pub fn ef_construction(&self) -> Option<u32> {
        match self {
            IndexOptions::Hnsw {
                ef_construction, ..
            }
            | IndexOptions::Int8Hnsw {
                ef_construction, ..
            }
            | IndexOptions::Int4Hnsw {
                ef_construction, ..
            }
            | IndexOptions::BbqHnsw {
                ef_construction, ..
            } => Some(*ef_construction),
            _ => None,
        }
    }

    pub fn confidence_interval(&self) -> Option<f32> {
        match self {
            IndexOptions::Int8Hnsw {
                confidence_interval,
                ..
            }
            | IndexOptions::Int8Flat {
                confidence_interval,
                ..
            } => *confidence_interval,
            IndexOptions::Int4Hnsw {
                confidence_interval,
                ..
            }
            | IndexOptions::Int4Flat {
                confidence_interval,
                ..
            } => Some(*confidence_interval),
            _ => None,
        }
    }

    pub fn rescore_vector(&self) -> Option<RescoreVector> {
        match self {
            IndexOptions::Flat | IndexOptions::Hnsw { .. } => None,
            IndexOptions::Int8Hnsw { rescore_vector, .. }
            | IndexOptions::Int4Hnsw { rescore_vector, .. }
            | IndexOptions::Int8Flat { rescore_vector, .. }
            | IndexOptions::Int4Flat { rescore_vector, .. }
            | IndexOptions::BbqHnsw { rescore_vector, .. }
            | IndexOptions::BbqFlat { rescore_vector }
            | IndexOptions::BbqDisk { rescore_vector, .. } => *rescore_vector,
        }
    }

    pub fn validate_element_type(
        &self,
        field: &str,
        element_type: ElementType,
    ) -> Result<(), FieldError> {
        let index_type = self.index_type();
        if !index_type.supports_element_type(element_type) {
            return Err(FieldError::configuration(
                field,
                format!(
                    "[element_type] cannot be [{}] when using index type [{}]",
                    element_type, index_type
                ),
            ));
        }
        Ok(())
    }

    pub fn validate_dimension(&self, field: &str, dims: usize) -> Result<(), FieldError> {
        let index_type = self.index_type();
        if index_type.supports_dimension(dims) {
            return Ok(());
        }
        let reason = match index_type {
            VectorIndexType::BbqHnsw | VectorIndexType::BbqFlat => format!(
                "{} does not support dimensions fewer than {}; provided={}",
                index_type, BBQ_MIN_DIMS, dims
            ),
            _ => format!(
                "{} only supports even dimensions; provided={}",
                index_type, dims
            ),
        };
        Err(FieldError::configuration(field, reason))
    }

    /// Whether a field built with `self` may switch to `update` in place.
    ///
    /// Reflexive for every variant as long as graph connectivity does not
    /// shrink and scalar confidence intervals stay put. Not symmetric.
    pub fn updatable_to(&self, update: &IndexOptions) -> bool {
        use IndexOptions::*;
        match (self, update) {
            (Flat, Flat | Hnsw { .. } | Int8Hnsw { .. } | Int4Hnsw { .. } | BbqHnsw { .. }) => {
                true
            }
            (Flat, BbqDisk { .. }) => true,

            (Hnsw { m, .. }, Hnsw { m: m2, .. })
            | (Hnsw { m, .. }, Int8Hnsw { m: m2, .. })
            | (Hnsw { m, .. }, Int4Hnsw { m: m2, .. })
            | (Hnsw { m, .. }, BbqHnsw { m: m2, .. }) => m2 >= m,
            (Hnsw { .. }, BbqDisk { .. }) => true,

            (
                Int8Flat {
                    confidence_interval: ci,
                    ..
                },
                Int8Flat {
                    confidence_interval: ci2,
                    ..
                },
            ) => ci == ci2,
            (
                Int8Flat { .. },
                Hnsw { .. }
                | Int8Hnsw { .. }
                | Int4Hnsw { .. }
                | BbqHnsw { .. }
                | Int4Flat { .. }
                | BbqFlat { .. }
                | BbqDisk { .. },
            ) => true,

            (
                Int4Flat { .. },
                Int4Flat { .. }
                | Hnsw { .. }
                | Int8Hnsw { .. }
                | Int4Hnsw { .. }
                | BbqHnsw { .. }
                | BbqFlat { .. }
                | BbqDisk { .. },
            ) => true,

            (
                Int8Hnsw {
                    m,
                    confidence_interval: ci,
                    ..
                },
                Int8Hnsw {
                    m: m2,
                    confidence_interval: ci2,
                    ..
                },
            ) => m2 >= m && ci == ci2,
            (Int8Hnsw { m, .. }, Int4Hnsw { m: m2, .. })
            | (Int8Hnsw { m, .. }, BbqHnsw { m: m2, .. }) => m2 >= m,
            (Int8Hnsw { .. }, BbqDisk { .. }) => true,

            (
                Int4Hnsw {
                    m,
                    confidence_interval: ci,
                    ..
                },
                Int4Hnsw {
                    m: m2,
                    confidence_interval: ci2,
                    ..
                },
            ) => m2 >= m && ci == ci2,
            (Int4Hnsw { m, .. }, BbqHnsw { m: m2, .. }) => m2 >= m,
            (Int4Hnsw { .. }, BbqDisk { .. }) => true,

            (BbqHnsw { m, .. }, BbqHnsw { m: m2, .. }) => m2 >= m,
            (BbqHnsw { .. }, BbqDisk { .. }) => true,

            (BbqFlat { .. }, BbqFlat { .. } | BbqHnsw { .. } | BbqDisk { .. }) => true,

            (BbqDisk { .. }, BbqDisk { .. }) => true,

            _ => false,
        }
    }

    /// Mapping representation, as accepted by the parser.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(self.index_type().name()));
        if let (Some(m), Some(ef)) = (self.m(), self.ef_construction()) {
            map.insert("m".to_string(), json!(m));
            map.insert("ef_construction".to_string(), json!(ef));
        }
        if let Some(ci) = self.confidence_interval() {
            map.insert("confidence_interval".to_string(), json!(ci));
        }
        if let IndexOptions::BbqDisk {
            cluster_size,
            default_n_probe,
            ..
        } = self
        {
            map.insert("cluster_size".to_string(), json!(cluster_size));
            map.insert("default_n_probe".to_string(), json!(default_n_probe));
        }
        if let Some(rescore) = self.rescore_vector() {
            map.insert(
                "rescore_vector".to_string(),
                json!({ "oversample": rescore.oversample }),
            );
        }
        Value::Object(map)
    }
}

impl std::fmt::Display for IndexOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
