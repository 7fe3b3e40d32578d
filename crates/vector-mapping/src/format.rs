//! Vectors format descriptors.
//!
//! Maps resolved index options onto the on-disk structure the segment
//! layer builds for a field.

use serde::Serialize;
use vector_types::ElementType;

use crate::field::FieldConfig;
use crate::index_options::{IndexOptions, DEFAULT_EF_CONSTRUCTION, DEFAULT_M};

/// Graph build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphParams {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
        }
    }
}

/// Cluster layout for IVF structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterParams {
    pub cluster_size: u32,
    pub default_n_probe: i32,
}

/// Component compression applied by the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantization {
    None,
    Int8,
    Int4,
    Binary,
}

impl Quantization {
    /// Bits kept per component.
    pub fn bits(&self) -> u8 {
        match self {
            Quantization::None => 32,
            Quantization::Int8 => 7,
            Quantization::Int4 => 4,
            Quantization::Binary => 1,
        }
    }
}

/// Structure backing an indexed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorsFormat {
    pub name: &'static str,
    pub graph: Option<GraphParams>,
    pub clusters: Option<ClusterParams>,
    pub quantization: Quantization,
    /// `Some(0.0)` requests dynamic quantiles
    pub confidence_interval: Option<f32>,
}

impl VectorsFormat {
    /// Descriptor for `config`, or `None` when the field is not indexed.
    pub fn for_field(config: &FieldConfig) -> Option<Self> {
        if !config.indexed() {
            return None;
        }
        let bit = config.element_type() == ElementType::Bit;
        let format = match config.index_options() {
            None => Self::graph(
                if bit { "hnsw_bit" } else { "hnsw" },
                GraphParams::default(),
                Quantization::None,
                None,
            ),
            Some(IndexOptions::Hnsw { m, ef_construction }) => Self::graph(
                if bit { "hnsw_bit" } else { "hnsw" },
                GraphParams {
                    m: *m,
                    ef_construction: *ef_construction,
                },
                Quantization::None,
                None,
            ),
            Some(IndexOptions::Flat) => Self::flat(
                if bit { "flat_bit" } else { "flat" },
                Quantization::None,
                None,
            ),
            Some(IndexOptions::Int8Hnsw {
                m,
                ef_construction,
                confidence_interval,
                ..
            }) => Self::graph(
                "hnsw_scalar_quantized",
                GraphParams {
                    m: *m,
                    ef_construction: *ef_construction,
                },
                Quantization::Int8,
                *confidence_interval,
            ),
            Some(IndexOptions::Int4Hnsw {
                m,
                ef_construction,
                confidence_interval,
                ..
            }) => Self::graph(
                "hnsw_scalar_quantized",
                GraphParams {
                    m: *m,
                    ef_construction: *ef_construction,
                },
                Quantization::Int4,
                Some(*confidence_interval),
            ),
            Some(IndexOptions::Int8Flat {
                confidence_interval,
                ..
            }) => Self::flat(
                "flat_scalar_quantized",
                Quantization::Int8,
                *confidence_interval,
            ),
            Some(IndexOptions::Int4Flat {
                confidence_interval,
                ..
            }) => Self::flat(
                "flat_scalar_quantized",
                Quantization::Int4,
                Some(*confidence_interval),
            ),
            Some(IndexOptions::BbqHnsw {
                m, ef_construction, ..
            }) => Self::graph(
                "hnsw_binary_quantized",
                GraphParams {
                    m: *m,
                    ef_construction: *ef_construction,
                },
                Quantization::Binary,
                None,
            ),
            Some(IndexOptions::BbqFlat { .. }) => {
                Self::flat("flat_binary_quantized", Quantization::Binary, None)
            }
            Some(IndexOptions::BbqDisk {
                cluster_size,
                default_n_probe,
                ..
            }) => VectorsFormat {
                name: "ivf_binary_quantized",
                graph: None,
                clusters: Some(ClusterParams {
                    cluster_size: *cluster_size,
                    default_n_probe: *default_n_probe,
                }),
                quantization: Quantization::Binary,
                confidence_interval: None,
            },
        };
        Some(format)
    }

    fn graph(
        name: &'static str,
        params: GraphParams,
        quantization: Quantization,
        confidence_interval: Option<f32>,
    ) -> Self {
        VectorsFormat {
            name,
            graph: Some(params),
            clusters: None,
            quantization,
            confidence_interval,
        }
    }

    fn flat(name: &'static str, quantization: Quantization, confidence_interval: Option<f32>) -> Self {
        VectorsFormat {
            name,
            graph: None,
            clusters: None,
            quantization,
            confidence_interval,
        }
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }
}
