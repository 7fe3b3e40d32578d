//! Vector similarities and their scoring.
//!
//! A [`VectorSimilarity`] is what the mapping names. A [`SimilarityFunction`]
//! is the comparison actually run against stored vectors; the two differ for
//! cosine fields whose vectors are normalized at write time.

use serde::{Deserialize, Serialize};

use crate::element::{ElementType, VectorData};
use crate::epoch::FormatEpoch;

/// Similarity named in a field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSimilarity {
    #[serde(rename = "l2_norm")]
    L2Norm,
    Cosine,
    DotProduct,
    MaxInnerProduct,
}

impl VectorSimilarity {
    pub const ALL: [VectorSimilarity; 4] = [
        VectorSimilarity::L2Norm,
        VectorSimilarity::Cosine,
        VectorSimilarity::DotProduct,
        VectorSimilarity::MaxInnerProduct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VectorSimilarity::L2Norm => "l2_norm",
            VectorSimilarity::Cosine => "cosine",
            VectorSimilarity::DotProduct => "dot_product",
            VectorSimilarity::MaxInnerProduct => "max_inner_product",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2_norm" => Some(VectorSimilarity::L2Norm),
            "cosine" => Some(VectorSimilarity::Cosine),
            "dot_product" => Some(VectorSimilarity::DotProduct),
            "max_inner_product" => Some(VectorSimilarity::MaxInnerProduct),
            _ => None,
        }
    }

    /// Bit vectors only support `l2_norm` (hamming distance).
    pub fn supports_element_type(&self, element_type: ElementType) -> bool {
        match element_type {
            ElementType::Bit => *self == VectorSimilarity::L2Norm,
            ElementType::Byte | ElementType::Float => true,
        }
    }

    /// Similarity used when a mapping on an indexed-by-default epoch omits one.
    pub fn default_for(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Bit => VectorSimilarity::L2Norm,
            ElementType::Byte | ElementType::Float => VectorSimilarity::Cosine,
        }
    }

    /// Translate a raw comparison result into a bounded relevance score.
    ///
    /// `raw` is a distance for `l2_norm` (hamming distance for bit vectors)
    /// and a similarity otherwise. Bit fields only ever reach the `l2_norm`
    /// arm; other pairings are rejected when the mapping is built.
    pub fn score(&self, raw: f32, element_type: ElementType, dims: usize) -> f32 {
        match self {
            VectorSimilarity::L2Norm => match element_type {
                ElementType::Bit => (dims as f32 - raw) / dims as f32,
                ElementType::Byte | ElementType::Float => 1.0 / (1.0 + raw * raw),
            },
            VectorSimilarity::Cosine => (1.0 + raw) / 2.0,
            VectorSimilarity::DotProduct => match element_type {
                ElementType::Float => (1.0 + raw) / 2.0,
                ElementType::Byte | ElementType::Bit => {
                    0.5 + raw / (dims as f32 * (1u32 << 15) as f32)
                }
            },
            VectorSimilarity::MaxInnerProduct => {
                if raw < 0.0 {
                    1.0 / (1.0 - raw)
                } else {
                    raw + 1.0
                }
            }
        }
    }

    /// Comparison function to index with for a field created at `epoch`.
    pub fn function(&self, element_type: ElementType, epoch: FormatEpoch) -> SimilarityFunction {
        match self {
            VectorSimilarity::L2Norm => SimilarityFunction::Euclidean,
            VectorSimilarity::Cosine => {
                if epoch.normalizes_cosine() && element_type == ElementType::Float {
                    SimilarityFunction::DotProduct
                } else {
                    SimilarityFunction::Cosine
                }
            }
            VectorSimilarity::DotProduct => SimilarityFunction::DotProduct,
            VectorSimilarity::MaxInnerProduct => SimilarityFunction::MaximumInnerProduct,
        }
    }
}

impl std::fmt::Display for VectorSimilarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VectorSimilarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "unknown similarity [{}]; expected one of [l2_norm, cosine, dot_product, max_inner_product]",
                s
            )
        })
    }
}

/// Native comparison tagged onto each indexed vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityFunction {
    Euclidean,
    DotProduct,
    Cosine,
    MaximumInnerProduct,
}

impl SimilarityFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityFunction::Euclidean => "euclidean",
            SimilarityFunction::DotProduct => "dot_product",
            SimilarityFunction::Cosine => "cosine",
            SimilarityFunction::MaximumInnerProduct => "maximum_inner_product",
        }
    }

    /// Raw comparison of two float vectors of equal length.
    pub fn compare_floats(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityFunction::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            SimilarityFunction::DotProduct | SimilarityFunction::MaximumInnerProduct => {
                a.iter().zip(b).map(|(x, y)| x * y).sum()
            }
            SimilarityFunction::Cosine => cosine(
                a.iter().zip(b).map(|(x, y)| x * y).sum(),
                a.iter().map(|x| x * x).sum(),
                b.iter().map(|y| y * y).sum(),
            ),
        }
    }

    /// Raw comparison of two signed-byte vectors.
    ///
    /// For bit vectors the euclidean comparison is the hamming distance.
    pub fn compare_bytes(&self, a: &[i8], b: &[i8], element_type: ElementType) -> f32 {
        match (self, element_type) {
            (SimilarityFunction::Euclidean, ElementType::Bit) => a
                .iter()
                .zip(b)
                .map(|(x, y)| ((*x as u8) ^ (*y as u8)).count_ones())
                .sum::<u32>() as f32,
            (SimilarityFunction::Euclidean, _) => (a
                .iter()
                .zip(b)
                .map(|(&x, &y)| {
                    let d = x as i32 - y as i32;
                    d * d
                })
                .sum::<i32>() as f32)
                .sqrt(),
            (SimilarityFunction::DotProduct | SimilarityFunction::MaximumInnerProduct, _) => {
                a.iter().zip(b).map(|(&x, &y)| x as i32 * y as i32).sum::<i32>() as f32
            }
            (SimilarityFunction::Cosine, _) => {
                let dot = a.iter().zip(b).map(|(&x, &y)| x as i32 * y as i32).sum::<i32>();
                let na = a.iter().map(|&x| x as i32 * x as i32).sum::<i32>();
                let nb = b.iter().map(|&y| y as i32 * y as i32).sum::<i32>();
                cosine(dot as f32, na as f32, nb as f32)
            }
        }
    }

    /// Compare two payloads of the same kind, or `None` if the kinds differ.
    pub fn compare(&self, a: &VectorData, b: &VectorData, element_type: ElementType) -> Option<f32> {
        match (a, b) {
            (VectorData::Floats(x), VectorData::Floats(y)) => Some(self.compare_floats(x, y)),
            (VectorData::Bytes(x), VectorData::Bytes(y)) => {
                Some(self.compare_bytes(x, y, element_type))
            }
            _ => None,
        }
    }
}

fn cosine(dot: f32, norm_a: f32, norm_b: f32) -> f32 {
    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_score() {
        let s = VectorSimilarity::L2Norm;
        assert!((s.score(0.0, ElementType::Float, 3) - 1.0).abs() < f32::EPSILON);
        assert!((s.score(1.0, ElementType::Float, 3) - 0.5).abs() < f32::EPSILON);
        assert!((s.score(4.0, ElementType::Bit, 16) - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_dot_product_score() {
        let s = VectorSimilarity::DotProduct;
        assert!((s.score(1.0, ElementType::Float, 4) - 1.0).abs() < f32::EPSILON);
        assert!((s.score(0.0, ElementType::Byte, 4) - 0.5).abs() < f32::EPSILON);
        let max = 4.0 * 127.0 * 127.0;
        assert!(s.score(max, ElementType::Byte, 4) < 1.0);
    }

    #[test]
    fn test_max_inner_product_score() {
        let s = VectorSimilarity::MaxInnerProduct;
        assert!((s.score(-1.0, ElementType::Float, 2) - 0.5).abs() < f32::EPSILON);
        assert!((s.score(2.0, ElementType::Float, 2) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_function_tag_by_epoch() {
        let cos = VectorSimilarity::Cosine;
        assert_eq!(
            cos.function(ElementType::Float, FormatEpoch::CURRENT),
            SimilarityFunction::DotProduct
        );
        assert_eq!(
            cos.function(ElementType::Float, FormatEpoch::LittleEndianFloats),
            SimilarityFunction::Cosine
        );
        assert_eq!(
            cos.function(ElementType::Byte, FormatEpoch::CURRENT),
            SimilarityFunction::Cosine
        );
        assert_eq!(
            VectorSimilarity::L2Norm.function(ElementType::Bit, FormatEpoch::CURRENT),
            SimilarityFunction::Euclidean
        );
    }

    #[test]
    fn test_bit_support() {
        assert!(VectorSimilarity::L2Norm.supports_element_type(ElementType::Bit));
        assert!(!VectorSimilarity::Cosine.supports_element_type(ElementType::Bit));
        assert!(!VectorSimilarity::DotProduct.supports_element_type(ElementType::Bit));
    }

    #[test]
    fn test_compare() {
        let f = SimilarityFunction::Euclidean;
        assert!((f.compare_floats(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < f32::EPSILON);
        // 0b1111_0000 vs 0b0000_0000
        assert_eq!(f.compare_bytes(&[-16], &[0], ElementType::Bit), 4.0);

        let c = SimilarityFunction::Cosine;
        assert!((c.compare_floats(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((c.compare_bytes(&[1, 0], &[0, 5], ElementType::Byte)).abs() < 1e-6);

        let d = SimilarityFunction::DotProduct;
        assert_eq!(d.compare_bytes(&[2, 3], &[4, -1], ElementType::Byte), 5.0);
        assert!(d
            .compare(
                &VectorData::Floats(vec![1.0]),
                &VectorData::Bytes(vec![1]),
                ElementType::Float
            )
            .is_none());
    }

    #[test]
    fn test_similarity_serde_names() {
        let json = serde_json::to_string(&VectorSimilarity::L2Norm).unwrap();
        assert_eq!(json, "\"l2_norm\"");
        let parsed: VectorSimilarity = serde_json::from_str("\"max_inner_product\"").unwrap();
        assert_eq!(parsed, VectorSimilarity::MaxInnerProduct);
    }
}
