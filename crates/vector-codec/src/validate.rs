//! Element and magnitude checks.

use vector_types::{
    preview_elements, ElementType, FieldError, VectorData, VectorSimilarity, EPS,
};

/// Whether `squared_magnitude` is outside the unit-length tolerance.
pub fn is_not_unit_vector(squared_magnitude: f32) -> bool {
    (squared_magnitude.sqrt() - 1.0).abs() > EPS
}

/// Per-component checks, run once dims are known to match.
///
/// Float components must be finite. Byte and bit components must also be
/// integral and fit in a signed byte.
pub fn check_vector_errors(
    field: &str,
    element_type: ElementType,
    values: &[f64],
) -> Result<(), FieldError> {
    let preview = || {
        let as_floats: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        preview_elements(&as_floats)
    };
    for (dim, &value) in values.iter().enumerate() {
        let narrowed = value as f32;
        if let Some(message) = element_error(element_type, value, narrowed, dim) {
            return Err(FieldError::InvalidElement {
                field: field.to_string(),
                message: format!("{} {}", message, preview()),
            });
        }
    }
    Ok(())
}

fn element_error(element_type: ElementType, value: f64, narrowed: f32, dim: usize) -> Option<String> {
    let name = element_type.as_str();
    if narrowed.is_nan() {
        return Some(format!(
            "element_type [{}] vectors do not support NaN values but found [{:?}] at dim [{}];",
            name, narrowed, dim
        ));
    }
    if narrowed.is_infinite() {
        return Some(format!(
            "element_type [{}] vectors do not support infinite values but found [{:?}] at dim [{}];",
            name, narrowed, dim
        ));
    }
    if element_type == ElementType::Float {
        return None;
    }
    if value.fract() != 0.0 {
        return Some(format!(
            "element_type [{}] vectors only support non-decimal values but found decimal value [{:?}] at dim [{}];",
            name, narrowed, dim
        ));
    }
    if value < i8::MIN as f64 || value > i8::MAX as f64 {
        return Some(format!(
            "element_type [{}] vectors only support integers between [{}, {}] but found [{:?}] at dim [{}];",
            name,
            i8::MIN,
            i8::MAX,
            narrowed,
            dim
        ));
    }
    None
}

/// Magnitude checks for an indexed vector under `similarity`.
///
/// Float vectors must have a finite magnitude; dot-product float vectors
/// must be unit length. Cosine vectors of either numeric type must not be
/// zero. Bit vectors are never checked.
pub fn check_magnitude(
    field: &str,
    element_type: ElementType,
    similarity: Option<VectorSimilarity>,
    vector: &VectorData,
) -> Result<(), FieldError> {
    if element_type == ElementType::Bit {
        return Ok(());
    }
    let squared = vector.squared_magnitude(element_type);
    let fail = |message: &str| FieldError::InvalidMagnitude {
        field: field.to_string(),
        message: format!("{} {}", message, vector.preview()),
    };

    if element_type == ElementType::Float {
        if !squared.is_finite() {
            return Err(fail(
                "NaN or Infinite magnitude detected, this usually means the vector values are too extreme to fit within a float.",
            ));
        }
        if similarity == Some(VectorSimilarity::DotProduct) && is_not_unit_vector(squared) {
            return Err(fail(
                "The [dot_product] similarity can only be used with unit-length vectors.",
            ));
        }
    }
    if similarity == Some(VectorSimilarity::Cosine) && squared.sqrt() == 0.0 {
        return Err(fail(
            "The [cosine] similarity does not support vectors with zero magnitude.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message(err: FieldError) -> String {
        match err {
            FieldError::InvalidElement { message, .. } | FieldError::InvalidMagnitude { message, .. } => {
                message
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_byte_range_message() {
        let err = check_vector_errors("emb", ElementType::Byte, &[1.0, 200.0]).unwrap_err();
        assert_eq!(
            message(err),
            "element_type [byte] vectors only support integers between [-128, 127] but found [200.0] at dim [1]; Preview of invalid vector: [1.0, 200.0]"
        );
    }

    #[test]
    fn test_byte_decimal_before_range() {
        let err = check_vector_errors("emb", ElementType::Byte, &[300.5]).unwrap_err();
        assert!(message(err).contains("non-decimal values but found decimal value [300.5] at dim [0]"));
    }

    #[test]
    fn test_bit_uses_byte_bounds() {
        let err = check_vector_errors("emb", ElementType::Bit, &[0.0, -129.0]).unwrap_err();
        assert!(message(err).starts_with("element_type [bit] vectors only support integers"));
        assert!(check_vector_errors("emb", ElementType::Bit, &[-128.0, 127.0]).is_ok());
    }

    #[test]
    fn test_float_overflow_is_infinite() {
        let err = check_vector_errors("emb", ElementType::Float, &[1.0, 1e40]).unwrap_err();
        assert!(message(err).contains("do not support infinite values but found [inf] at dim [1]"));
        assert!(check_vector_errors("emb", ElementType::Float, &[0.5, -3.25]).is_ok());
    }

    #[test]
    fn test_preview_is_truncated() {
        let err =
            check_vector_errors("emb", ElementType::Byte, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1000.0])
                .unwrap_err();
        assert!(message(err).ends_with("Preview of invalid vector: [1.0, 2.0, 3.0, 4.0, 5.0, ...]"));
    }

    #[test]
    fn test_dot_product_requires_unit_length() {
        let v = VectorData::Floats(vec![3.0, 4.0]);
        let err = check_magnitude("emb", ElementType::Float, Some(VectorSimilarity::DotProduct), &v)
            .unwrap_err();
        assert!(message(err).starts_with("The [dot_product] similarity can only be used with unit-length vectors."));

        let unit = VectorData::Floats(vec![0.6, 0.8]);
        assert!(check_magnitude("emb", ElementType::Float, Some(VectorSimilarity::DotProduct), &unit).is_ok());
    }

    #[test]
    fn test_byte_dot_product_skips_unit_check() {
        let v = VectorData::Bytes(vec![10, 20]);
        assert!(check_magnitude("emb", ElementType::Byte, Some(VectorSimilarity::DotProduct), &v).is_ok());
    }

    #[test]
    fn test_cosine_zero_magnitude() {
        for (element_type, v) in [
            (ElementType::Float, VectorData::Floats(vec![0.0, 0.0])),
            (ElementType::Byte, VectorData::Bytes(vec![0, 0])),
        ] {
            let err = check_magnitude("emb", element_type, Some(VectorSimilarity::Cosine), &v)
                .unwrap_err();
            assert!(message(err).contains("does not support vectors with zero magnitude"));
        }
        let zero_bits = VectorData::Bytes(vec![0, 0]);
        assert!(check_magnitude("emb", ElementType::Bit, Some(VectorSimilarity::L2Norm), &zero_bits).is_ok());
    }

    #[test]
    fn test_extreme_float_magnitude() {
        let v = VectorData::Floats(vec![3e38, 3e38]);
        let err = check_magnitude("emb", ElementType::Float, None, &v).unwrap_err();
        assert!(message(err).starts_with("NaN or Infinite magnitude detected"));
    }

    #[test]
    fn test_unit_tolerance() {
        assert!(!is_not_unit_vector(1.0));
        assert!(!is_not_unit_vector(1.0015));
        assert!(is_not_unit_vector(1.01));
    }
}
