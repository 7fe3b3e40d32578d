//! Parsing of the `index_options` mapping object.

use serde_json::{Map, Value};
use vector_types::{FieldError, FormatEpoch};

use crate::index_options::{
    IndexOptions, RescoreVector, VectorIndexType, DEFAULT_EF_CONSTRUCTION, DEFAULT_M,
    DEFAULT_N_PROBE, DEFAULT_OVERSAMPLE, DEFAULT_VECTORS_PER_CLUSTER, DYNAMIC_CONFIDENCE_INTERVAL,
    MAX_EF_CONSTRUCTION, MAX_M, MAX_OVERSAMPLE, MAX_VECTORS_PER_CLUSTER, MIN_VECTORS_PER_CLUSTER,
};

/// Parse `index_options` for `field`, consuming every known key.
///
/// Leftover keys are rejected, so keys a variant (or the epoch) does not
/// accept surface as configuration errors.
pub fn parse_index_options(
    field: &str,
    options: &Map<String, Value>,
    epoch: FormatEpoch,
    ivf_format_enabled: bool,
) -> Result<IndexOptions, FieldError> {
    let mut map = options.clone();

    let type_name = match map.remove("type") {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => {
            return Err(FieldError::configuration(
                field,
                "[index_options] requires field [type] to be configured",
            ))
        }
    };
    let index_type = VectorIndexType::from_name(&type_name, ivf_format_enabled).ok_or_else(|| {
        FieldError::configuration(
            field,
            format!(
                "Unknown vector index options type [{}] for field [{}]",
                type_name, field
            ),
        )
    })?;

    let parsed = match index_type {
        VectorIndexType::Flat => IndexOptions::Flat,
        VectorIndexType::Hnsw => {
            let (m, ef_construction) = take_graph_params(field, &mut map)?;
            IndexOptions::Hnsw { m, ef_construction }
        }
        VectorIndexType::Int8Hnsw => {
            let (m, ef_construction) = take_graph_params(field, &mut map)?;
            IndexOptions::Int8Hnsw {
                m,
                ef_construction,
                confidence_interval: take_confidence_interval(field, &mut map)?,
                rescore_vector: take_gated_rescore(field, &mut map, epoch, false)?,
            }
        }
        VectorIndexType::Int4Hnsw => {
            let (m, ef_construction) = take_graph_params(field, &mut map)?;
            IndexOptions::Int4Hnsw {
                m,
                ef_construction,
                confidence_interval: take_confidence_interval(field, &mut map)?
                    .unwrap_or(DYNAMIC_CONFIDENCE_INTERVAL),
                rescore_vector: take_gated_rescore(field, &mut map, epoch, false)?,
            }
        }
        VectorIndexType::Int8Flat => IndexOptions::Int8Flat {
            confidence_interval: take_confidence_interval(field, &mut map)?,
            rescore_vector: take_gated_rescore(field, &mut map, epoch, false)?,
        },
        VectorIndexType::Int4Flat => IndexOptions::Int4Flat {
            confidence_interval: take_confidence_interval(field, &mut map)?
                .unwrap_or(DYNAMIC_CONFIDENCE_INTERVAL),
            rescore_vector: take_gated_rescore(field, &mut map, epoch, false)?,
        },
        VectorIndexType::BbqHnsw => {
            let (m, ef_construction) = take_graph_params(field, &mut map)?;
            IndexOptions::BbqHnsw {
                m,
                ef_construction,
                rescore_vector: take_gated_rescore(field, &mut map, epoch, true)?,
            }
        }
        VectorIndexType::BbqFlat => IndexOptions::BbqFlat {
            rescore_vector: take_gated_rescore(field, &mut map, epoch, true)?,
        },
        VectorIndexType::BbqDisk => {
            let cluster_size = match take_i64(field, &mut map, "cluster_size")? {
                None => DEFAULT_VECTORS_PER_CLUSTER,
                Some(size)
                    if size >= MIN_VECTORS_PER_CLUSTER as i64
                        && size <= MAX_VECTORS_PER_CLUSTER as i64 =>
                {
                    size as u32
                }
                Some(size) => {
                    return Err(FieldError::configuration(
                        field,
                        format!(
                            "cluster_size must be between {} and {}, got: {}",
                            MIN_VECTORS_PER_CLUSTER, MAX_VECTORS_PER_CLUSTER, size
                        ),
                    ))
                }
            };
            // bbq_disk always carries a rescore vector, regardless of epoch
            let rescore_vector = take_rescore_vector(field, &mut map, epoch)?
                .unwrap_or(RescoreVector::new(DEFAULT_OVERSAMPLE));
            let default_n_probe = match take_i64(field, &mut map, "default_n_probe")? {
                None => DEFAULT_N_PROBE,
                Some(n) if n == -1 || (1..=i32::MAX as i64).contains(&n) => n as i32,
                Some(n) => {
                    return Err(FieldError::configuration(
                        field,
                        format!(
                            "default_n_probe must be at least 1 or exactly -1, got: {} for field [{}]",
                            n, field
                        ),
                    ))
                }
            };
            IndexOptions::BbqDisk {
                cluster_size,
                default_n_probe,
                rescore_vector: Some(rescore_vector),
            }
        }
    };

    check_no_remaining_fields(field, &map)?;
    Ok(parsed)
}

fn check_no_remaining_fields(field: &str, map: &Map<String, Value>) -> Result<(), FieldError> {
    if map.is_empty() {
        return Ok(());
    }
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    Err(FieldError::configuration(
        field,
        format!(
            "Mapping definition for [{}] has unsupported parameters: [{}]",
            field,
            keys.join(", ")
        ),
    ))
}

fn take_graph_params(field: &str, map: &mut Map<String, Value>) -> Result<(u32, u32), FieldError> {
    let m = take_i64(field, map, "m")?.unwrap_or(DEFAULT_M as i64);
    let ef_construction =
        take_i64(field, map, "ef_construction")?.unwrap_or(DEFAULT_EF_CONSTRUCTION as i64);

    if m < 1 || m > MAX_M as i64 {
        return Err(FieldError::configuration(
            field,
            format!("m must be between 1 and {}, got: {}", MAX_M, m),
        ));
    }
    if ef_construction < 1 || ef_construction > MAX_EF_CONSTRUCTION as i64 {
        return Err(FieldError::configuration(
            field,
            format!(
                "ef_construction must be between 1 and {}, got: {}",
                MAX_EF_CONSTRUCTION, ef_construction
            ),
        ));
    }
    Ok((m as u32, ef_construction as u32))
}

/// `0` selects dynamic quantiles; anything else must sit in [0.9, 1.0].
fn take_confidence_interval(
    field: &str,
    map: &mut Map<String, Value>,
) -> Result<Option<f32>, FieldError> {
    let Some(ci) = take_f64(field, map, "confidence_interval")? else {
        return Ok(None);
    };
    if ci != 0.0 && !(0.9..=1.0).contains(&ci) {
        return Err(FieldError::configuration(
            field,
            format!(
                "confidence_interval must be between 0.90 and 1.0 or exactly 0, got: {}",
                ci
            ),
        ));
    }
    Ok(Some(ci as f32))
}

/// Rescore vectors only exist from the `RescoreVector` epoch on; before it the
/// key is left in place and rejected as unknown.
fn take_gated_rescore(
    field: &str,
    map: &mut Map<String, Value>,
    epoch: FormatEpoch,
    bbq: bool,
) -> Result<Option<RescoreVector>, FieldError> {
    if !epoch.accepts_rescore_vector() {
        return Ok(None);
    }
    let rescore = take_rescore_vector(field, map, epoch)?;
    if rescore.is_none() && bbq && epoch.defaults_bbq_oversample() {
        return Ok(Some(RescoreVector::new(DEFAULT_OVERSAMPLE)));
    }
    Ok(rescore)
}

fn take_rescore_vector(
    field: &str,
    map: &mut Map<String, Value>,
    epoch: FormatEpoch,
) -> Result<Option<RescoreVector>, FieldError> {
    let Some(node) = map.remove("rescore_vector") else {
        return Ok(None);
    };
    let Value::Object(mut inner) = node else {
        return Err(FieldError::configuration(
            field,
            "Invalid rescore_vector value. Expected an object",
        ));
    };
    let oversample = take_f64(field, &mut inner, "oversample")?.ok_or_else(|| {
        FieldError::configuration(
            field,
            "Invalid rescore_vector value. Missing required field oversample",
        )
    })? as f32;

    if oversample == 0.0 && !epoch.allows_zero_oversample() {
        return Err(FieldError::configuration(
            field,
            "oversample must be greater than 1",
        ));
    }
    if oversample < 1.0 && oversample != 0.0 {
        return Err(FieldError::configuration(
            field,
            "oversample must be greater than 1 or exactly 0",
        ));
    }
    if oversample > MAX_OVERSAMPLE {
        return Err(FieldError::configuration(
            field,
            "oversample must be less than or equal to 10",
        ));
    }
    Ok(Some(RescoreVector::new(oversample)))
}

fn take_i64(
    field: &str,
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<i64>, FieldError> {
    let Some(value) = map.remove(key) else {
        return Ok(None);
    };
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        FieldError::configuration(
            field,
            format!("[{}] must be an integer but got [{}]", key, value),
        )
    })
}

fn take_f64(
    field: &str,
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<f64>, FieldError> {
    let Some(value) = map.remove(key) else {
        return Ok(None);
    };
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        FieldError::configuration(
            field,
            format!("[{}] must be a number but got [{}]", key, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<IndexOptions, FieldError> {
        parse_with(value, FormatEpoch::CURRENT, false)
    }

    fn parse_with(
        value: Value,
        epoch: FormatEpoch,
        ivf: bool,
    ) -> Result<IndexOptions, FieldError> {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        parse_index_options("emb", &map, epoch, ivf)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            parse(json!({"type": "hnsw"})).unwrap(),
            IndexOptions::hnsw(16, 100)
        );
        assert_eq!(
            parse(json!({"type": "int8_hnsw"})).unwrap(),
            IndexOptions::int8_hnsw(16, 100)
        );
        assert_eq!(
            parse(json!({"type": "bbq_hnsw", "m": 32})).unwrap(),
            IndexOptions::bbq_hnsw(32, 100, Some(3.0))
        );
    }

    #[test]
    fn test_missing_and_unknown_type() {
        let err = parse(json!({"m": 16})).unwrap_err();
        assert!(err.to_string().contains("requires field [type]"));

        let err = parse(json!({"type": "lsh"})).unwrap_err();
        assert!(err.to_string().contains("Unknown vector index options type [lsh]"));
    }

    #[test]
    fn test_bbq_disk_feature_flag() {
        assert!(parse(json!({"type": "bbq_disk"})).is_err());
        let parsed = parse_with(json!({"type": "bbq_disk"}), FormatEpoch::CURRENT, true).unwrap();
        assert_eq!(
            parsed,
            IndexOptions::BbqDisk {
                cluster_size: 384,
                default_n_probe: -1,
                rescore_vector: Some(RescoreVector::new(3.0)),
            }
        );
    }

    #[test]
    fn test_bbq_disk_bounds() {
        let err = parse_with(
            json!({"type": "bbq_disk", "cluster_size": 32}),
            FormatEpoch::CURRENT,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cluster_size must be between 64 and 65536"));

        let err = parse_with(
            json!({"type": "bbq_disk", "default_n_probe": 0}),
            FormatEpoch::CURRENT,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("default_n_probe must be at least 1"));

        let ok = parse_with(
            json!({"type": "bbq_disk", "default_n_probe": 8, "cluster_size": 64}),
            FormatEpoch::CURRENT,
            true,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_leftover_keys_rejected() {
        let err = parse(json!({"type": "flat", "m": 16})).unwrap_err();
        assert!(matches!(err, FieldError::Configuration { .. }));
        assert!(err.to_string().contains("unsupported parameters: [m]"));

        // hnsw is not quantized and never accepts a rescore vector
        let err = parse(json!({"type": "hnsw", "rescore_vector": {"oversample": 2}})).unwrap_err();
        assert!(err.to_string().contains("rescore_vector"));
    }

    #[test]
    fn test_rescore_vector_epoch_gate() {
        let options = json!({"type": "int8_hnsw", "rescore_vector": {"oversample": 2.0}});
        assert!(parse_with(options.clone(), FormatEpoch::DefaultInt8Hnsw, false).is_err());
        let parsed = parse_with(options, FormatEpoch::RescoreVector, false).unwrap();
        assert_eq!(parsed.rescore_vector(), Some(RescoreVector::new(2.0)));
    }

    #[test]
    fn test_oversample_bounds() {
        let with = |os: f64, epoch| {
            parse_with(
                json!({"type": "int4_flat", "rescore_vector": {"oversample": os}}),
                epoch,
                false,
            )
        };
        assert!(with(0.0, FormatEpoch::RescoreVector).is_err());
        assert!(with(0.0, FormatEpoch::RescoreZeroOversample).is_ok());
        assert!(with(0.5, FormatEpoch::CURRENT).is_err());
        assert!(with(1.0, FormatEpoch::CURRENT).is_ok());
        assert!(with(10.0, FormatEpoch::CURRENT).is_ok());
        assert!(with(10.5, FormatEpoch::CURRENT).is_err());

        let err = parse(json!({"type": "int4_flat", "rescore_vector": {}})).unwrap_err();
        assert!(err.to_string().contains("Missing required field oversample"));
    }

    #[test]
    fn test_bbq_default_oversample_epoch_gate() {
        let parsed = parse_with(json!({"type": "bbq_flat"}), FormatEpoch::RescoreZeroOversample, false)
            .unwrap();
        assert_eq!(parsed.rescore_vector(), None);
        let parsed = parse_with(json!({"type": "bbq_flat"}), FormatEpoch::DefaultBbqOversample, false)
            .unwrap();
        assert_eq!(parsed.rescore_vector(), Some(RescoreVector::new(3.0)));
    }

    #[test]
    fn test_confidence_interval_bounds() {
        assert!(parse(json!({"type": "int8_flat", "confidence_interval": 0.5})).is_err());
        assert!(parse(json!({"type": "int8_flat", "confidence_interval": 0})).is_ok());
        let parsed = parse(json!({"type": "int4_hnsw", "confidence_interval": 0.95})).unwrap();
        assert_eq!(parsed.confidence_interval(), Some(0.95));
    }

    #[test]
    fn test_int4_confidence_interval_defaults_to_dynamic() {
        for index_type in ["int4_hnsw", "int4_flat"] {
            let omitted = parse(json!({"type": index_type})).unwrap();
            let explicit = parse(json!({"type": index_type, "confidence_interval": 0})).unwrap();
            assert_eq!(omitted.confidence_interval(), Some(0.0));
            assert_eq!(omitted, explicit);
            assert!(omitted.updatable_to(&explicit));
        }
        let int8 = parse(json!({"type": "int8_hnsw"})).unwrap();
        assert_eq!(int8.confidence_interval(), None);
    }

    #[test]
    fn test_graph_param_bounds() {
        assert!(parse(json!({"type": "hnsw", "m": 0})).is_err());
        assert!(parse(json!({"type": "hnsw", "ef_construction": 5000})).is_err());
        assert!(parse(json!({"type": "hnsw", "m": "abc"})).is_err());
        assert_eq!(
            parse(json!({"type": "hnsw", "m": "24"})).unwrap(),
            IndexOptions::hnsw(24, 100)
        );
    }
}
