//! Field configuration for dense vector fields.
//!
//! A field is built from a [`FieldMapping`] in two phases. Until `dims` is
//! known the field is [`DenseVectorField::Pending`]; the first document that
//! reveals its dimension count promotes it to [`DenseVectorField::Ready`],
//! at which point deferred index-option defaults are chosen.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use vector_types::{
    ElementType, FieldError, FormatEpoch, Settings, SimilarityFunction, VectorSimilarity,
};

use crate::index_options::{
    IndexOptions, BBQ_DIMS_DEFAULT_THRESHOLD, DEFAULT_EF_CONSTRUCTION, DEFAULT_M,
    DEFAULT_OVERSAMPLE,
};
use crate::parse::parse_index_options;

/// Mapping type name.
pub const CONTENT_TYPE: &str = "dense_vector";

/// Suffix of the per-document magnitude kept for normalized cosine vectors.
pub const MAGNITUDE_SUFFIX: &str = ".magnitude";

/// Raw field definition, as found in a mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dims: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_options: Option<Map<String, Value>>,
}

impl FieldMapping {
    /// Deserialize a mapping object for `field`.
    pub fn from_json(field: &str, value: &Value) -> Result<Self, FieldError> {
        serde_json::from_value(value.clone())
            .map_err(|e| FieldError::configuration(field, e.to_string()))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Environment a mapping is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingContext {
    /// Epoch pinned onto fields created in this context
    pub epoch: FormatEpoch,
    /// Whether `bbq_disk` may be used
    pub ivf_format_enabled: bool,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self {
            epoch: FormatEpoch::CURRENT,
            ivf_format_enabled: false,
        }
    }
}

impl MappingContext {
    pub fn new(epoch: FormatEpoch) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            epoch: settings.format_epoch,
            ivf_format_enabled: settings.ivf_format_enabled,
        }
    }

    pub fn with_ivf(mut self, enabled: bool) -> Self {
        self.ivf_format_enabled = enabled;
        self
    }
}

/// Outcome of default index-option selection.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultIndexOptions {
    /// The choice depends on dims, which are not known yet
    Deferred,
    /// No options apply; the format default is used
    Unset,
    Chosen(IndexOptions),
}

/// Pick index options for a mapping that did not name any.
pub fn default_index_options(
    element_type: ElementType,
    indexed: bool,
    dims: Option<usize>,
    epoch: FormatEpoch,
) -> DefaultIndexOptions {
    if element_type != ElementType::Float || !indexed {
        return DefaultIndexOptions::Unset;
    }
    let bbq_default = epoch.on_or_after(FormatEpoch::DefaultBbqHnsw);
    match dims {
        None if bbq_default => DefaultIndexOptions::Deferred,
        Some(dims) if bbq_default && dims >= BBQ_DIMS_DEFAULT_THRESHOLD => {
            DefaultIndexOptions::Chosen(IndexOptions::bbq_hnsw(
                DEFAULT_M,
                DEFAULT_EF_CONSTRUCTION,
                Some(DEFAULT_OVERSAMPLE),
            ))
        }
        _ if epoch.on_or_after(FormatEpoch::DefaultInt8Hnsw) => DefaultIndexOptions::Chosen(
            IndexOptions::int8_hnsw(DEFAULT_M, DEFAULT_EF_CONSTRUCTION),
        ),
        _ => DefaultIndexOptions::Unset,
    }
}

/// A field whose dimension count is not known yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingField {
    name: String,
    element_type: ElementType,
    indexed: bool,
    similarity: Option<VectorSimilarity>,
    /// Explicitly configured options; defaults wait for dims
    index_options: Option<IndexOptions>,
    epoch: FormatEpoch,
}

impl PendingField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn indexed(&self) -> bool {
        self.indexed
    }

    pub fn similarity(&self) -> Option<VectorSimilarity> {
        self.similarity
    }

    pub fn index_options(&self) -> Option<&IndexOptions> {
        self.index_options.as_ref()
    }

    pub fn epoch(&self) -> FormatEpoch {
        self.epoch
    }

    /// Fix the dimension count and resolve deferred defaults.
    pub fn promote(&self, dims: usize) -> Result<FieldConfig, FieldError> {
        validate_dims(&self.name, self.element_type, dims)?;
        let index_options = match &self.index_options {
            Some(explicit) => {
                explicit.validate_dimension(&self.name, dims)?;
                Some(explicit.clone())
            }
            None => match default_index_options(
                self.element_type,
                self.indexed,
                Some(dims),
                self.epoch,
            ) {
                DefaultIndexOptions::Chosen(options) => Some(options),
                DefaultIndexOptions::Deferred | DefaultIndexOptions::Unset => None,
            },
        };
        info!(
            field = %self.name,
            dims,
            index_options = ?index_options.as_ref().map(|o| o.index_type()),
            "Promoted dense vector field"
        );
        Ok(FieldConfig {
            name: self.name.clone(),
            element_type: self.element_type,
            dims,
            indexed: self.indexed,
            similarity: self.similarity,
            index_options,
            epoch: self.epoch,
        })
    }
}

/// A complete, immutable field configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    name: String,
    element_type: ElementType,
    dims: usize,
    indexed: bool,
    similarity: Option<VectorSimilarity>,
    index_options: Option<IndexOptions>,
    epoch: FormatEpoch,
}

impl FieldConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn indexed(&self) -> bool {
        self.indexed
    }

    pub fn similarity(&self) -> Option<VectorSimilarity> {
        self.similarity
    }

    /// Resolved options; `None` means the format default (plain HNSW) for an
    /// indexed field.
    pub fn index_options(&self) -> Option<&IndexOptions> {
        self.index_options.as_ref()
    }

    pub fn epoch(&self) -> FormatEpoch {
        self.epoch
    }

    /// Comparison function used when indexing, if the field is indexed.
    pub fn similarity_function(&self) -> Option<SimilarityFunction> {
        self.similarity
            .map(|s| s.function(self.element_type, self.epoch))
    }

    /// Whether float cosine vectors are normalized before indexing.
    pub fn normalizes_cosine(&self) -> bool {
        self.indexed
            && self.element_type == ElementType::Float
            && self.similarity == Some(VectorSimilarity::Cosine)
            && self.epoch.normalizes_cosine()
    }

    pub fn is_quantized(&self) -> bool {
        self.index_options
            .as_ref()
            .is_some_and(IndexOptions::is_quantized)
    }

    /// Oversample configured on the index options, if any.
    pub fn rescore_oversample(&self) -> Option<f32> {
        self.index_options
            .as_ref()
            .and_then(IndexOptions::rescore_vector)
            .map(|r| r.oversample)
    }

    /// Name of the auxiliary per-document magnitude field.
    pub fn magnitude_field_name(&self) -> String {
        format!("{}{}", self.name, MAGNITUDE_SUFFIX)
    }

    /// Number of stored components per vector.
    pub fn num_elements(&self) -> usize {
        self.element_type.num_elements(self.dims)
    }

    /// Resolved mapping, with defaults written out.
    pub fn to_mapping(&self) -> FieldMapping {
        FieldMapping {
            field_type: Some(CONTENT_TYPE.to_string()),
            element_type: Some(self.element_type.as_str().to_string()),
            dims: Some(self.dims),
            index: Some(self.indexed),
            similarity: self.similarity.map(|s| s.as_str().to_string()),
            index_options: self.index_options.as_ref().and_then(|o| match o.to_json() {
                Value::Object(map) => Some(map),
                _ => None,
            }),
        }
    }
}

/// A dense vector field in either initialization phase.
#[derive(Debug, Clone, PartialEq)]
pub enum DenseVectorField {
    Pending(PendingField),
    Ready(FieldConfig),
}

impl DenseVectorField {
    /// Resolve `mapping` into a field, applying defaults and validating
    /// every parameter combination.
    pub fn build(
        name: &str,
        mapping: &FieldMapping,
        ctx: &MappingContext,
    ) -> Result<Self, FieldError> {
        if let Some(t) = &mapping.field_type {
            if t != CONTENT_TYPE {
                return Err(FieldError::configuration(
                    name,
                    format!("expected type [{}] but got [{}]", CONTENT_TYPE, t),
                ));
            }
        }

        let element_type = match &mapping.element_type {
            None => ElementType::Float,
            Some(raw) => raw
                .parse::<ElementType>()
                .map_err(|e| FieldError::configuration(name, e))?,
        };

        if let Some(dims) = mapping.dims {
            validate_dims(name, element_type, dims)?;
        }

        let indexed = mapping.index.unwrap_or(ctx.epoch.indexed_by_default());

        let similarity = match &mapping.similarity {
            Some(raw) => Some(
                raw.parse::<VectorSimilarity>()
                    .map_err(|e| FieldError::configuration(name, e))?,
            ),
            None if ctx.epoch.indexed_by_default() && indexed => {
                Some(VectorSimilarity::default_for(element_type))
            }
            None => None,
        };
        if let Some(sim) = similarity {
            if !sim.supports_element_type(element_type) {
                return Err(FieldError::configuration(
                    name,
                    "The [l2_norm] similarity is the only supported similarity for bit vectors",
                ));
            }
        }

        let explicit_options = mapping
            .index_options
            .as_ref()
            .map(|map| parse_index_options(name, map, ctx.epoch, ctx.ivf_format_enabled))
            .transpose()?;

        if indexed {
            if similarity.is_none() {
                return Err(FieldError::configuration(
                    name,
                    "Field [index] requires field [similarity] to be configured and not null",
                ));
            }
        } else {
            if mapping.similarity.is_some() {
                return Err(FieldError::configuration(
                    name,
                    "Field [similarity] can only be specified for a field of type [dense_vector] when it is indexed",
                ));
            }
            if explicit_options.is_some() {
                return Err(FieldError::configuration(
                    name,
                    "Field [index_options] can only be specified for a field of type [dense_vector] when it is indexed",
                ));
            }
        }

        if let Some(options) = &explicit_options {
            options.validate_element_type(name, element_type)?;
        }

        let pending = PendingField {
            name: name.to_string(),
            element_type,
            indexed,
            similarity,
            index_options: explicit_options,
            epoch: ctx.epoch,
        };

        let field = match mapping.dims {
            Some(dims) => DenseVectorField::Ready(pending.promote(dims)?),
            None => {
                debug!(field = %name, element_type = %element_type, "Deferring dense vector defaults until dims are known");
                DenseVectorField::Pending(pending)
            }
        };
        Ok(field)
    }

    /// Build from a raw JSON mapping object.
    pub fn from_json(name: &str, value: &Value, ctx: &MappingContext) -> Result<Self, FieldError> {
        let mapping = FieldMapping::from_json(name, value)?;
        Self::build(name, &mapping, ctx)
    }

    pub fn name(&self) -> &str {
        match self {
            DenseVectorField::Pending(p) => p.name(),
            DenseVectorField::Ready(c) => c.name(),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            DenseVectorField::Pending(p) => p.element_type(),
            DenseVectorField::Ready(c) => c.element_type(),
        }
    }

    pub fn indexed(&self) -> bool {
        match self {
            DenseVectorField::Pending(p) => p.indexed(),
            DenseVectorField::Ready(c) => c.indexed(),
        }
    }

    pub fn similarity(&self) -> Option<VectorSimilarity> {
        match self {
            DenseVectorField::Pending(p) => p.similarity(),
            DenseVectorField::Ready(c) => c.similarity(),
        }
    }

    pub fn index_options(&self) -> Option<&IndexOptions> {
        match self {
            DenseVectorField::Pending(p) => p.index_options(),
            DenseVectorField::Ready(c) => c.index_options(),
        }
    }

    pub fn epoch(&self) -> FormatEpoch {
        match self {
            DenseVectorField::Pending(p) => p.epoch(),
            DenseVectorField::Ready(c) => c.epoch(),
        }
    }

    pub fn dims(&self) -> Option<usize> {
        match self {
            DenseVectorField::Pending(_) => None,
            DenseVectorField::Ready(c) => Some(c.dims()),
        }
    }

    pub fn as_ready(&self) -> Option<&FieldConfig> {
        match self {
            DenseVectorField::Pending(_) => None,
            DenseVectorField::Ready(c) => Some(c),
        }
    }

    /// Resolved mapping; pending fields omit `dims` and deferred options.
    pub fn to_mapping(&self) -> FieldMapping {
        match self {
            DenseVectorField::Ready(c) => c.to_mapping(),
            DenseVectorField::Pending(p) => FieldMapping {
                field_type: Some(CONTENT_TYPE.to_string()),
                element_type: Some(p.element_type.as_str().to_string()),
                dims: None,
                index: Some(p.indexed),
                similarity: p.similarity.map(|s| s.as_str().to_string()),
                index_options: p.index_options.as_ref().and_then(|o| match o.to_json() {
                    Value::Object(map) => Some(map),
                    _ => None,
                }),
            },
        }
    }

    /// Apply a mapping update, keeping the field's pinned epoch.
    ///
    /// Parameters the update leaves out keep their current values. Fails
    /// with `SchemaEvolutionRejected` when the update changes an immutable
    /// parameter or moves index options against the update order; the
    /// existing field is left untouched either way.
    pub fn merge(&self, update: &FieldMapping, ivf_format_enabled: bool) -> Result<Self, FieldError> {
        let name = self.name();
        let epoch = self.epoch();
        let reject = |param: &str, from: String, to: String| FieldError::SchemaEvolutionRejected {
            field: name.to_string(),
            reason: format!("Cannot update parameter [{}] from [{}] to [{}]", param, from, to),
        };

        let mut merged = self.to_mapping();

        if let Some(raw) = &update.element_type {
            let element_type = raw
                .parse::<ElementType>()
                .map_err(|e| FieldError::configuration(name, e))?;
            if element_type != self.element_type() {
                return Err(reject(
                    "element_type",
                    self.element_type().to_string(),
                    element_type.to_string(),
                ));
            }
        }
        if let Some(index) = update.index {
            if index != self.indexed() {
                return Err(reject("index", self.indexed().to_string(), index.to_string()));
            }
        }
        if let Some(raw) = &update.similarity {
            let similarity = raw
                .parse::<VectorSimilarity>()
                .map_err(|e| FieldError::configuration(name, e))?;
            if Some(similarity) != self.similarity() {
                return Err(reject(
                    "similarity",
                    display_opt(self.similarity()),
                    similarity.to_string(),
                ));
            }
        }
        if let Some(dims) = update.dims {
            match self.dims() {
                Some(current) if current != dims => {
                    return Err(reject("dims", current.to_string(), dims.to_string()));
                }
                _ => merged.dims = Some(dims),
            }
        }
        if let Some(raw_options) = &update.index_options {
            let candidate = parse_index_options(name, raw_options, epoch, ivf_format_enabled)?;
            if let Some(existing) = self.index_options() {
                if existing != &candidate && !existing.updatable_to(&candidate) {
                    return Err(reject(
                        "index_options",
                        existing.to_string(),
                        candidate.to_string(),
                    ));
                }
            }
            merged.index_options = match candidate.to_json() {
                Value::Object(map) => Some(map),
                _ => None,
            };
        }

        let field = Self::build(
            name,
            &merged,
            &MappingContext {
                epoch,
                ivf_format_enabled,
            },
        )?;
        info!(
            field = %name,
            dims = ?field.dims(),
            index_options = ?field.index_options().map(IndexOptions::index_type),
            "Merged dense vector mapping update"
        );
        Ok(field)
    }
}

fn display_opt(similarity: Option<VectorSimilarity>) -> String {
    similarity
        .map(|s| s.to_string())
        .unwrap_or_else(|| "null".to_string())
}

/// Check `dims` against the element type's bounds.
pub fn validate_dims(field: &str, element_type: ElementType, dims: usize) -> Result<(), FieldError> {
    let (min, max) = element_type.dims_range();
    if dims < min || dims > max {
        return Err(FieldError::configuration(
            field,
            format!(
                "The number of dimensions should be in the range [{}, {}] but was [{}]",
                min, max, dims
            ),
        ));
    }
    if element_type == ElementType::Bit && dims % 8 != 0 {
        return Err(FieldError::configuration(
            field,
            format!(
                "The number of dimensions for should be a multiple of 8 but was [{}]",
                dims
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_options::{RescoreVector, VectorIndexType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(value: Value) -> Result<DenseVectorField, FieldError> {
        DenseVectorField::from_json("emb", &value, &MappingContext::default())
    }

    fn build_at(value: Value, epoch: FormatEpoch) -> Result<DenseVectorField, FieldError> {
        DenseVectorField::from_json("emb", &value, &MappingContext::new(epoch))
    }

    fn ready(value: Value) -> FieldConfig {
        match build(value).unwrap() {
            DenseVectorField::Ready(c) => c,
            DenseVectorField::Pending(p) => panic!("field {} still pending", p.name()),
        }
    }

    #[test]
    fn test_defaults_on_current_epoch() {
        let config = ready(json!({"type": "dense_vector", "dims": 128}));
        assert_eq!(config.element_type(), ElementType::Float);
        assert!(config.indexed());
        assert_eq!(config.similarity(), Some(VectorSimilarity::Cosine));
        assert_eq!(
            config.index_options(),
            Some(&IndexOptions::int8_hnsw(16, 100))
        );
        assert_eq!(
            config.similarity_function(),
            Some(SimilarityFunction::DotProduct)
        );
        assert!(config.normalizes_cosine());
    }

    #[test]
    fn test_bbq_default_for_large_dims() {
        let config = ready(json!({"dims": 384}));
        assert_eq!(
            config.index_options(),
            Some(&IndexOptions::bbq_hnsw(16, 100, Some(3.0)))
        );
        assert_eq!(config.rescore_oversample(), Some(3.0));
    }

    #[test]
    fn test_default_selection_tiers() {
        use DefaultIndexOptions::*;
        let f = ElementType::Float;
        assert_eq!(default_index_options(f, true, None, FormatEpoch::CURRENT), Deferred);
        assert_eq!(
            default_index_options(f, true, None, FormatEpoch::DefaultInt8Hnsw),
            Chosen(IndexOptions::int8_hnsw(16, 100))
        );
        assert_eq!(
            default_index_options(f, true, Some(1024), FormatEpoch::DefaultBbqOversample),
            Chosen(IndexOptions::int8_hnsw(16, 100))
        );
        assert_eq!(
            default_index_options(f, true, Some(1024), FormatEpoch::NormalizedCosine),
            Unset
        );
        assert_eq!(
            default_index_options(ElementType::Byte, true, Some(1024), FormatEpoch::CURRENT),
            Unset
        );
        assert_eq!(default_index_options(f, false, Some(1024), FormatEpoch::CURRENT), Unset);
    }

    #[test]
    fn test_pending_then_promote() {
        let field = build(json!({"element_type": "float"})).unwrap();
        let DenseVectorField::Pending(pending) = field else {
            panic!("expected pending field");
        };
        assert_eq!(pending.index_options(), None);

        let small = pending.promote(128).unwrap();
        assert_eq!(
            small.index_options().map(IndexOptions::index_type),
            Some(VectorIndexType::Int8Hnsw)
        );
        let large = pending.promote(512).unwrap();
        assert_eq!(
            large.index_options().map(IndexOptions::index_type),
            Some(VectorIndexType::BbqHnsw)
        );
        assert!(pending.promote(5000).is_err());
    }

    #[test]
    fn test_promote_validates_explicit_options() {
        let field = build(json!({"index_options": {"type": "int4_flat"}})).unwrap();
        let DenseVectorField::Pending(pending) = field else {
            panic!("expected pending field");
        };
        assert!(matches!(
            pending.promote(5),
            Err(FieldError::Configuration { .. })
        ));
        assert!(pending.promote(6).is_ok());
    }

    #[test]
    fn test_bit_rejects_cosine() {
        let err = build(json!({"element_type": "bit", "dims": 16, "similarity": "cosine"}))
            .unwrap_err();
        assert!(matches!(err, FieldError::Configuration { .. }));

        let config = ready(json!({"element_type": "bit", "dims": 16}));
        assert_eq!(config.similarity(), Some(VectorSimilarity::L2Norm));
        assert_eq!(config.index_options(), None);
    }

    #[test]
    fn test_dims_bounds() {
        assert!(build(json!({"dims": 0})).is_err());
        assert!(build(json!({"dims": 4097})).is_err());
        assert!(build(json!({"dims": 4096, "index": false})).is_ok());
        assert!(build(json!({"element_type": "bit", "dims": 12})).is_err());
        assert!(build(json!({"element_type": "bit", "dims": 4})).is_err());
        assert!(build(json!({"element_type": "bit", "dims": 32768})).is_ok());
    }

    #[test]
    fn test_int4_flat_even_dims() {
        assert!(matches!(
            build(json!({"dims": 5, "index_options": {"type": "int4_flat"}})),
            Err(FieldError::Configuration { .. })
        ));
        assert!(build(json!({"dims": 6, "index_options": {"type": "int4_flat"}})).is_ok());
    }

    #[test]
    fn test_quantized_requires_float() {
        let err = build(json!({
            "element_type": "byte",
            "dims": 8,
            "index_options": {"type": "int8_hnsw"}
        }))
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("[element_type] cannot be [byte] when using index type [int8_hnsw]"));
        assert!(build(json!({
            "element_type": "byte",
            "dims": 8,
            "index_options": {"type": "hnsw"}
        }))
        .is_ok());
    }

    #[test]
    fn test_not_indexed_forbids_similarity_and_options() {
        let config = ready(json!({"dims": 3, "index": false}));
        assert_eq!(config.similarity(), None);
        assert_eq!(config.index_options(), None);
        assert_eq!(config.similarity_function(), None);

        assert!(build(json!({"dims": 3, "index": false, "similarity": "l2_norm"})).is_err());
        assert!(build(json!({"dims": 3, "index": false, "index_options": {"type": "flat"}})).is_err());
    }

    #[test]
    fn test_legacy_epoch_not_indexed_by_default() {
        let field = build_at(json!({"dims": 3}), FormatEpoch::Legacy).unwrap();
        assert!(!field.indexed());
        assert_eq!(field.similarity(), None);

        let err = build_at(json!({"dims": 3, "index": true}), FormatEpoch::Legacy).unwrap_err();
        assert!(err.to_string().contains("requires field [similarity]"));
    }

    #[test]
    fn test_invalid_element_type() {
        let err = build(json!({"element_type": "half", "dims": 3})).unwrap_err();
        assert!(err.to_string().contains("invalid element_type [half]"));
        assert!(build(json!({"dims": 3, "bogus": true})).is_err());
    }

    #[test]
    fn test_merge_index_options_upgrade() {
        let current = build(json!({"dims": 128, "index_options": {"type": "hnsw"}})).unwrap();
        let update = FieldMapping::from_json(
            "emb",
            &json!({"dims": 128, "index_options": {"type": "int8_hnsw", "m": 32}}),
        )
        .unwrap();
        let merged = current.merge(&update, false).unwrap();
        assert_eq!(
            merged.index_options().and_then(IndexOptions::m),
            Some(32)
        );

        let downgrade = FieldMapping::from_json(
            "emb",
            &json!({"dims": 128, "index_options": {"type": "hnsw"}}),
        )
        .unwrap();
        let err = merged.merge(&downgrade, false).unwrap_err();
        assert!(matches!(err, FieldError::SchemaEvolutionRejected { .. }));
        assert!(!err.is_local());
    }

    #[test]
    fn test_merge_int4_explicit_dynamic_interval() {
        for index_type in ["int4_hnsw", "int4_flat"] {
            let current =
                build(json!({"dims": 64, "index_options": {"type": index_type}})).unwrap();
            assert_eq!(
                current.index_options().and_then(IndexOptions::confidence_interval),
                Some(0.0)
            );
            let update = FieldMapping::from_json(
                "emb",
                &json!({
                    "dims": 64,
                    "index_options": {"type": index_type, "confidence_interval": 0}
                }),
            )
            .unwrap();
            let merged = current.merge(&update, false).unwrap();
            assert_eq!(merged.index_options(), current.index_options());
        }

        let current =
            build(json!({"dims": 64, "index_options": {"type": "int4_hnsw"}})).unwrap();
        let pinned = FieldMapping::from_json(
            "emb",
            &json!({
                "dims": 64,
                "index_options": {"type": "int4_hnsw", "confidence_interval": 0.95}
            }),
        )
        .unwrap();
        assert!(matches!(
            current.merge(&pinned, false),
            Err(FieldError::SchemaEvolutionRejected { .. })
        ));
    }

    #[test]
    fn test_merge_immutable_params() {
        let current = build(json!({"dims": 4, "similarity": "l2_norm"})).unwrap();
        let cases = [
            json!({"dims": 4, "similarity": "dot_product"}),
            json!({"dims": 8, "similarity": "l2_norm"}),
            json!({"dims": 4, "similarity": "l2_norm", "element_type": "byte"}),
            json!({"index": false}),
            json!({"index_options": {"type": "flat"}}),
        ];
        for case in cases {
            let update = FieldMapping::from_json("emb", &case).unwrap();
            assert!(
                matches!(
                    current.merge(&update, false),
                    Err(FieldError::SchemaEvolutionRejected { .. })
                ),
                "accepted {}",
                case
            );
        }
    }

    #[test]
    fn test_merge_sets_dims_once() {
        let current = build(json!({"similarity": "l2_norm"})).unwrap();
        assert_eq!(current.dims(), None);
        let update = FieldMapping::from_json("emb", &json!({"dims": 64, "similarity": "l2_norm"}))
            .unwrap();
        let merged = current.merge(&update, false).unwrap();
        assert_eq!(merged.dims(), Some(64));
    }

    #[test]
    fn test_merge_keeps_existing_when_update_is_unset() {
        let current = build_at(
            json!({"dims": 16, "index": true, "similarity": "l2_norm", "index_options": {"type": "flat"}}),
            FormatEpoch::NormalizedCosine,
        )
        .unwrap();
        let update = FieldMapping::from_json(
            "emb",
            &json!({"dims": 16, "index": true, "similarity": "l2_norm"}),
        )
        .unwrap();
        let merged = current.merge(&update, false).unwrap();
        assert_eq!(merged.index_options(), Some(&IndexOptions::Flat));
        assert_eq!(merged.epoch(), FormatEpoch::NormalizedCosine);
    }

    #[test]
    fn test_to_mapping_round_trip() {
        let config = ready(json!({
            "dims": 64,
            "similarity": "dot_product",
            "index_options": {"type": "int8_flat", "rescore_vector": {"oversample": 2.0}}
        }));
        assert_eq!(
            config.index_options().and_then(IndexOptions::rescore_vector),
            Some(RescoreVector::new(2.0))
        );
        let mapping = config.to_mapping();
        let rebuilt = DenseVectorField::build("emb", &mapping, &MappingContext::default()).unwrap();
        assert_eq!(rebuilt, DenseVectorField::Ready(config));
    }

    #[test]
    fn test_magnitude_field_name() {
        let config = ready(json!({"dims": 3}));
        assert_eq!(config.magnitude_field_name(), "emb.magnitude");
    }
}
