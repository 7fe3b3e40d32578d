//! Command implementations for densevec.
//!
//! Every command returns a JSON report; `main` prints it.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use vector_codec::{decode_raw_buffer, IndexEntry, ParsedDocument, VectorEncoder};
use vector_mapping::{DenseVectorField, FieldConfig, FieldMapping, MappingContext, VectorsFormat};
use vector_query::{create_knn_query, KnnRequest, SearchDefaults};
use vector_segment::{DocId, Segment, SegmentBuilder, SegmentReader};
use vector_source::{synthesize_source, vector_to_json};
use vector_types::{FormatEpoch, Settings, VectorData};

use crate::cli::Commands;

/// Relative drift tolerated between a stored vector and its re-encoded source.
pub const ROUNDTRIP_TOLERANCE: f32 = 1e-3;

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level: Option<&str>,
    epoch: Option<FormatEpoch>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(log_level) = log_level {
        settings.log_level = log_level.to_string();
    }
    if let Some(epoch) = epoch {
        settings.format_epoch = epoch;
    }
    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Logging already initialized");
    }
}

/// Dispatch a parsed command.
pub fn run(command: Commands, settings: &Settings) -> Result<Value> {
    let ctx = MappingContext::from_settings(settings);
    match command {
        Commands::Check { mapping } => check_mapping(&mapping, &ctx),
        Commands::Update { current, update } => update_mapping(&current, &update, &ctx),
        Commands::Encode { mapping, doc } => encode_document(&mapping, &doc, &ctx),
        Commands::Explain { mapping, request } => {
            explain_query(&mapping, &request, &ctx, &SearchDefaults::from_settings(settings))
        }
        Commands::Roundtrip { mapping, vectors } => roundtrip(&mapping, &vectors, &ctx),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Field definitions of a mapping, unwrapping `properties` when present.
fn properties(mapping: &Value) -> Result<&Map<String, Value>> {
    mapping
        .get("properties")
        .unwrap_or(mapping)
        .as_object()
        .context("Mapping must be an object of field definitions")
}

/// Resolve every field of the mapping file at `path`.
pub fn load_fields(path: &Path, ctx: &MappingContext) -> Result<Vec<DenseVectorField>> {
    let mapping = read_json(path)?;
    properties(&mapping)?
        .iter()
        .map(|(name, definition)| {
            DenseVectorField::from_json(name, definition, ctx)
                .with_context(|| format!("Invalid mapping for field [{}]", name))
        })
        .collect()
}

fn describe_field(field: &DenseVectorField) -> Value {
    let format = field
        .as_ready()
        .and_then(VectorsFormat::for_field)
        .map(|f| serde_json::to_value(f).unwrap_or(Value::Null));
    json!({
        "mapping": field.to_mapping().to_json(),
        "epoch": field.epoch().as_str(),
        "pending": field.as_ready().is_none(),
        "format": format,
    })
}

pub fn check_mapping(path: &Path, ctx: &MappingContext) -> Result<Value> {
    let fields = load_fields(path, ctx)?;
    info!(fields = fields.len(), epoch = %ctx.epoch, "Resolved mapping");
    let report: Map<String, Value> = fields
        .iter()
        .map(|field| (field.name().to_string(), describe_field(field)))
        .collect();
    Ok(Value::Object(report))
}

/// Merge `update` into `current`. New fields are created in `ctx`; existing
/// fields keep the epoch they were created with.
pub fn update_mapping(current: &Path, update: &Path, ctx: &MappingContext) -> Result<Value> {
    let mut fields: Map<String, Value> = Map::new();
    let existing = load_fields(current, ctx)?;
    let update = read_json(update)?;

    for field in &existing {
        fields.insert(field.name().to_string(), describe_field(field));
    }
    for (name, definition) in properties(&update)? {
        let mapping = FieldMapping::from_json(name, definition)?;
        let merged = match existing.iter().find(|f| f.name() == name) {
            Some(field) => field.merge(&mapping, ctx.ivf_format_enabled)?,
            None => DenseVectorField::build(name, &mapping, ctx)?,
        };
        debug!(field = %name, "Applied mapping update");
        fields.insert(name.clone(), describe_field(&merged));
    }
    Ok(Value::Object(fields))
}

fn entry_to_json(entry: &IndexEntry) -> Value {
    match entry {
        IndexEntry::KnnVector {
            field,
            vector,
            function,
        } => json!({
            "kind": "knn_vector",
            "field": field,
            "function": function.as_str(),
            "vector": vector_to_json(vector),
        }),
        IndexEntry::Magnitude { field, magnitude } => json!({
            "kind": "magnitude",
            "field": field,
            "magnitude": magnitude,
        }),
        IndexEntry::BinaryDocValue { field, bytes } => json!({
            "kind": "binary_doc_value",
            "field": field,
            "hex": bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>(),
        }),
    }
}

pub fn encode_document(mapping: &Path, doc: &Path, ctx: &MappingContext) -> Result<Value> {
    let fields = load_fields(mapping, ctx)?;
    let doc = read_json(doc)?;
    let object = doc.as_object().context("Document must be a JSON object")?;

    let mut parsed = ParsedDocument::new();
    let mut updates = Vec::new();
    for field in &fields {
        if let Some(value) = object.get(field.name()) {
            if let Some(promoted) = parsed.add_field(field, value)? {
                updates.push((promoted.name().to_string(), promoted.to_mapping().to_json()));
            }
        }
    }
    Ok(json!({
        "entries": parsed.entries().iter().map(entry_to_json).collect::<Vec<_>>(),
        "mapping_updates": updates.into_iter().collect::<Map<String, Value>>(),
    }))
}

pub fn explain_query(
    mapping: &Path,
    request: &Path,
    ctx: &MappingContext,
    defaults: &SearchDefaults,
) -> Result<Value> {
    let fields = load_fields(mapping, ctx)?;
    let request: KnnRequest =
        serde_json::from_value(read_json(request)?).context("Invalid kNN request")?;
    let Some(field) = fields.iter().find(|f| f.name() == request.field) else {
        bail!("Unknown field [{}]", request.field);
    };
    let query = create_knn_query(field, &request, defaults)?;
    Ok(json!({
        "plan": query.to_string(),
        "query": serde_json::to_value(&query)?,
    }))
}

/// Largest component difference, relative to the component's size (or 1).
fn max_relative_drift(stored: &VectorData, reencoded: &VectorData) -> Option<f32> {
    match (stored, reencoded) {
        (VectorData::Floats(a), VectorData::Floats(b)) if a.len() == b.len() => Some(
            a.iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs() / x.abs().max(1.0))
                .fold(0.0, f32::max),
        ),
        (VectorData::Bytes(a), VectorData::Bytes(b)) if a.len() == b.len() => {
            Some(if a == b { 0.0 } else { f32::INFINITY })
        }
        _ => None,
    }
}

/// The vector a field stored for `doc`, as found in the segment.
fn stored_vector(segment: &Segment, config: &FieldConfig, doc: DocId) -> Option<VectorData> {
    if config.indexed() {
        segment
            .vector_values(config.name())
            .and_then(|values| values.vector_for_doc(doc))
            .cloned()
    } else {
        let raw = segment.binary_doc_value(config.name(), doc)?;
        decode_raw_buffer(config.element_type(), config.dims(), config.epoch(), raw)
            .ok()
            .map(|(vector, _)| vector)
    }
}

/// The vector a list of entries would store for `config`.
fn encoded_vector(config: &FieldConfig, entries: &[IndexEntry]) -> Option<VectorData> {
    entries.iter().find_map(|entry| match entry {
        IndexEntry::KnnVector { vector, .. } => Some(vector.clone()),
        IndexEntry::BinaryDocValue { bytes, .. } => {
            decode_raw_buffer(config.element_type(), config.dims(), config.epoch(), bytes)
                .ok()
                .map(|(vector, _)| vector)
        }
        IndexEntry::Magnitude { .. } => None,
    })
}

/// Index every document, rebuild its vector source and push that source
/// through the encoder again. Fails when a re-encoded vector drifts from
/// the stored one by more than [`ROUNDTRIP_TOLERANCE`].
pub fn roundtrip(mapping: &Path, vectors: &Path, ctx: &MappingContext) -> Result<Value> {
    let mut builder = SegmentBuilder::new();
    for field in load_fields(mapping, ctx)? {
        builder.add_field(field);
    }

    let raw = fs::read_to_string(vectors)
        .with_context(|| format!("Failed to read {}", vectors.display()))?;
    let mut rejected = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", line_no + 1))?;
        if let Err(e) = builder.add_document(&doc) {
            warn!(line = line_no + 1, error = %e, "Rejected document");
            rejected.push(json!({"line": line_no + 1, "error": e.to_string()}));
        }
    }
    let segment = builder.build()?;

    let mut exact = 0usize;
    let mut within_tolerance = 0usize;
    let mut drifted = Vec::new();
    for doc in 0..segment.max_doc() {
        let source = synthesize_source(&segment, doc)?;
        for (name, value) in &source {
            let Some(config) = segment.config(name)? else {
                continue;
            };
            let entries = VectorEncoder::new(config).encode_value(value)?;
            let drift = stored_vector(&segment, config, doc)
                .zip(encoded_vector(config, &entries))
                .and_then(|(stored, reencoded)| max_relative_drift(&stored, &reencoded));
            match drift {
                Some(d) if d == 0.0 => exact += 1,
                Some(d) if d <= ROUNDTRIP_TOLERANCE => within_tolerance += 1,
                _ => drifted.push(json!({"doc": doc, "field": name, "drift": drift})),
            }
        }
    }
    info!(
        documents = segment.max_doc(),
        exact,
        within_tolerance,
        drifted = drifted.len(),
        "Round trip complete"
    );

    let report = json!({
        "documents": segment.max_doc(),
        "rejected": rejected,
        "exact": exact,
        "within_tolerance": within_tolerance,
        "drifted": drifted,
    });
    if !drifted.is_empty() {
        bail!("Source round trip drifted: {}", report);
    }
    Ok(report)
}
