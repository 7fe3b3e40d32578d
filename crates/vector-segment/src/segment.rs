//! Segment builder and read-only segment.
//!
//! Documents are JSON objects; keys naming a registered dense_vector field
//! are parsed and encoded, everything else is ignored. A document that fails
//! validation leaves the builder untouched.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};
use vector_codec::{IndexEntry, ParsedDocument};
use vector_mapping::{DenseVectorField, FieldConfig, VectorsFormat};
use vector_types::ElementType;

use crate::error::SegmentError;
use crate::graph::VectorGraph;
use crate::values::{DocId, KnnVectorValues};

/// Read access to the stored structures of a segment.
pub trait SegmentReader {
    /// One past the highest doc id.
    fn max_doc(&self) -> DocId;

    /// Registered dense_vector fields, sorted by name.
    fn field_names(&self) -> Vec<&str>;

    fn field(&self, name: &str) -> Option<&DenseVectorField>;

    fn vector_values(&self, field: &str) -> Option<&KnnVectorValues>;

    fn numeric_doc_value(&self, field: &str, doc: DocId) -> Option<f32>;

    fn binary_doc_value(&self, field: &str, doc: DocId) -> Option<&[u8]>;
}

#[derive(Debug, Default)]
struct Stores {
    vectors: BTreeMap<String, KnnVectorValues>,
    numeric: BTreeMap<String, BTreeMap<DocId, f32>>,
    binary: BTreeMap<String, BTreeMap<DocId, Bytes>>,
}

impl Stores {
    fn apply(&mut self, doc: DocId, entries: Vec<IndexEntry>) {
        for entry in entries {
            match entry {
                IndexEntry::KnnVector {
                    field,
                    vector,
                    function,
                } => self
                    .vectors
                    .entry(field)
                    .or_insert_with(|| KnnVectorValues::new(function))
                    .push(doc, vector),
                IndexEntry::Magnitude { field, magnitude } => {
                    self.numeric.entry(field).or_default().insert(doc, magnitude);
                }
                IndexEntry::BinaryDocValue { field, bytes } => {
                    self.binary.entry(field).or_default().insert(doc, bytes);
                }
            }
        }
    }
}

/// Accumulates documents into a [`Segment`].
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    fields: BTreeMap<String, DenseVectorField>,
    stores: Stores,
    parents: BTreeSet<DocId>,
    next_doc: DocId,
    updates: Vec<FieldConfig>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Replaces any field of the same name.
    pub fn add_field(&mut self, field: DenseVectorField) {
        self.fields.insert(field.name().to_string(), field);
    }

    pub fn with_field(mut self, field: DenseVectorField) -> Self {
        self.add_field(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&DenseVectorField> {
        self.fields.get(name)
    }

    /// Fields promoted by dimension inference so far.
    pub fn mapping_updates(&self) -> &[FieldConfig] {
        &self.updates
    }

    /// Add one document and return its id.
    pub fn add_document(&mut self, doc: &Value) -> Result<DocId, SegmentError> {
        let mut promoted = BTreeMap::new();
        let entries = self.parse(doc, &mut promoted)?;
        let id = self.commit(vec![entries], promoted);
        Ok(id)
    }

    /// Add nested children followed by their parent, as one block.
    ///
    /// Returns the parent's id; children take the ids just below it.
    pub fn add_block(&mut self, children: &[Value], parent: &Value) -> Result<DocId, SegmentError> {
        let mut promoted = BTreeMap::new();
        let mut block = Vec::with_capacity(children.len() + 1);
        for doc in children.iter().chain(std::iter::once(parent)) {
            block.push(self.parse(doc, &mut promoted)?);
        }
        let parent_id = self.commit(block, promoted);
        self.parents.insert(parent_id);
        Ok(parent_id)
    }

    fn parse(
        &self,
        doc: &Value,
        promoted: &mut BTreeMap<String, DenseVectorField>,
    ) -> Result<Vec<IndexEntry>, SegmentError> {
        let object = doc
            .as_object()
            .ok_or_else(|| SegmentError::Document(format!("expected an object but got [{}]", doc)))?;
        let mut parsed = ParsedDocument::new();
        for (name, value) in object {
            let Some(field) = promoted.get(name).or_else(|| self.fields.get(name)) else {
                continue;
            };
            if let Some(config) = parsed.add_field(field, value)? {
                promoted.insert(name.clone(), DenseVectorField::Ready(config));
            }
        }
        Ok(parsed.into_entries())
    }

    /// Store parsed documents under consecutive ids; returns the last id.
    fn commit(
        &mut self,
        docs: Vec<Vec<IndexEntry>>,
        promoted: BTreeMap<String, DenseVectorField>,
    ) -> DocId {
        for (name, field) in promoted {
            if let DenseVectorField::Ready(config) = &field {
                self.updates.push(config.clone());
            }
            self.fields.insert(name, field);
        }
        let mut last = self.next_doc;
        for entries in docs {
            last = self.next_doc;
            self.stores.apply(last, entries);
            self.next_doc += 1;
        }
        debug!(doc = last, "Added document");
        last
    }

    /// Freeze the builder, building graphs for float fields that have one.
    pub fn build(self) -> Result<Segment, SegmentError> {
        let mut graphs = BTreeMap::new();
        for (name, field) in &self.fields {
            let Some(config) = field.as_ready() else {
                continue;
            };
            if config.element_type() != ElementType::Float {
                continue;
            }
            let (Some(format), Some(values)) = (
                VectorsFormat::for_field(config),
                self.stores.vectors.get(name),
            ) else {
                continue;
            };
            if let Some(graph) = VectorGraph::build(&format, config.dims(), values)? {
                graphs.insert(name.clone(), graph);
            }
        }

        info!(
            docs = self.next_doc,
            fields = self.fields.len(),
            graphs = graphs.len(),
            "Built segment"
        );
        Ok(Segment {
            fields: self.fields,
            stores: self.stores,
            graphs,
            parents: self.parents,
            max_doc: self.next_doc,
        })
    }
}

/// Immutable set of documents and their vector structures.
#[derive(Debug)]
pub struct Segment {
    fields: BTreeMap<String, DenseVectorField>,
    stores: Stores,
    graphs: BTreeMap<String, VectorGraph>,
    parents: BTreeSet<DocId>,
    max_doc: DocId,
}

impl Segment {
    /// Graph backing `field`, if its format has one.
    pub fn graph(&self, field: &str) -> Option<&VectorGraph> {
        self.graphs.get(field)
    }

    /// Ids of documents added as block parents.
    pub fn parent_docs(&self) -> &BTreeSet<DocId> {
        &self.parents
    }

    /// Resolved configuration of `field`.
    pub fn config(&self, field: &str) -> Result<Option<&FieldConfig>, SegmentError> {
        self.fields
            .get(field)
            .map(DenseVectorField::as_ready)
            .ok_or_else(|| SegmentError::UnknownField(field.to_string()))
    }
}

impl SegmentReader for Segment {
    fn max_doc(&self) -> DocId {
        self.max_doc
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    fn field(&self, name: &str) -> Option<&DenseVectorField> {
        self.fields.get(name)
    }

    fn vector_values(&self, field: &str) -> Option<&KnnVectorValues> {
        self.stores.vectors.get(field)
    }

    fn numeric_doc_value(&self, field: &str, doc: DocId) -> Option<f32> {
        self.stores
            .numeric
            .get(field)
            .and_then(|values| values.get(&doc))
            .copied()
    }

    fn binary_doc_value(&self, field: &str, doc: DocId) -> Option<&[u8]> {
        self.stores
            .binary
            .get(field)
            .and_then(|values| values.get(&doc))
            .map(|bytes| bytes.as_ref())
    }
}
