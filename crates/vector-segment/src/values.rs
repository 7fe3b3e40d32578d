//! Per-field vector values addressed by ordinal.

use std::collections::HashMap;

use vector_types::{SimilarityFunction, VectorData};

/// Document identifier within a segment.
pub type DocId = u32;

/// Vectors of one indexed field, densely numbered by ordinal.
///
/// Ordinals follow insertion order, so they increase with doc ids.
#[derive(Debug, Clone)]
pub struct KnnVectorValues {
    function: SimilarityFunction,
    docs: Vec<DocId>,
    vectors: Vec<VectorData>,
    doc_to_ord: HashMap<DocId, usize>,
}

impl KnnVectorValues {
    pub fn new(function: SimilarityFunction) -> Self {
        Self {
            function,
            docs: Vec::new(),
            vectors: Vec::new(),
            doc_to_ord: HashMap::new(),
        }
    }

    /// Similarity function the vectors were indexed with.
    pub fn function(&self) -> SimilarityFunction {
        self.function
    }

    pub fn push(&mut self, doc: DocId, vector: VectorData) {
        self.doc_to_ord.insert(doc, self.docs.len());
        self.docs.push(doc);
        self.vectors.push(vector);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn ord_for_doc(&self, doc: DocId) -> Option<usize> {
        self.doc_to_ord.get(&doc).copied()
    }

    pub fn doc_for_ord(&self, ord: usize) -> Option<DocId> {
        self.docs.get(ord).copied()
    }

    pub fn vector(&self, ord: usize) -> Option<&VectorData> {
        self.vectors.get(ord)
    }

    /// Vector for `doc`, if it has one.
    pub fn vector_for_doc(&self, doc: DocId) -> Option<&VectorData> {
        self.ord_for_doc(doc).and_then(|ord| self.vector(ord))
    }

    /// `(doc, vector)` pairs in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &VectorData)> {
        self.docs.iter().copied().zip(self.vectors.iter())
    }
}
