//! Document filters handed in by the caller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vector_segment::DocId;

/// Predicate over doc ids.
pub trait DocFilter {
    fn matches(&self, doc: DocId) -> bool;
}

impl<F: Fn(DocId) -> bool> DocFilter for F {
    fn matches(&self, doc: DocId) -> bool {
        self(doc)
    }
}

/// An explicit, ordered set of doc ids.
///
/// Used both for metadata filters and for the parent filter of nested
/// blocks, where each child's parent is the next set member at or above it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocIdSet(BTreeSet<DocId>);

impl DocIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: DocId) -> bool {
        self.0.insert(doc)
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.0.contains(&doc)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First member at or above `doc`.
    pub fn next_at_or_above(&self, doc: DocId) -> Option<DocId> {
        self.0.range(doc..).next().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.0.iter().copied()
    }
}

impl DocFilter for DocIdSet {
    fn matches(&self, doc: DocId) -> bool {
        self.contains(doc)
    }
}

impl FromIterator<DocId> for DocIdSet {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        DocIdSet(iter.into_iter().collect())
    }
}

impl From<&BTreeSet<DocId>> for DocIdSet {
    fn from(docs: &BTreeSet<DocId>) -> Self {
        DocIdSet(docs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_parent() {
        let parents: DocIdSet = [2, 5].into_iter().collect();
        assert_eq!(parents.next_at_or_above(0), Some(2));
        assert_eq!(parents.next_at_or_above(3), Some(5));
        assert_eq!(parents.next_at_or_above(6), None);
    }

    #[test]
    fn test_closure_filter() {
        let even = |doc: DocId| doc % 2 == 0;
        assert!(even.matches(4));
        assert!(!even.matches(3));
    }

    #[test]
    fn test_serde_transparent() {
        let set: DocIdSet = serde_json::from_str("[3, 1]").unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
