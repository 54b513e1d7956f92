use std::collections::{BTreeMap, HashMap};

use crate::error::{DatasetError, Result};

// ---------------------------------------------------------------------------
// LabelIndexer – label ↔ integer index bookkeeping
// ---------------------------------------------------------------------------

/// Assigns consecutive indices `0..N` to labels in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LabelIndexer {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelIndexer {
    /// Build an indexer from a label sequence that may contain duplicates.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut indexer = LabelIndexer::default();
        for label in labels {
            let label = label.as_ref();
            if !indexer.index.contains_key(label) {
                indexer.index.insert(label.to_string(), indexer.labels.len());
                indexer.labels.push(label.to_string());
            }
        }
        indexer
    }

    /// Distinct labels, in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of a single label.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| DatasetError::UnknownLabel(label.to_string()))
    }

    /// `index → label`, rebuilt from the label list on every call.
    pub fn index_to_label_map(&self) -> BTreeMap<usize, String> {
        self.labels.iter().cloned().enumerate().collect()
    }

    /// `label → index`; string keys and integer values so it serialises
    /// straight to a flat JSON object.
    pub fn label_to_index_map(&self) -> BTreeMap<String, usize> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect()
    }

    /// Map every label to its index. Fails on the first unknown label.
    pub fn to_indexes<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.index_of(l.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order_defines_indices() {
        let indexer = LabelIndexer::new(["b", "a", "b", "c", "a"]);
        assert_eq!(indexer.labels(), ["b", "a", "c"]);
        assert_eq!(indexer.index_of("c").unwrap(), 2);
    }

    #[test]
    fn index_to_label_map_matches_label_list() {
        let indexer = LabelIndexer::new(["label1", "label2"]);
        let expected = BTreeMap::from([(0, "label1".to_string()), (1, "label2".to_string())]);
        assert_eq!(indexer.index_to_label_map(), expected);
    }

    #[test]
    fn maps_are_mutual_inverses() {
        let indexer = LabelIndexer::new(["php", "rust", "go", "rust"]);
        let to_index = indexer.label_to_index_map();
        let to_label = indexer.index_to_label_map();
        for label in indexer.labels() {
            assert_eq!(&to_label[&to_index[label]], label);
        }
        for (index, label) in &to_label {
            assert_eq!(to_index[label], *index);
        }
    }

    #[test]
    fn to_indexes_of_label_list_is_identity() {
        let indexer = LabelIndexer::new(["label1", "label2", "label3"]);
        let indexes = indexer.to_indexes(indexer.labels()).unwrap();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let indexer = LabelIndexer::new(["label1"]);
        match indexer.to_indexes(&["label1", "missing"]) {
            Err(DatasetError::UnknownLabel(label)) => assert_eq!(label, "missing"),
            other => panic!("expected UnknownLabel, got {other:?}"),
        }
    }

    #[test]
    fn label_to_index_serialises_flat() {
        let indexer = LabelIndexer::new(["php", "ruby-on-rails"]);
        let json = serde_json::to_string(&indexer.label_to_index_map()).unwrap();
        assert_eq!(json, r#"{"php":0,"ruby-on-rails":1}"#);
    }
}
