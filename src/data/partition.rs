use std::collections::BTreeMap;

use super::labels::LabelIndexer;
use crate::error::Result;

// ---------------------------------------------------------------------------
// DatasetPartitioner – train/test split arithmetic
// ---------------------------------------------------------------------------

/// Split arithmetic and label bookkeeping shared by every dataset.
///
/// Implementors supply the sample count and the ordered label list; the
/// provided methods derive everything else. All divisions truncate.
pub trait DatasetPartitioner {
    fn batch_size(&self) -> usize;

    /// Fraction of samples assigned to the train partition, in `(0, 1)`.
    fn train_ratio(&self) -> f64;

    fn total_samples(&self) -> usize;

    /// Distinct labels in index order. Must not change during the
    /// lifetime of the dataset.
    fn label_list(&self) -> &[String];

    fn num_train_samples(&self) -> usize {
        (self.total_samples() as f64 * self.train_ratio()).floor() as usize
    }

    fn num_train_batches(&self) -> usize {
        self.num_train_samples() / self.batch_size()
    }

    fn num_test_samples(&self) -> usize {
        self.total_samples() - self.num_train_samples()
    }

    fn num_test_batches(&self) -> usize {
        self.num_test_samples() / self.batch_size()
    }

    fn num_labels(&self) -> usize {
        self.label_list().len()
    }

    fn get_index_to_label_map(&self) -> BTreeMap<usize, String> {
        LabelIndexer::new(self.label_list()).index_to_label_map()
    }

    fn get_label_to_index_map(&self) -> BTreeMap<String, usize> {
        LabelIndexer::new(self.label_list()).label_to_index_map()
    }

    fn to_indexes<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>>
    where
        Self: Sized,
    {
        LabelIndexer::new(self.label_list()).to_indexes(labels)
    }
}

// ---------------------------------------------------------------------------
// Split / BatchCursor – cyclic batch positions
// ---------------------------------------------------------------------------

/// The two partitions of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Position of the next batch within a partition, wrapping at `modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCursor {
    position: usize,
    modulus: usize,
}

impl BatchCursor {
    pub fn new(modulus: usize) -> Self {
        Self {
            position: 0,
            modulus,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of batches in one pass.
    pub fn modulus(&self) -> usize {
        self.modulus
    }

    /// Return the current batch position and step to the next one.
    /// `None` when the partition holds no complete batch.
    pub fn advance(&mut self) -> Option<usize> {
        if self.modulus == 0 {
            return None;
        }
        let current = self.position;
        self.position = (self.position + 1) % self.modulus;
        Some(current)
    }

    /// Rewind to the first batch.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Partitioner with a fixed sample count and label list.
    struct Fixed {
        batch_size: usize,
        train_ratio: f64,
        total: usize,
        labels: Vec<String>,
    }

    impl Fixed {
        fn new(batch_size: usize, train_ratio: f64, total: usize) -> Self {
            Fixed {
                batch_size,
                train_ratio,
                total,
                labels: vec!["label1".into(), "label2".into()],
            }
        }
    }

    impl DatasetPartitioner for Fixed {
        fn batch_size(&self) -> usize {
            self.batch_size
        }
        fn train_ratio(&self) -> f64 {
            self.train_ratio
        }
        fn total_samples(&self) -> usize {
            self.total
        }
        fn label_list(&self) -> &[String] {
            &self.labels
        }
    }

    #[test]
    fn train_samples_follow_ratio() {
        assert_eq!(Fixed::new(20, 0.8, 100).num_train_samples(), 80);
    }

    #[test]
    fn batch_counts_truncate() {
        let base = Fixed::new(20, 0.8, 100);
        assert_eq!(base.num_train_batches(), 4);
        assert_eq!(base.num_test_samples(), 20);
        assert_eq!(base.num_test_batches(), 1);

        let small = Fixed::new(20, 0.7, 14);
        assert_eq!(small.num_train_samples(), 9);
        assert_eq!(small.num_train_batches(), 0);
    }

    #[test]
    fn label_maps_delegate_to_indexer() {
        let base = Fixed::new(20, 0.8, 100);
        assert_eq!(base.num_labels(), 2);
        assert_eq!(base.get_index_to_label_map()[&1], "label2");
        assert_eq!(base.get_label_to_index_map()["label1"], 0);
        assert_eq!(base.to_indexes(&["label1", "label2"]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn cursor_wraps_at_modulus() {
        let mut cursor = BatchCursor::new(3);
        let seen: Vec<usize> = (0..7).filter_map(|_| cursor.advance()).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);

        cursor.reset();
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn empty_cursor_yields_nothing() {
        assert_eq!(BatchCursor::new(0).advance(), None);
    }
}
