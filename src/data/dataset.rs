use std::fmt;
use std::path::Path;

use super::filter::retain_frequent_labels;
use super::labels::LabelIndexer;
use super::loader::{FileSource, TabularSource};
use super::model::{Batch, Record};
use super::partition::{BatchCursor, DatasetPartitioner, Split};
use crate::embed::Embedder;
use crate::error::{DatasetError, Result};

// ---------------------------------------------------------------------------
// FilteredLocalDataset
// ---------------------------------------------------------------------------

/// Records loaded from a tabular source with rare labels filtered out,
/// served as cyclic train/test minibatches.
///
/// The first `num_train_samples()` filtered rows form the train partition,
/// the rest the test partition. Each partition is read in fixed slices of
/// `batch_size` rows; rows past the last complete batch are never served.
pub struct FilteredLocalDataset<E> {
    records: Vec<Record>,
    labels: LabelIndexer,
    batch_size: usize,
    train_ratio: f64,
    min_samples_per_label: usize,
    preprocess_text: E,
    train_cursor: BatchCursor,
    test_cursor: BatchCursor,
}

impl<E: Embedder> FilteredLocalDataset<E> {
    /// Load `path` (see [`load_file`](super::loader::load_file)) and build
    /// the dataset from it.
    pub fn new(
        path: impl AsRef<Path>,
        batch_size: usize,
        train_ratio: f64,
        min_samples_per_label: usize,
        preprocess_text: E,
    ) -> Result<Self> {
        Self::from_source(
            &FileSource::new(path.as_ref()),
            batch_size,
            train_ratio,
            min_samples_per_label,
            preprocess_text,
        )
    }

    /// Build the dataset from any tabular source.
    ///
    /// Fails with [`DatasetError::Configuration`] when the filtered records
    /// do not fill at least one train batch.
    pub fn from_source<S: TabularSource + ?Sized>(
        source: &S,
        batch_size: usize,
        train_ratio: f64,
        min_samples_per_label: usize,
        preprocess_text: E,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(DatasetError::configuration("batch_size must be positive"));
        }
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(DatasetError::configuration(format!(
                "train_ratio must lie in (0, 1), got {train_ratio}"
            )));
        }

        let loaded = source.load()?;
        let loaded_len = loaded.len();
        let records = retain_frequent_labels(loaded, min_samples_per_label);
        let labels = LabelIndexer::new(records.iter().map(|r| r.tag_name.as_str()));

        let mut dataset = FilteredLocalDataset {
            records,
            labels,
            batch_size,
            train_ratio,
            min_samples_per_label,
            preprocess_text,
            train_cursor: BatchCursor::new(0),
            test_cursor: BatchCursor::new(0),
        };

        if dataset.num_train_batches() < 1 {
            return Err(DatasetError::configuration(format!(
                "{} train samples ({} of {} rows kept with min_samples_per_label = {}) \
                 cannot fill a batch of {}",
                dataset.num_train_samples(),
                dataset.total_samples(),
                loaded_len,
                min_samples_per_label,
                batch_size
            )));
        }

        dataset.train_cursor = BatchCursor::new(dataset.num_train_batches());
        dataset.test_cursor = BatchCursor::new(dataset.num_test_batches());
        log::info!("{dataset}");
        Ok(dataset)
    }

    /// Filtered records, in load order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn min_samples_per_label(&self) -> usize {
        self.min_samples_per_label
    }

    /// Length of the feature vectors produced for this dataset. Embedders
    /// that do not report a dimension fall back to embedding the first title.
    pub fn input_dim(&self) -> usize {
        self.preprocess_text.dim().unwrap_or_else(|| {
            self.records
                .first()
                .map_or(0, |r| self.preprocess_text.embed(&r.title).len())
        })
    }

    /// The preprocessing function batches are built with.
    pub fn preprocess_text(&self) -> &E {
        &self.preprocess_text
    }

    /// Cursor state of a partition.
    pub fn cursor(&self, split: Split) -> BatchCursor {
        match split {
            Split::Train => self.train_cursor,
            Split::Test => self.test_cursor,
        }
    }

    /// Next train batch; the train cursor wraps after `num_train_batches()`.
    pub fn get_train_batch(&mut self) -> Result<Batch> {
        self.next_batch(Split::Train)
    }

    /// Next test batch; the test cursor wraps after `num_test_batches()`.
    pub fn get_test_batch(&mut self) -> Result<Batch> {
        self.next_batch(Split::Test)
    }

    /// Endless train batches. Stop pulling after `num_train_batches()` for
    /// one epoch.
    pub fn get_train_sequence(&mut self) -> BatchSequence<'_, E> {
        BatchSequence {
            dataset: self,
            split: Split::Train,
        }
    }

    /// Endless test batches. Stop pulling after `num_test_batches()` for
    /// one pass.
    pub fn get_test_sequence(&mut self) -> BatchSequence<'_, E> {
        BatchSequence {
            dataset: self,
            split: Split::Test,
        }
    }

    /// The batch at `position` of a partition, without moving any cursor.
    pub fn batch_at(&self, split: Split, position: usize) -> Result<Batch> {
        let (start, batches) = match split {
            Split::Train => (0, self.num_train_batches()),
            Split::Test => (self.num_train_samples(), self.num_test_batches()),
        };
        if position >= batches {
            return Err(DatasetError::EmptyPartition(split.name()));
        }

        let offset = start + position * self.batch_size;
        let rows = &self.records[offset..offset + self.batch_size];

        let mut inputs = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        for row in rows {
            inputs.push(self.preprocess_text.embed(&row.title));
            labels.push(self.one_hot(&row.tag_name)?);
        }
        Ok(Batch { inputs, labels })
    }

    fn next_batch(&mut self, split: Split) -> Result<Batch> {
        let cursor = match split {
            Split::Train => &mut self.train_cursor,
            Split::Test => &mut self.test_cursor,
        };
        let position = cursor
            .advance()
            .ok_or(DatasetError::EmptyPartition(split.name()))?;
        self.batch_at(split, position)
    }

    fn one_hot(&self, label: &str) -> Result<Vec<f32>> {
        let mut row = vec![0.0; self.labels.len()];
        row[self.labels.index_of(label)?] = 1.0;
        Ok(row)
    }
}

impl<E> DatasetPartitioner for FilteredLocalDataset<E> {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn train_ratio(&self) -> f64 {
        self.train_ratio
    }

    fn total_samples(&self) -> usize {
        self.records.len()
    }

    fn label_list(&self) -> &[String] {
        self.labels.labels()
    }
}

impl<E> fmt::Display for FilteredLocalDataset<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilteredLocalDataset: {} samples, {} labels, batch size {}, \
             {} train batches ({} samples), {} test batches ({} samples)",
            self.total_samples(),
            self.num_labels(),
            self.batch_size,
            self.num_train_batches(),
            self.num_train_samples(),
            self.num_test_batches(),
            self.num_test_samples()
        )
    }
}

// ---------------------------------------------------------------------------
// BatchSequence – lazy, endless batch stream over one partition
// ---------------------------------------------------------------------------

/// Repeatedly draws batches from one partition of a dataset.
///
/// Never ends on its own unless the partition holds no complete batch.
pub struct BatchSequence<'a, E> {
    dataset: &'a mut FilteredLocalDataset<E>,
    split: Split,
}

impl<E: Embedder> BatchSequence<'_, E> {
    /// Batches in one full pass over the partition.
    pub fn batches_per_epoch(&self) -> usize {
        self.dataset.cursor(self.split).modulus()
    }

    /// Rewind the partition cursor to its first batch.
    pub fn restart(&mut self) {
        match self.split {
            Split::Train => self.dataset.train_cursor.reset(),
            Split::Test => self.dataset.test_cursor.reset(),
        }
    }
}

impl<E: Embedder> Iterator for BatchSequence<'_, E> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batches_per_epoch() == 0 {
            return None;
        }
        Some(self.dataset.next_batch(self.split))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feature vector = `[title length]`.
    fn title_len(title: &str) -> Vec<f32> {
        vec![title.len() as f32]
    }

    fn records(tags: &[&str]) -> Vec<Record> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| Record::tagged(*tag, format!("title_{i}")))
            .collect()
    }

    fn six_rows() -> Vec<Record> {
        records(&["tag_a", "tag_a", "tag_b", "tag_b", "tag_c", "tag_c"])
    }

    #[test]
    fn counts_all_samples_above_threshold() {
        let dataset = FilteredLocalDataset::from_source(&six_rows(), 2, 0.6, 1, title_len).unwrap();
        assert_eq!(dataset.total_samples(), 6);
        assert_eq!(dataset.num_train_samples(), 3);
        assert_eq!(dataset.num_train_batches(), 1);
        assert_eq!(dataset.num_test_batches(), 1);
        assert_eq!(dataset.label_list(), ["tag_a", "tag_b", "tag_c"]);
    }

    #[test]
    fn threshold_met_exactly_keeps_all_rows() {
        let dataset = FilteredLocalDataset::from_source(&six_rows(), 2, 0.6, 2, title_len).unwrap();
        assert_eq!(dataset.total_samples(), 6);
    }

    #[test]
    fn threshold_above_every_label_fails() {
        let result = FilteredLocalDataset::from_source(&six_rows(), 2, 0.6, 3, title_len);
        assert!(matches!(result, Err(DatasetError::Configuration(_))));
    }

    #[test]
    fn too_few_train_samples_for_batch_fails() {
        let tags = vec!["tag"; 14];
        let result = FilteredLocalDataset::from_source(&records(&tags), 20, 0.7, 1, title_len);
        assert!(matches!(result, Err(DatasetError::Configuration(_))));
    }

    #[test]
    fn invalid_arguments_fail() {
        for (batch_size, ratio) in [(0, 0.5), (1, 0.0), (1, 1.0), (1, f64::NAN)] {
            let result =
                FilteredLocalDataset::from_source(&six_rows(), batch_size, ratio, 1, title_len);
            assert!(matches!(result, Err(DatasetError::Configuration(_))));
        }
    }

    #[test]
    fn rare_labels_leave_label_list() {
        let rows = records(&["a", "rare", "b", "a", "b", "a", "b", "a"]);
        let dataset = FilteredLocalDataset::from_source(&rows, 1, 0.5, 2, title_len).unwrap();
        assert_eq!(dataset.total_samples(), 7);
        assert_eq!(dataset.label_list(), ["a", "b"]);
        assert_eq!(dataset.get_label_to_index_map()["b"], 1);
    }

    #[test]
    fn train_batch_has_expected_shape() {
        let mut dataset =
            FilteredLocalDataset::from_source(&six_rows(), 2, 0.6, 1, title_len).unwrap();
        let batch = dataset.get_train_batch().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.label_shape(), (2, 3));
        assert_eq!(batch.label_indexes(), vec![0, 0]);
    }

    #[test]
    fn test_batch_reads_after_train_partition() {
        let mut dataset =
            FilteredLocalDataset::from_source(&six_rows(), 2, 0.6, 1, title_len).unwrap();
        let batch = dataset.get_test_batch().unwrap();
        assert_eq!(batch.len(), 2);
        // rows 3 and 4: tag_b, tag_c
        assert_eq!(batch.label_indexes(), vec![1, 2]);
    }

    #[test]
    fn train_cursor_wraps_to_first_batch() {
        // 8 rows at 0.75 → 6 train rows → 3 batches of 2
        let rows = records(&["a", "b", "c", "a", "b", "c", "a", "b"]);
        let mut dataset = FilteredLocalDataset::from_source(&rows, 2, 0.75, 1, title_len).unwrap();
        assert_eq!(dataset.num_train_batches(), 3);

        let first = dataset.get_train_batch().unwrap();
        for _ in 0..5 {
            dataset.get_train_batch().unwrap();
        }
        assert_eq!(dataset.cursor(Split::Train).position(), 0);

        let again = dataset.get_train_batch().unwrap();
        assert_eq!(again.label_indexes(), first.label_indexes());
        assert_eq!(again, first);
    }

    #[test]
    fn cursors_are_independent() {
        let rows = records(&["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"]);
        let mut dataset = FilteredLocalDataset::from_source(&rows, 1, 0.8, 1, title_len).unwrap();
        dataset.get_train_batch().unwrap();
        dataset.get_train_batch().unwrap();
        dataset.get_test_batch().unwrap();

        assert_eq!(dataset.cursor(Split::Train).position(), 2);
        assert_eq!(dataset.cursor(Split::Test).position(), 1);
    }

    #[test]
    fn remainder_rows_are_never_served() {
        // 9 train rows, batches of 2 → row 8 is unreachable
        let rows = records(&["a"; 10]);
        let row_number = |title: &str| vec![title["title_".len()..].parse::<f32>().unwrap()];
        let mut dataset = FilteredLocalDataset::from_source(&rows, 2, 0.9, 1, row_number).unwrap();
        assert_eq!(dataset.num_train_batches(), 4);

        let served: Vec<Vec<f32>> = dataset
            .get_train_sequence()
            .take(8)
            .flat_map(|b| b.unwrap().inputs)
            .collect();
        assert_eq!(served.len(), 16);
        assert!(served.contains(&vec![7.0]));
        assert!(!served.contains(&vec![8.0]));
    }

    #[test]
    fn empty_test_partition() {
        let rows = records(&["a", "b", "a", "b", "a"]);
        // 4 train rows, 1 test row, batches of 2 → no test batch
        let mut dataset = FilteredLocalDataset::from_source(&rows, 2, 0.8, 1, title_len).unwrap();
        assert_eq!(dataset.num_test_batches(), 0);
        assert!(matches!(
            dataset.get_test_batch(),
            Err(DatasetError::EmptyPartition("test"))
        ));
        assert!(dataset.get_test_sequence().next().is_none());
    }

    #[test]
    fn sequence_is_restartable() {
        let rows = records(&["a", "b", "a", "b", "a", "b", "a", "b", "a", "b"]);
        let mut dataset = FilteredLocalDataset::from_source(&rows, 2, 0.8, 1, title_len).unwrap();
        let mut sequence = dataset.get_train_sequence();
        assert_eq!(sequence.batches_per_epoch(), 4);

        let first = sequence.next().unwrap().unwrap();
        sequence.next().unwrap().unwrap();
        sequence.restart();
        assert_eq!(sequence.next().unwrap().unwrap(), first);
    }

    #[test]
    fn preprocessing_builds_inputs() {
        let rows = vec![
            Record::tagged("x", "ab"),
            Record::tagged("x", "abcd"),
            Record::tagged("x", "abcdef"),
        ];
        let dataset = FilteredLocalDataset::from_source(&rows, 1, 0.5, 1, title_len).unwrap();
        let batch = dataset.batch_at(Split::Train, 0).unwrap();
        assert_eq!(batch.inputs, vec![vec![2.0]]);
        assert_eq!(dataset.input_dim(), 1);
        assert!(dataset.batch_at(Split::Train, 1).is_err());
    }

    #[test]
    fn input_dim_comes_from_embedder() {
        let embedder = crate::embed::HashingEmbedder::new(16);
        let dataset = FilteredLocalDataset::from_source(&six_rows(), 1, 0.5, 1, embedder).unwrap();
        assert_eq!(dataset.input_dim(), 16);
        assert_eq!(dataset.batch_at(Split::Train, 0).unwrap().inputs[0].len(), 16);
    }

    #[test]
    fn missing_file_is_a_source_error() {
        let result = FilteredLocalDataset::new("does/not/exist.csv", 1, 0.8, 1, title_len);
        assert!(matches!(result, Err(DatasetError::SourceLoad(_))));
    }
}
