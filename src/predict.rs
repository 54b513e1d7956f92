use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::DatasetPartitioner;
use crate::embed::Embedder;
use crate::model::TrainableModel;

/// Number of labels returned when the caller does not ask for more.
pub const DEFAULT_TOP_K: usize = 1;

/// A trained model bundled with the embedder and label map it was trained
/// with. Built once, then only read, so it can be shared between callers.
pub struct TextPredictor<M, E> {
    model: M,
    embedder: E,
    index_to_label: BTreeMap<usize, String>,
}

impl<M: TrainableModel, E: Embedder> TextPredictor<M, E> {
    pub fn new(model: M, embedder: E, index_to_label: BTreeMap<usize, String>) -> Self {
        Self {
            model,
            embedder,
            index_to_label,
        }
    }

    /// Take the label map from the dataset the model was trained on.
    pub fn from_dataset<D: DatasetPartitioner>(model: M, embedder: E, dataset: &D) -> Self {
        Self::new(model, embedder, dataset.get_index_to_label_map())
    }

    /// Take the label map from the `labels_index.json` a training run wrote
    /// into `artefacts_path`.
    pub fn with_labels_from(model: M, embedder: E, artefacts_path: &Path) -> Result<Self> {
        let path = artefacts_path.join("labels_index.json");
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let label_to_index: BTreeMap<String, usize> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;

        let index_to_label = label_to_index
            .into_iter()
            .map(|(label, index)| (index, label))
            .collect();
        Ok(Self::new(model, embedder, index_to_label))
    }

    pub fn index_to_label(&self) -> &BTreeMap<usize, String> {
        &self.index_to_label
    }

    /// The `top_k` most likely labels for each text, best first.
    pub fn predict<S: AsRef<str>>(&self, texts: &[S], top_k: usize) -> Vec<Vec<String>> {
        texts
            .iter()
            .map(|text| self.predict_one(text.as_ref(), top_k))
            .collect()
    }

    fn predict_one(&self, text: &str, top_k: usize) -> Vec<String> {
        let scores = self.model.predict_scores(&self.embedder.embed(text));

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        ranked
            .into_iter()
            .filter_map(|(i, _)| self.index_to_label.get(&i).cloned())
            .take(top_k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Batch;
    use crate::model::BatchStats;

    /// Scores are the input vector itself.
    struct Echo;

    impl TrainableModel for Echo {
        fn train_batch(&mut self, _batch: &Batch) -> BatchStats {
            BatchStats::default()
        }
        fn evaluate_batch(&self, _batch: &Batch) -> BatchStats {
            BatchStats::default()
        }
        fn predict_scores(&self, input: &[f32]) -> Vec<f32> {
            input.to_vec()
        }
    }

    fn labels() -> BTreeMap<usize, String> {
        BTreeMap::from([(0, "php".to_string()), (1, "rust".to_string()), (2, "go".to_string())])
    }

    #[test]
    fn ranks_labels_by_score() {
        let embedder = |text: &str| -> Vec<f32> {
            match text {
                "ownership" => vec![0.1, 0.7, 0.2],
                _ => vec![0.6, 0.1, 0.3],
            }
        };
        let predictor = TextPredictor::new(Echo, embedder, labels());

        let predictions = predictor.predict(&["ownership", "arrays"], 2);
        assert_eq!(predictions[0], ["rust", "go"]);
        assert_eq!(predictions[1], ["php", "go"]);
    }

    #[test]
    fn default_top_k_is_single_label() {
        let predictor = TextPredictor::new(Echo, |_: &str| vec![0.0f32, 0.0, 1.0], labels());
        assert_eq!(predictor.predict(&["x"], DEFAULT_TOP_K), vec![vec!["go".to_string()]]);
    }

    #[test]
    fn top_k_larger_than_label_count() {
        let predictor = TextPredictor::new(Echo, |_: &str| vec![0.2f32, 0.3, 0.5], labels());
        assert_eq!(predictor.predict(&["x"], 10)[0].len(), 3);
    }

    #[test]
    fn labels_reload_from_artefacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("labels_index.json"),
            r#"{"go": 2, "php": 0, "rust": 1}"#,
        )
        .unwrap();

        let predictor =
            TextPredictor::with_labels_from(Echo, |_: &str| vec![0.1f32, 0.8, 0.1], dir.path())
                .unwrap();
        assert_eq!(predictor.index_to_label(), &labels());
        assert_eq!(predictor.predict(&["x"], DEFAULT_TOP_K), vec![vec!["rust".to_string()]]);
    }

    #[test]
    fn missing_labels_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TextPredictor::with_labels_from(Echo, |_: &str| vec![0.0f32], dir.path());
        assert!(result.is_err());
    }
}
