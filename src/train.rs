use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::TrainConfig;
use crate::data::{DatasetPartitioner, FileSource, FilteredLocalDataset, TabularSource};
use crate::embed::{Embedder, HashingEmbedder};
use crate::model::{BatchStats, DenseClassifier, Hyperparameters, TrainableModel};

/// Share of the filtered records used for training.
pub const TRAIN_RATIO: f64 = 0.8;

/// Per-epoch metrics, written to `train_output.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainHistory {
    pub loss: Vec<f32>,
    pub accuracy: Vec<f32>,
    pub val_loss: Vec<f32>,
    pub val_accuracy: Vec<f32>,
}

/// Everything a finished run hands back to its caller.
#[derive(Debug)]
pub struct TrainOutcome<M> {
    /// Held-out accuracy after the last epoch.
    pub accuracy: f32,
    /// Folder the artefacts were written to.
    pub artefacts_path: PathBuf,
    pub history: TrainHistory,
    pub model: M,
    pub index_to_label: BTreeMap<usize, String>,
}

/// Train on the file at `dataset_path` with the default hashing embedder.
///
/// Artefacts land in `artefacts_root`, or in a `%Y-%m-%d-%H-%M-%S`
/// subfolder of it when `add_timestamp` is set. With `primary_tag_only`
/// only the `tag_position == 0` rows of the first `limit` rows are used.
pub fn train(
    dataset_path: &Path,
    config: &TrainConfig,
    artefacts_root: &Path,
    add_timestamp: bool,
    limit: Option<usize>,
    primary_tag_only: bool,
) -> Result<TrainOutcome<DenseClassifier>> {
    let source = FileSource::new(dataset_path)
        .with_limit(limit)
        .primary_tag_only(primary_tag_only);
    train_with(
        &source,
        config,
        artefacts_root,
        add_timestamp,
        HashingEmbedder::default(),
    )
}

/// Train a [`DenseClassifier`] on records from any source.
pub fn train_with<S, E>(
    source: &S,
    config: &TrainConfig,
    artefacts_root: &Path,
    add_timestamp: bool,
    embedder: E,
) -> Result<TrainOutcome<DenseClassifier>>
where
    S: TabularSource + ?Sized,
    E: Embedder,
{
    config.validate()?;
    let artefacts_path = artefacts_dir(artefacts_root, add_timestamp);

    let mut dataset = FilteredLocalDataset::from_source(
        source,
        config.batch_size,
        TRAIN_RATIO,
        config.min_samples_per_label,
        embedder,
    )?;

    let mut model = Hyperparameters::new(dataset.input_dim(), dataset.num_labels())
        .dense_dim(config.dense_dim)
        .build();

    let history = fit(&mut model, &mut dataset, config)?;
    let accuracy = evaluate(&model, &mut dataset)?.accuracy;
    log::info!("Test Accuracy: {:.2}", accuracy * 100.0);

    fs::create_dir_all(&artefacts_path)
        .with_context(|| format!("creating {}", artefacts_path.display()))?;
    write_json(&artefacts_path.join("params.json"), config)?;
    write_json(
        &artefacts_path.join("labels_index.json"),
        &dataset.get_label_to_index_map(),
    )?;
    write_json(&artefacts_path.join("train_output.json"), &history)?;
    log::info!("Artefacts written to {}", artefacts_path.display());

    Ok(TrainOutcome {
        accuracy,
        artefacts_path,
        history,
        model,
        index_to_label: dataset.get_index_to_label_map(),
    })
}

/// Run `config.epochs` epochs. One epoch is `num_train_batches()` train
/// batches followed by one pass over the test partition.
pub fn fit<M, E>(
    model: &mut M,
    dataset: &mut FilteredLocalDataset<E>,
    config: &TrainConfig,
) -> Result<TrainHistory>
where
    M: TrainableModel,
    E: Embedder,
{
    let level = if config.verbose > 0 {
        log::Level::Info
    } else {
        log::Level::Debug
    };
    let train_batches = dataset.num_train_batches();
    let mut history = TrainHistory::default();

    for epoch in 1..=config.epochs {
        let mut train_stats = Vec::with_capacity(train_batches);
        for batch in dataset.get_train_sequence().take(train_batches) {
            train_stats.push(model.train_batch(&batch?));
        }
        let train = mean(&train_stats);
        let val = evaluate(model, dataset)?;

        log::log!(
            level,
            "Epoch {epoch}/{}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4}",
            config.epochs,
            train.loss,
            train.accuracy,
            val.loss,
            val.accuracy
        );
        history.loss.push(train.loss);
        history.accuracy.push(train.accuracy);
        history.val_loss.push(val.loss);
        history.val_accuracy.push(val.accuracy);
    }
    Ok(history)
}

/// Mean stats over one pass of the test partition.
pub fn evaluate<M, E>(model: &M, dataset: &mut FilteredLocalDataset<E>) -> Result<BatchStats>
where
    M: TrainableModel,
    E: Embedder,
{
    let test_batches = dataset.num_test_batches();
    if test_batches == 0 {
        log::warn!("No complete test batch; held-out metrics are zero");
    }
    let mut stats = Vec::with_capacity(test_batches);
    for batch in dataset.get_test_sequence().take(test_batches) {
        stats.push(model.evaluate_batch(&batch?));
    }
    Ok(mean(&stats))
}

fn mean(stats: &[BatchStats]) -> BatchStats {
    if stats.is_empty() {
        return BatchStats::default();
    }
    let n = stats.len() as f32;
    BatchStats {
        loss: stats.iter().map(|s| s.loss).sum::<f32>() / n,
        accuracy: stats.iter().map(|s| s.accuracy).sum::<f32>() / n,
    }
}

fn artefacts_dir(root: &Path, add_timestamp: bool) -> PathBuf {
    if add_timestamp {
        root.join(chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string())
    } else {
        root.to_path_buf()
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))
}
