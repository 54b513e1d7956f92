use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Hyperparameters of one training run.
///
/// Fields missing from a config file take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Samples per minibatch.
    pub batch_size: usize,
    /// Full passes over the train partition.
    pub epochs: usize,
    /// Width of the hidden dense layer.
    pub dense_dim: usize,
    /// Labels with fewer records are dropped before splitting.
    pub min_samples_per_label: usize,
    /// 0 = quiet, 1 or more = per-epoch progress at info level.
    pub verbose: u8,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            epochs: 1,
            dense_dim: 64,
            min_samples_per_label: 10,
            verbose: 1,
        }
    }
}

impl TrainConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: TrainConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("epochs", self.epochs),
            ("dense_dim", self.dense_dim),
        ] {
            if value == 0 {
                return Err(DatasetError::configuration(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}
