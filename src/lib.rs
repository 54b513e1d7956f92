//! Title → tag classification built around a filtered, cyclically batched
//! dataset.
//!
//! ```text
//!  tabular source ──▶ FilteredLocalDataset ──▶ (inputs, one-hot) ──▶ TrainableModel
//!                        │  label filter          ▲
//!                        │  label index           │ Embedder (title → Vec<f32>)
//!                        └  train/test split ─────┘
//! ```

pub mod config;
pub mod data;
pub mod embed;
pub mod error;
pub mod model;
pub mod predict;
pub mod train;

pub use config::TrainConfig;
pub use data::{DatasetPartitioner, FilteredLocalDataset, LabelIndexer, Record};
pub use embed::{Embedder, HashingEmbedder};
pub use error::{DatasetError, Result};
