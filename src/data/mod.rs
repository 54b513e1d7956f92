/// Data layer: records, loading, filtering, label indexing and batching.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Vec<Record>,
///   └──────────┘  optionally primary tags only
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop labels below min_samples_per_label
///   └──────────┘
///        │
///        ▼
///   ┌─────────────────────┐
///   │ FilteredLocalDataset │  label index + train/test split,
///   └─────────────────────┘  cyclic (inputs, one-hot) batches
/// ```

pub mod dataset;
pub mod filter;
pub mod labels;
pub mod loader;
pub mod model;
pub mod partition;

pub use dataset::{BatchSequence, FilteredLocalDataset};
pub use labels::LabelIndexer;
pub use loader::{load_file, FileSource, TabularSource};
pub use model::{Batch, Record};
pub use partition::{BatchCursor, DatasetPartitioner, Split};
