use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::filter::retain_primary_tags;
use super::model::Record;

/// Columns every tabular source must provide.
const REQUIRED_COLUMNS: [&str; 2] = ["tag_name", "title"];

// ---------------------------------------------------------------------------
// TabularSource – where records come from
// ---------------------------------------------------------------------------

/// Anything that can hand over the full set of records in one go.
pub trait TabularSource {
    fn load(&self) -> Result<Vec<Record>>;
}

/// Records read from a file on disk, optionally truncated to the first rows.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub limit: Option<usize>,
    /// Keep only `tag_position == 0` rows, applied after `limit`.
    pub primary_tag_only: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limit: None,
            primary_tag_only: false,
        }
    }

    /// Only load the first `limit` rows.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Only keep each post's primary tag.
    pub fn primary_tag_only(mut self, primary_tag_only: bool) -> Self {
        self.primary_tag_only = primary_tag_only;
        self
    }
}

impl TabularSource for FileSource {
    fn load(&self) -> Result<Vec<Record>> {
        let mut records = load_file(&self.path, self.limit)?;
        log::info!(
            "Loaded {} rows from {} (limit: {:?})",
            records.len(),
            self.path.display(),
            self.limit
        );
        if self.primary_tag_only {
            records = retain_primary_tags(records);
        }
        Ok(records)
    }
}

/// In-memory records, used for demos and tests.
impl TabularSource for Vec<Record> {
    fn load(&self) -> Result<Vec<Record>> {
        Ok(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma separated, header `post_id,tag_name,tag_id,tag_position,title`
/// * `.tsv`     – same columns, tab separated
/// * `.json`    – `[{ "tag_name": ..., "title": ..., ... }, ...]`
/// * `.parquet` – one column per field
///
/// With `limit = Some(n)` only the first `n` rows are returned.
pub fn load_file(path: &Path, limit: Option<usize>) -> Result<Vec<Record>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let limit = limit.unwrap_or(usize::MAX);
    match ext.as_str() {
        "csv" => load_delimited(path, b',', limit),
        "tsv" => load_delimited(path, b'\t', limit),
        "json" => load_json(path, limit),
        "parquet" | "pq" => load_parquet(path, limit),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV / TSV loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8, limit: usize) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = reader.headers().context("reading CSV headers")?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            bail!("{} is missing the '{column}' column", path.display());
        }
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<Record>().take(limit).enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')` layout.
fn load_json(path: &Path, limit: usize) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    rows.iter()
        .take(limit)
        .enumerate()
        .map(|(i, row)| {
            Record::deserialize(row).with_context(|| format!("Row {i} is not a valid record"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas or Polars.
///
/// `tag_name` and `title` must be string columns; `tag_id` and
/// `tag_position` may be Int32 or Int64; `post_id` may be a string or an
/// integer column.
fn load_parquet(path: &Path, limit: usize) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        if records.len() >= limit {
            break;
        }
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |name: &str| schema.index_of(name).ok().map(|i| batch.column(i));
        let tag_name = column("tag_name").context("Parquet file missing 'tag_name' column")?;
        let title = column("title").context("Parquet file missing 'title' column")?;
        let post_id = column("post_id");
        let tag_id = column("tag_id");
        let tag_position = column("tag_position");

        for row in 0..batch.num_rows() {
            if records.len() >= limit {
                break;
            }
            let record = Record {
                post_id: match post_id {
                    Some(col) => extract_text(col, row)
                        .with_context(|| format!("Row {row}: failed to read 'post_id'"))?,
                    None => String::new(),
                },
                tag_name: extract_text(tag_name, row)
                    .with_context(|| format!("Row {row}: failed to read 'tag_name'"))?,
                tag_id: match tag_id {
                    Some(col) => extract_int(col, row)
                        .with_context(|| format!("Row {row}: failed to read 'tag_id'"))?,
                    None => 0,
                },
                tag_position: match tag_position {
                    Some(col) => extract_int(col, row)
                        .with_context(|| format!("Row {row}: failed to read 'tag_position'"))?,
                    None => 0,
                },
                title: extract_text(title, row)
                    .with_context(|| format!("Row {row}: failed to read 'title'"))?,
            };
            records.push(record);
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

/// Read a cell of a string column; integer columns are rendered as text.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in text column");
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 | DataType::Int64 => Ok(extract_int(col, row)?.to_string()),
        other => bail!("Expected a string column, got {other:?}"),
    }
}

/// Read a cell of an Int32 / Int64 column.
fn extract_int(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null value in integer column");
    }
    match col.data_type() {
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(arr.value(row))
        }
        other => bail!("Expected an integer column, got {other:?}"),
    }
}
