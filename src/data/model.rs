use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Record – one row of the tabular source
// ---------------------------------------------------------------------------

/// A single tagged post title (one row of the source table).
///
/// Only `tag_name` and `title` are required; the bookkeeping columns
/// default when a source omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "text_or_integer")]
    pub post_id: String,
    pub tag_name: String,
    #[serde(default)]
    pub tag_id: i64,
    #[serde(default)]
    pub tag_position: i64,
    pub title: String,
}

impl Record {
    /// Build a record carrying just a label and a title.
    pub fn tagged(tag_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            post_id: String::new(),
            tag_name: tag_name.into(),
            tag_id: 0,
            tag_position: 0,
            title: title.into(),
        }
    }
}

/// Accept an id written either as a string or as an integer.
fn text_or_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Integer(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Integer(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Batch – model inputs paired with one-hot labels
// ---------------------------------------------------------------------------

/// A minibatch: one feature vector and one one-hot label row per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Feature vectors, `len() == batch_size`.
    pub inputs: Vec<Vec<f32>>,
    /// One-hot rows, shape `(batch_size, num_labels)`.
    pub labels: Vec<Vec<f32>>,
}

impl Batch {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// `(rows, classes)` of the label matrix.
    pub fn label_shape(&self) -> (usize, usize) {
        (self.labels.len(), self.labels.first().map_or(0, Vec::len))
    }

    /// Class index of every one-hot row.
    pub fn label_indexes(&self) -> Vec<usize> {
        self.labels.iter().map(|row| argmax(row)).collect()
    }
}

/// Index of the largest value; ties resolve to the first one.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best, best_v)
            }
        })
        .0
}
