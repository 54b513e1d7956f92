use std::collections::BTreeMap;

use super::model::Record;

// ---------------------------------------------------------------------------
// Label frequency filter
// ---------------------------------------------------------------------------

/// Number of records carrying each label.
pub type LabelCounts = BTreeMap<String, usize>;

/// Count how many records carry each `tag_name`.
pub fn label_counts(records: &[Record]) -> LabelCounts {
    let mut counts = LabelCounts::new();
    for record in records {
        *counts.entry(record.tag_name.clone()).or_default() += 1;
    }
    counts
}

/// Keep only the records whose label occurs at least `min_samples_per_label`
/// times. Relative order of the surviving records is preserved.
///
/// Rare labels are dropped silently; they are treated as noise rather
/// than as an error.
pub fn retain_frequent_labels(records: Vec<Record>, min_samples_per_label: usize) -> Vec<Record> {
    let counts = label_counts(&records);

    let dropped: Vec<&String> = counts
        .iter()
        .filter(|(_, n)| **n < min_samples_per_label)
        .map(|(label, _)| label)
        .collect();
    if !dropped.is_empty() {
        log::debug!(
            "Dropping {} label(s) with fewer than {} samples: {:?}",
            dropped.len(),
            min_samples_per_label,
            dropped
        );
    }

    records
        .into_iter()
        .filter(|r| counts[&r.tag_name] >= min_samples_per_label)
        .collect()
}

/// Keep only the rows that carry a post's primary tag (`tag_position == 0`).
///
/// Posts are stored once per tag; without this a title shows up under
/// every label it was tagged with.
pub fn retain_primary_tags(records: Vec<Record>) -> Vec<Record> {
    let before = records.len();
    let primary: Vec<Record> = records.into_iter().filter(|r| r.tag_position == 0).collect();
    log::debug!("Kept {} of {before} rows carrying a primary tag", primary.len());
    primary
}
