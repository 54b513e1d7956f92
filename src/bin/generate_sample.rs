use std::sync::Arc;

use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use title_tagger::Record;

/// Tag, tag id, number of posts, and words titles are built from.
const TAGS: &[(&str, i64, usize, &[&str])] = &[
    ("rust", 1, 40, &["borrow", "lifetime", "trait", "cargo", "ownership", "async", "macro"]),
    ("python", 2, 40, &["pandas", "list", "dict", "pip", "decorator", "virtualenv", "numpy"]),
    ("javascript", 3, 30, &["promise", "npm", "dom", "closure", "react", "callback", "json"]),
    ("sql", 4, 25, &["join", "index", "query", "table", "postgres", "transaction", "select"]),
    // below the default min_samples_per_label, filtered out at training time
    ("cobol", 5, 4, &["copybook", "mainframe", "picture", "paragraph"]),
];

const OPENERS: &[&str] = &["How to", "Why does", "Cannot", "Best way to", "Error when"];
const VERBS: &[&str] = &["use", "fix", "convert", "combine", "debug", "return"];

fn make_title(rng: &mut StdRng, words: &[&str]) -> String {
    let opener = OPENERS.choose(rng).copied().unwrap_or("How to");
    let verb = VERBS.choose(rng).copied().unwrap_or("use");
    let picked: Vec<&str> = words.choose_multiple(rng, 2).copied().collect();
    format!("{opener} {verb} {} with {}?", picked[0], picked[1])
}

fn main() {
    let mut rng = StdRng::seed_from_u64(42);

    let mut records = Vec::new();
    for &(tag, tag_id, count, words) in TAGS {
        for _ in 0..count {
            records.push(Record {
                post_id: String::new(),
                tag_name: tag.to_string(),
                tag_id,
                tag_position: rng.gen_range(0..3),
                title: make_title(&mut rng, words),
            });
        }
    }
    // Interleave tags so both partitions see every frequent label
    records.shuffle(&mut rng);
    for (i, record) in records.iter_mut().enumerate() {
        record.post_id = format!("id_{i}");
    }

    // Write CSV
    let csv_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    for record in &records {
        writer.serialize(record).expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");

    // Build Arrow arrays
    let post_id = StringArray::from_iter_values(records.iter().map(|r| r.post_id.as_str()));
    let tag_name = StringArray::from_iter_values(records.iter().map(|r| r.tag_name.as_str()));
    let tag_id = Int64Array::from_iter_values(records.iter().map(|r| r.tag_id));
    let tag_position = Int64Array::from_iter_values(records.iter().map(|r| r.tag_position));
    let title = StringArray::from_iter_values(records.iter().map(|r| r.title.as_str()));

    let schema = Arc::new(Schema::new(vec![
        Field::new("post_id", DataType::Utf8, false),
        Field::new("tag_name", DataType::Utf8, false),
        Field::new("tag_id", DataType::Int64, false),
        Field::new("tag_position", DataType::Int64, false),
        Field::new("title", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(post_id),
            Arc::new(tag_name),
            Arc::new(tag_id),
            Arc::new(tag_position),
            Arc::new(title),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let parquet_path = "sample_data.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} titles across {} tags to {csv_path} and {parquet_path}",
        records.len(),
        TAGS.len()
    );
}
