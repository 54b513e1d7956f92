use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use title_tagger::train::train;
use title_tagger::TrainConfig;

/// Train a title → tag classifier from a tabular dataset.
#[derive(Parser, Debug)]
#[command(name = "title-tagger", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model and write its artefacts
    Train {
        /// Dataset file (.csv, .tsv, .json or .parquet)
        dataset_path: PathBuf,
        /// JSON file with the training parameters
        config_path: PathBuf,
        /// Folder where training artefacts are written
        artefacts_path: PathBuf,
        /// Write artefacts to a timestamped subfolder
        #[arg(long)]
        add_timestamp: bool,
        /// Only load the first N rows of the dataset
        #[arg(long)]
        limit: Option<usize>,
        /// Skip rows whose tag is not the post's primary tag (tag_position != 0)
        #[arg(long)]
        primary_tag_only: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Train {
            dataset_path,
            config_path,
            artefacts_path,
            add_timestamp,
            limit,
            primary_tag_only,
        } => {
            let config = TrainConfig::load(&config_path)?;
            log::info!("Training model with parameters: {config:?}");

            let outcome = train(
                &dataset_path,
                &config,
                &artefacts_path,
                add_timestamp,
                limit,
                primary_tag_only,
            )?;
            println!(
                "Test accuracy {:.2}%, artefacts in {}",
                outcome.accuracy * 100.0,
                outcome.artefacts_path.display()
            );
        }
    }
    Ok(())
}
