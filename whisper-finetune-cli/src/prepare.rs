//! Prepare subcommand - extract features and labels for corpus splits.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use eyre::{Result, WrapErr, ensure};
use std::path::PathBuf;
use std::time::Instant;
use whisper_finetune::dataset::{Manifest, prepare_split, write_jsonl};
use whisper_finetune::prepare::SamplePreparer;

/// CLI arguments for corpus preparation.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Corpus directory holding `<split>.tsv` and `clips/`
    #[arg(long)]
    pub corpus: PathBuf,

    /// Splits to prepare
    #[arg(long = "split", default_values = ["train", "test"])]
    pub splits: Vec<String>,

    /// Output directory (default: `<corpus>/prepared`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Resolved configuration for corpus preparation.
#[derive(Debug)]
pub struct Config {
    pub corpus: PathBuf,
    pub splits: Vec<String>,
    pub output: PathBuf,
    pub num_workers: usize,
    pub model: ModelConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        ensure!(args.num_workers > 0, "--num-workers must be positive");

        let output = args
            .output
            .unwrap_or_else(|| args.corpus.join("prepared"));

        Ok(Self {
            corpus: args.corpus,
            splits: args.splits,
            output,
            num_workers: args.num_workers,
            model: args.model.try_into()?,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let processor = config.model.load_processor()?;
    let preparer = SamplePreparer::new(&processor.feature_extractor, &processor.tokenizer);

    // Saved alongside the prepared data so training reloads the same processor
    processor.save_pretrained(&config.output)?;

    for split in &config.splits {
        let start = Instant::now();

        let manifest = Manifest::from_corpus(&config.corpus, split)
            .wrap_err_with(|| format!("failed to read split: {split}"))?;
        let prepared = prepare_split(preparer, &manifest, config.num_workers)
            .wrap_err_with(|| format!("failed to prepare split: {split}"))?;

        let path = config.output.join(format!("{split}.jsonl"));
        write_jsonl(&path, &prepared)?;

        tracing::info!(
            %split,
            samples = prepared.len(),
            path = ?path.display(),
            elapsed = ?start.elapsed(),
            "prepared split"
        );
    }

    Ok(())
}
