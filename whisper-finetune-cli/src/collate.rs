//! Collate subcommand - dry-run batch collation over prepared samples.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use eyre::{Result, WrapErr, ensure};
use std::path::PathBuf;
use whisper_finetune::collate::DataCollatorSpeechSeq2SeqWithPadding;
use whisper_finetune::dataset::read_jsonl;
use whisper_finetune::types::IGNORE_INDEX;

/// CLI arguments for collation.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Prepared samples written by `wft prepare`
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Resolved configuration for collation.
#[derive(Debug)]
pub struct Config {
    pub input: PathBuf,
    pub batch_size: usize,
    pub model: ModelConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        ensure!(args.batch_size > 0, "--batch-size must be positive");

        Ok(Self {
            input: args.input,
            batch_size: args.batch_size,
            model: args.model.try_into()?,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let samples = read_jsonl(&config.input)
        .wrap_err_with(|| format!("failed to read {:?}", config.input.display()))?;
    ensure!(!samples.is_empty(), "no prepared samples in {:?}", config.input.display());

    let processor = config.model.load_processor()?;
    let collator =
        DataCollatorSpeechSeq2SeqWithPadding::new(&processor.feature_extractor, &processor.tokenizer);

    for (i, chunk) in samples.chunks(config.batch_size).enumerate() {
        let batch = collator.collate(chunk)?;
        let masked = batch.labels.iter().filter(|&&id| id == IGNORE_INDEX).count();

        println!(
            "batch {i}: input_features {:?}, labels {:?}, masked labels {masked}",
            batch.input_features.input_features.shape(),
            batch.labels.shape(),
        );
    }

    Ok(())
}
