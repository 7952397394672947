//! Check-tokenizer subcommand - tokenizer round-trip on a transcript.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use color_eyre::Section;
use eyre::{OptionExt, Result, eyre};
use std::path::PathBuf;
use whisper_finetune::dataset::Manifest;
use whisper_finetune::traits::TextTokenizer;

/// CLI arguments for the tokenizer round-trip check.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Corpus directory; the first transcript of `--split` is checked
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    #[arg(long, default_value = "train")]
    pub split: String,

    /// Check this text instead of a corpus transcript
    #[arg(long)]
    pub text: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Resolved configuration for the round-trip check.
#[derive(Debug)]
pub struct Config {
    pub text: String,
    pub model: ModelConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let text = match (args.text, args.corpus) {
            (Some(text), _) => text,
            (None, Some(corpus)) => Manifest::from_corpus(&corpus, &args.split)?
                .entries
                .into_iter()
                .next()
                .map(|entry| entry.sentence)
                .ok_or_eyre(format!("split {} has no transcripts", args.split))?,
            (None, None) => {
                return Err(eyre!("nothing to check").suggestion("pass --corpus or --text"));
            }
        };

        Ok(Self {
            text,
            model: args.model.try_into()?,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let processor = config.model.load_processor()?;
    let tokenizer = &processor.tokenizer;

    let ids = tokenizer.encode(&config.text)?;
    let with_special = tokenizer.decode(&ids, false)?;
    let without_special = tokenizer.decode(&ids, true)?;
    let matches = without_special == config.text;

    println!(
        "Prefix:                {} / {:?}",
        tokenizer.language(),
        tokenizer.task()
    );
    println!("Input:                 {}", config.text);
    println!("Decoded w/ special:    {with_special}");
    println!("Decoded w/out special: {without_special}");
    println!("Are equal:             {matches}");

    if !matches {
        return Err(eyre!("tokenizer round-trip changed the transcript")
            .with_note(|| format!("token ids: {ids:?}")));
    }

    Ok(())
}
