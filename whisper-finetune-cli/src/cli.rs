//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;
use whisper_finetune::tokenizer::Task;

pub const DEFAULT_MODEL_ID: &str = "openai/whisper-small";
pub const DEFAULT_LANGUAGE: &str = "Hindi";

#[derive(Debug, Parser)]
#[command(name = "wft")]
#[command(about = "Prepare speech corpora and evaluate Whisper fine-tuning runs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Save processor files and training arguments to the output directory
    Init(crate::init::Args),

    /// Check that a transcript survives a tokenizer round-trip
    CheckTokenizer(crate::check::Args),

    /// Extract features and labels for corpus splits
    Prepare(crate::prepare::Args),

    /// Collate prepared samples into padded batches and report their shapes
    Collate(crate::collate::Args),

    /// Compute word error rate from generated and reference token ids
    Evaluate(crate::evaluate::Args),
}

/// Where to load processor files from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelSource {
    /// Local directory if it exists, otherwise HuggingFace API
    #[default]
    Auto,
    /// Local directory
    Path,
    /// HuggingFace cache only
    Cache,
    /// HuggingFace API
    Api,
}

/// Model and decoding-prefix selection shared by every subcommand.
#[derive(clap::Args, Clone, Debug)]
pub struct ModelArgs {
    /// Model identifier or local directory
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    #[arg(long, value_enum, default_value_t = ModelSource::Auto)]
    pub model_source: ModelSource,

    /// Transcript language, by name or code
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    #[arg(long, value_enum, default_value_t = Task::Transcribe)]
    pub task: Task,
}

/// Execute CLI command - separated for testing.
pub fn run_cli(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Init(args) => crate::init::execute(args.try_into()?),
        Commands::CheckTokenizer(args) => crate::check::execute(args.try_into()?),
        Commands::Prepare(args) => crate::prepare::execute(args.try_into()?),
        Commands::Collate(args) => crate::collate::execute(args.try_into()?),
        Commands::Evaluate(args) => crate::evaluate::execute(args.try_into()?),
    }
}
