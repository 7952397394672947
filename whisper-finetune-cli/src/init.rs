//! Init subcommand - save processor files and training arguments.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use whisper_finetune::config::{FinetuneConfig, TrainingArgs};

pub const TRAINING_ARGS_FILE: &str = "training_args.json";

/// CLI arguments for initializing a fine-tuning output directory.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Fine-tuning config JSON; its model, language and task replace the model arguments
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory (default: `output_dir` of the training arguments)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Resolved configuration for initialization.
#[derive(Debug)]
pub struct Config {
    pub output: PathBuf,
    pub model: ModelConfig,
    pub training: TrainingArgs,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let (finetune, model) = match &args.config {
            Some(path) => {
                let finetune = FinetuneConfig::from_file(path)
                    .wrap_err_with(|| format!("failed to load config: {:?}", path.display()))?;
                let model = ModelArgs {
                    model_id: finetune.model_id.clone(),
                    language: finetune.language.clone(),
                    task: finetune.task,
                    ..args.model
                };
                (finetune, model)
            }
            None => (FinetuneConfig::default(), args.model),
        };

        let output = args
            .output
            .unwrap_or_else(|| finetune.training.output_dir.clone());

        let mut training = finetune.training;
        training.output_dir = output.clone();

        Ok(Self {
            output,
            model: model.try_into()?,
            training,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    tracing::info!(
        model = %config.model.model_id,
        language = %config.model.language,
        output = ?config.output.display(),
        "initializing output directory"
    );

    let processor = config.model.load_processor()?;
    processor.save_pretrained(&config.output)?;

    let path = config.output.join(TRAINING_ARGS_FILE);
    let json = serde_json::to_string_pretty(&config.training)?;
    std::fs::write(&path, json)
        .wrap_err_with(|| format!("failed to write training arguments: {:?}", path.display()))?;

    tracing::info!(path = ?path.display(), "wrote training arguments");
    Ok(())
}
