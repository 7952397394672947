//! Configuration types for resolved CLI arguments.
//!
//! Args structs (for CLI parsing) stay next to their subcommand; the shared
//! model selection resolves here.

use crate::cli::{ModelArgs, ModelSource};
use eyre::{Result, WrapErr};
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use std::path::PathBuf;
use whisper_finetune::processor::WhisperProcessor;
use whisper_finetune::tokenizer::{Language, Task};
use whisper_finetune::types::ModelRepo;

/// Resolved model configuration.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub model_id: String,
    pub repo: ModelRepo,
    pub language: Language,
    pub task: Task,
}

impl ModelConfig {
    /// Load the feature extractor and tokenizer for this model.
    pub fn load_processor(&self) -> Result<WhisperProcessor> {
        WhisperProcessor::from_repo(&self.repo, self.language, self.task)
            .wrap_err_with(|| format!("failed to load processor for {}", self.model_id))
    }
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let language: Language = args.language.parse()?;

        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model_id);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    ModelRepo::Api(Api::new()?.model(args.model_id.clone()))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(&args.model_id)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model_id.clone())),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model_id.clone())),
        };

        Ok(Self {
            model_id: args.model_id,
            repo,
            language,
            task: args.task,
        })
    }
}
