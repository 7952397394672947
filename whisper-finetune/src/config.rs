//! Fine-tuning configuration handed to the external trainer.

use crate::error::{ConfigError, Result};
use crate::tokenizer::{Language, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metric the evaluation hook reports.
pub const WER_METRIC: &str = "wer";

/// When the trainer runs evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStrategy {
    No,
    #[default]
    Steps,
    Epoch,
}

/// Sequence-to-sequence training arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingArgs {
    pub output_dir: PathBuf,
    pub per_device_train_batch_size: usize,
    pub gradient_accumulation_steps: usize,
    pub learning_rate: f64,
    pub warmup_steps: usize,
    pub max_steps: usize,
    pub gradient_checkpointing: bool,
    pub fp16: bool,
    pub evaluation_strategy: EvaluationStrategy,
    pub per_device_eval_batch_size: usize,
    pub predict_with_generate: bool,
    pub generation_max_length: usize,
    pub save_steps: usize,
    pub eval_steps: usize,
    pub logging_steps: usize,
    pub report_to: Vec<String>,
    pub load_best_model_at_end: bool,
    pub metric_for_best_model: String,
    pub greater_is_better: bool,
    pub push_to_hub: bool,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./whisper-small-hi"),
            per_device_train_batch_size: 16,
            gradient_accumulation_steps: 1,
            learning_rate: 1e-5,
            warmup_steps: 500,
            max_steps: 4000,
            gradient_checkpointing: true,
            fp16: true,
            evaluation_strategy: EvaluationStrategy::Steps,
            per_device_eval_batch_size: 8,
            predict_with_generate: true,
            generation_max_length: 225,
            save_steps: 1000,
            eval_steps: 1000,
            logging_steps: 25,
            report_to: vec!["tensorboard".to_string()],
            load_best_model_at_end: true,
            metric_for_best_model: WER_METRIC.to_string(),
            greater_is_better: false,
            push_to_hub: true,
        }
    }
}

impl TrainingArgs {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("per_device_train_batch_size", self.per_device_train_batch_size),
            ("per_device_eval_batch_size", self.per_device_eval_batch_size),
            ("gradient_accumulation_steps", self.gradient_accumulation_steps),
            ("max_steps", self.max_steps),
            ("generation_max_length", self.generation_max_length),
            ("save_steps", self.save_steps),
            ("eval_steps", self.eval_steps),
            ("logging_steps", self.logging_steps),
        ];

        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NonPositive { field }.into());
        }

        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "learning_rate",
            }
            .into());
        }

        if self.metric_for_best_model != WER_METRIC {
            return Err(ConfigError::UnsupportedMetric(self.metric_for_best_model.clone()).into());
        }

        if self.load_best_model_at_end
            && self.evaluation_strategy == EvaluationStrategy::Steps
            && self.save_steps % self.eval_steps != 0
        {
            return Err(ConfigError::MisalignedSaveSteps {
                save_steps: self.save_steps,
                eval_steps: self.eval_steps,
            }
            .into());
        }

        Ok(())
    }
}

/// Top-level fine-tuning configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinetuneConfig {
    /// Pretrained checkpoint identifier
    pub model_id: String,
    /// Whisper language name or code
    pub language: String,
    pub task: Task,
    pub training: TrainingArgs,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            model_id: "openai/whisper-small".to_string(),
            language: "Hindi".to_string(),
            task: Task::Transcribe,
            training: TrainingArgs::default(),
        }
    }
}

impl FinetuneConfig {
    /// Load and validate a JSON config; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Self = serde_json::from_str(&text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.language()?;
        self.training.validate()
    }

    /// Parse the configured language.
    pub fn language(&self) -> Result<Language> {
        Ok(self.language.parse()?)
    }
}
