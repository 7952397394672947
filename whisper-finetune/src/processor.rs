//! Feature extractor and tokenizer bundled per pretrained checkpoint.

use crate::error::Result;
use crate::feature_extractor::{WhisperFeatureConfig, WhisperFeatureExtractor};
use crate::tokenizer::{Language, Task, WhisperTokenizer};
use crate::types::ModelRepo;
use eyre::{Result as EyreResult, WrapErr};
use std::path::Path;

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";

/// Whisper processor: one feature extractor and one tokenizer.
pub struct WhisperProcessor {
    pub feature_extractor: WhisperFeatureExtractor,
    pub tokenizer: WhisperTokenizer,
}

impl WhisperProcessor {
    pub fn new(feature_extractor: WhisperFeatureExtractor, tokenizer: WhisperTokenizer) -> Self {
        Self {
            feature_extractor,
            tokenizer,
        }
    }

    /// Load processor files from a model repository.
    ///
    /// # Arguments
    ///
    /// * `repo` - Model repository (local path, HF cache, or HF API)
    /// * `language` - Language whose token is placed in the label prefix
    /// * `task` - Task whose token is placed in the label prefix
    pub fn from_repo(repo: &ModelRepo, language: Language, task: Task) -> EyreResult<Self> {
        let config_path = repo.resolve(PREPROCESSOR_CONFIG_FILE)?;
        let tokenizer_path = repo.resolve(TOKENIZER_FILE)?;

        let config = WhisperFeatureConfig::from_file(&config_path).wrap_err_with(|| {
            format!("failed to load feature extractor config from {config_path:?}")
        })?;

        let tokenizer = WhisperTokenizer::from_file(&tokenizer_path, language, task)
            .wrap_err_with(|| format!("failed to load tokenizer from {tokenizer_path:?}"))?;

        tracing::debug!(
            language = %language,
            ?task,
            vocab_size = tokenizer.vocab_size(),
            "loaded processor"
        );

        Ok(Self::new(WhisperFeatureExtractor::new(config)?, tokenizer))
    }

    /// Write `tokenizer.json` and `preprocessor_config.json` into `dir`.
    pub fn save_pretrained(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        self.tokenizer.save(dir.join(TOKENIZER_FILE))?;

        let config = serde_json::to_string_pretty(self.feature_extractor.config())?;
        std::fs::write(dir.join(PREPROCESSOR_CONFIG_FILE), config)?;

        tracing::info!(
            dir = ?dir.display(),
            language = %self.tokenizer.language(),
            task = ?self.tokenizer.task(),
            "saved processor"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tests::FIXTURE;
    use crate::traits::TextTokenizer;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).ok();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn saves_and_reloads_from_path_repo() {
        let language: Language = "hi".parse().unwrap();
        let tokenizer = WhisperTokenizer::from_file(FIXTURE, language, Task::Transcribe).unwrap();
        let processor = WhisperProcessor::new(WhisperFeatureExtractor::default(), tokenizer);

        let dir = temp_dir("wft-processor-test");
        processor.save_pretrained(&dir).unwrap();

        let repo = ModelRepo::Path(dir.clone());
        let reloaded = WhisperProcessor::from_repo(&repo, language, Task::Transcribe).unwrap();

        assert_eq!(
            reloaded.feature_extractor.config(),
            processor.feature_extractor.config()
        );
        assert_eq!(reloaded.tokenizer.language(), language);
        assert_eq!(reloaded.tokenizer.task(), Task::Transcribe);
        assert_eq!(
            reloaded.tokenizer.encode("hello world").unwrap(),
            processor.tokenizer.encode("hello world").unwrap()
        );

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = temp_dir("wft-processor-empty");
        let repo = ModelRepo::Path(dir.clone());

        let result = WhisperProcessor::from_repo(&repo, "hi".parse().unwrap(), Task::Transcribe);
        assert!(result.is_err());

        std::fs::remove_dir_all(dir).ok();
    }
}
