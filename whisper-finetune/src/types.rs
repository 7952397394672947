//! Core types for whisper-finetune

use eyre::{OptionExt, Result, WrapErr};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Label value ignored by the cross-entropy loss of the consuming trainer.
pub const IGNORE_INDEX: i64 = -100;

/// One corpus record: a waveform and its ground-truth transcript.
#[derive(Clone, Debug)]
pub struct RawSample {
    /// Mono amplitude samples
    pub waveform: Vec<f32>,
    /// Sampling rate of `waveform` in Hz
    pub sampling_rate: u32,
    /// Transcript text
    pub sentence: String,
}

impl RawSample {
    pub fn new(waveform: Vec<f32>, sampling_rate: u32, sentence: impl Into<String>) -> Self {
        Self {
            waveform,
            sampling_rate,
            sentence: sentence.into(),
        }
    }

    /// Duration of the waveform in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.waveform.len() as f32 / self.sampling_rate as f32
    }
}

/// Model-ready features and label ids derived from one [`RawSample`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreparedSample {
    /// Log-mel features, shape `(n_mels, n_frames)`
    pub input_features: Array2<f32>,
    /// Label token ids, starting with the start-of-transcript token
    pub labels: Vec<u32>,
}

/// Feature sequences right-padded to a common frame count.
#[derive(Clone, Debug)]
pub struct PaddedFeatures {
    /// Shape `(batch, n_mels, n_frames)`
    pub input_features: Array3<f32>,
    /// Shape `(batch, n_frames)`, 1 for real frames and 0 for padding
    pub attention_mask: Array2<i64>,
}

/// Label sequences right-padded with the pad token.
#[derive(Clone, Debug)]
pub struct PaddedLabels {
    /// Shape `(batch, max_len)`
    pub input_ids: Array2<i64>,
    /// Shape `(batch, max_len)`, 1 for real tokens and 0 for padding
    pub attention_mask: Array2<i64>,
}

/// Collated minibatch handed to the model.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Padded input features
    pub input_features: PaddedFeatures,
    /// Labels with padding replaced by [`IGNORE_INDEX`]
    pub labels: Array2<i64>,
}

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a file name to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        match self {
            ModelRepo::Path(path) => path
                .join(file_name)
                .canonicalize()
                .wrap_err(format!("failed to resolve model file: {file_name}")),
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_eyre(format!("model file not found in cache: {file_name}")),
            ModelRepo::Api(api_repo) => api_repo
                .get(file_name)
                .wrap_err(format!("failed to download from api: {file_name}")),
        }
    }
}
