//! Whisper feature extractor.

use crate::audio::{LogMelSpectrogram, SAMPLE_RATE, validate_waveform};
use crate::error::{AudioError, CollateError, ConfigError, Result};
use crate::traits::FeatureExtractor;
use crate::types::PaddedFeatures;
use ndarray::{Array2, Array3, ArrayView2, s};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feature extractor settings, as stored in `preprocessor_config.json`.
///
/// Unknown keys in the file are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperFeatureConfig {
    /// Number of mel bins
    pub feature_size: usize,
    pub sampling_rate: u32,
    pub hop_length: usize,
    /// Seconds every waveform is padded or truncated to
    pub chunk_length: usize,
    pub n_fft: usize,
    pub padding_value: f32,
}

impl Default for WhisperFeatureConfig {
    fn default() -> Self {
        Self {
            feature_size: 80,
            sampling_rate: SAMPLE_RATE,
            hop_length: 160,
            chunk_length: 30,
            n_fft: 400,
            padding_value: 0.0,
        }
    }
}

impl WhisperFeatureConfig {
    /// Load and validate a `preprocessor_config.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: Self = serde_json::from_str(&text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Samples per chunk (`chunk_length * sampling_rate`).
    pub fn n_samples(&self) -> usize {
        self.chunk_length * self.sampling_rate as usize
    }

    /// Frames per chunk.
    pub fn nb_max_frames(&self) -> usize {
        self.n_samples() / self.hop_length
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("feature_size", self.feature_size),
            ("sampling_rate", self.sampling_rate as usize),
            ("hop_length", self.hop_length),
            ("chunk_length", self.chunk_length),
            ("n_fft", self.n_fft),
        ];

        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NonPositive { field }.into());
        }

        if self.n_samples() < self.n_fft {
            return Err(ConfigError::ChunkTooShort {
                samples: self.n_samples(),
                n_fft: self.n_fft,
            }
            .into());
        }

        Ok(())
    }
}

/// Whisper log-mel feature extractor.
///
/// Every waveform is padded with silence or truncated to `chunk_length`
/// seconds before extraction, so all features share one frame count.
#[derive(Clone, Debug)]
pub struct WhisperFeatureExtractor {
    config: WhisperFeatureConfig,
    mel: LogMelSpectrogram,
}

impl Default for WhisperFeatureExtractor {
    fn default() -> Self {
        Self::from_validated(WhisperFeatureConfig::default())
    }
}

impl WhisperFeatureExtractor {
    /// Validate the configuration and create an extractor from it.
    pub fn new(config: WhisperFeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: WhisperFeatureConfig) -> Self {
        let mel = LogMelSpectrogram {
            n_mels: config.feature_size,
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            sample_rate: config.sampling_rate,
        };
        Self { config, mel }
    }

    /// Get the extractor configuration.
    pub fn config(&self) -> &WhisperFeatureConfig {
        &self.config
    }
}

impl FeatureExtractor for WhisperFeatureExtractor {
    fn sampling_rate(&self) -> u32 {
        self.config.sampling_rate
    }

    fn extract(&self, waveform: &[f32], sampling_rate: u32) -> Result<Array2<f32>> {
        if sampling_rate != self.sampling_rate() {
            return Err(AudioError::InvalidSampleRate {
                expected: self.sampling_rate(),
                got: sampling_rate,
            }
            .into());
        }

        validate_waveform(waveform)?;

        let n_samples = self.config.n_samples();
        if waveform.len() > n_samples {
            tracing::warn!(
                samples = waveform.len(),
                max_samples = n_samples,
                "truncating waveform to chunk length"
            );
        }

        let mut chunk = vec![0.0; n_samples];
        let len = waveform.len().min(n_samples);
        chunk[..len].copy_from_slice(&waveform[..len]);

        Ok(self.mel.apply(&chunk))
    }

    fn pad(&self, features: &[ArrayView2<'_, f32>]) -> Result<PaddedFeatures> {
        let n_mels = features
            .first()
            .map_or(self.config.feature_size, |f| f.nrows());
        let max_frames = features.iter().map(|f| f.ncols()).max().unwrap_or(0);

        let mut input_features = Array3::from_elem(
            (features.len(), n_mels, max_frames),
            self.config.padding_value,
        );
        let mut attention_mask = Array2::zeros((features.len(), max_frames));

        for (i, feature) in features.iter().enumerate() {
            if feature.nrows() != n_mels {
                return Err(CollateError::FeatureShape {
                    expected: n_mels,
                    got: feature.nrows(),
                }
                .into());
            }

            let frames = feature.ncols();
            input_features
                .slice_mut(s![i, .., ..frames])
                .assign(feature);
            attention_mask.slice_mut(s![i, ..frames]).fill(1);
        }

        Ok(PaddedFeatures {
            input_features,
            attention_mask,
        })
    }
}
