//! Core traits for the processors the pipeline components depend on.

use crate::error::Result;
use crate::types::{PaddedFeatures, PaddedLabels};
use ndarray::{Array2, ArrayView2};

/// Converts waveforms to model input features.
///
/// Implementations define one required sampling rate and their own padding
/// value for batching.
pub trait FeatureExtractor {
    /// Sampling rate the extractor expects, in Hz.
    fn sampling_rate(&self) -> u32;

    /// Extract features of shape `(n_features, n_frames)` from a mono waveform.
    ///
    /// Fails if `sampling_rate` differs from [`Self::sampling_rate`].
    fn extract(&self, waveform: &[f32], sampling_rate: u32) -> Result<Array2<f32>>;

    /// Right-pad feature sequences along the frame axis to the longest one.
    fn pad(&self, features: &[ArrayView2<'_, f32>]) -> Result<PaddedFeatures>;
}

/// Converts text to token ids and back.
pub trait TextTokenizer {
    /// Encode text including the model's leading and trailing special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids, optionally dropping special tokens from the text.
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String>;

    /// Id used to pad label sequences.
    fn pad_token_id(&self) -> u32;

    /// Id of the start-of-sequence marker.
    fn start_token_id(&self) -> u32;

    /// Id of the end-of-sequence marker.
    fn end_token_id(&self) -> u32;

    /// Decode many sequences with the same special-token policy.
    fn batch_decode(&self, sequences: &[Vec<u32>], skip_special_tokens: bool) -> Result<Vec<String>> {
        sequences
            .iter()
            .map(|ids| self.decode(ids, skip_special_tokens))
            .collect()
    }

    /// Right-pad id sequences to the longest one with [`Self::pad_token_id`].
    fn pad(&self, sequences: &[&[u32]]) -> PaddedLabels {
        let max_len = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
        let pad_id = i64::from(self.pad_token_id());

        let mut input_ids = Array2::from_elem((sequences.len(), max_len), pad_id);
        let mut attention_mask = Array2::zeros((sequences.len(), max_len));

        for (row, ids) in sequences.iter().enumerate() {
            for (col, &id) in ids.iter().enumerate() {
                input_ids[[row, col]] = i64::from(id);
                attention_mask[[row, col]] = 1;
            }
        }

        PaddedLabels {
            input_ids,
            attention_mask,
        }
    }
}
