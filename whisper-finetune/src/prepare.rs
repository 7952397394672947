//! Per-record preparation of features and labels.

use crate::error::Result;
use crate::traits::{FeatureExtractor, TextTokenizer};
use crate::types::{PreparedSample, RawSample};

/// Converts one [`RawSample`] into one [`PreparedSample`].
///
/// Holds no state besides references to the processors, so a single preparer
/// can be shared across worker threads.
pub struct SamplePreparer<'a, F, T> {
    feature_extractor: &'a F,
    tokenizer: &'a T,
}

impl<F, T> Clone for SamplePreparer<'_, F, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F, T> Copy for SamplePreparer<'_, F, T> {}

impl<'a, F, T> SamplePreparer<'a, F, T>
where
    F: FeatureExtractor,
    T: TextTokenizer,
{
    pub fn new(feature_extractor: &'a F, tokenizer: &'a T) -> Self {
        Self {
            feature_extractor,
            tokenizer,
        }
    }

    /// Extract features and encode the transcript.
    ///
    /// The waveform must already be at the extractor's sampling rate; any
    /// other rate is rejected instead of producing corrupt features.
    pub fn prepare(&self, sample: &RawSample) -> Result<PreparedSample> {
        let input_features = self
            .feature_extractor
            .extract(&sample.waveform, sample.sampling_rate)?;
        let labels = self.tokenizer.encode(&sample.sentence)?;

        tracing::debug!(
            duration_secs = sample.duration_secs(),
            frames = input_features.ncols(),
            labels = labels.len(),
            "prepared sample"
        );

        Ok(PreparedSample {
            input_features,
            labels,
        })
    }
}
