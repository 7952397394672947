//! Batch collation for sequence-to-sequence speech training.

use crate::error::{CollateError, Result};
use crate::traits::{FeatureExtractor, TextTokenizer};
use crate::types::{Batch, IGNORE_INDEX, PreparedSample};
use ndarray::{Axis, Zip, s};

/// Pads prepared samples into a [`Batch`] with loss-masked labels.
///
/// Steps:
/// 1. Pad features with the extractor's padding convention
/// 2. Pad labels with the tokenizer's pad token
/// 3. Replace padded label positions with [`IGNORE_INDEX`]
/// 4. Drop the leading label column when every row starts with the start
///    token, since the model re-inserts it as the decoder start token
pub struct DataCollatorSpeechSeq2SeqWithPadding<'a, F, T> {
    feature_extractor: &'a F,
    tokenizer: &'a T,
}

impl<'a, F, T> DataCollatorSpeechSeq2SeqWithPadding<'a, F, T>
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

    /// Collate one minibatch.
    pub fn collate(&self, samples: &[PreparedSample]) -> Result<Batch> {
        if samples.is_empty() {
            return Err(CollateError::EmptyBatch.into());
        }

        let features: Vec<_> = samples.iter().map(|s| s.input_features.view()).collect();
        let input_features = self.feature_extractor.pad(&features)?;

        let sequences: Vec<&[u32]> = samples.iter().map(|s| s.labels.as_slice()).collect();
        let padded = self.tokenizer.pad(&sequences);

        // Masking goes by position, not value: the pad id may equal a real
        // end-of-text token.
        let mut labels = padded.input_ids;
        Zip::from(&mut labels)
            .and(&padded.attention_mask)
            .for_each(|id, &mask| {
                if mask != 1 {
                    *id = IGNORE_INDEX;
                }
            });

        let start = i64::from(self.tokenizer.start_token_id());
        if labels.len_of(Axis(1)) > 0 && labels.column(0).iter().all(|&id| id == start) {
            labels = labels.slice(s![.., 1..]).to_owned();
        }

        tracing::debug!(
            batch_size = samples.len(),
            frames = input_features.input_features.len_of(Axis(2)),
            label_len = labels.ncols(),
            "collated batch"
        );

        Ok(Batch {
            input_features,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::feature_extractor::WhisperFeatureExtractor;
    use crate::tokenizer::WhisperTokenizer;
    use crate::tokenizer::tests::hindi_tokenizer;
    use ndarray::Array2;

    const SOT: u32 = 12;
    const EOT: u32 = 11;

    fn sample(frames: usize, labels: &[u32]) -> PreparedSample {
        PreparedSample {
            input_features: Array2::from_elem((80, frames), 0.5),
            labels: labels.to_vec(),
        }
    }

    fn processors() -> (WhisperFeatureExtractor, WhisperTokenizer) {
        (WhisperFeatureExtractor::default(), hindi_tokenizer())
    }

    #[test]
    fn rejects_empty_batch() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        assert!(matches!(
            collator.collate(&[]),
            Err(Error::Collate(CollateError::EmptyBatch))
        ));
    }

    #[test]
    fn single_sample_is_not_padded() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        let only = sample(7, &[1, 2, 3, EOT]);
        let batch = collator.collate(std::slice::from_ref(&only)).unwrap();

        assert_eq!(batch.input_features.input_features.dim(), (1, 80, 7));
        assert_eq!(
            batch.input_features.input_features.index_axis(Axis(0), 0),
            only.input_features
        );
        assert!(batch.input_features.attention_mask.iter().all(|&m| m == 1));
        assert_eq!(batch.labels.row(0).to_vec(), vec![1, 2, 3, 11]);
    }

    #[test]
    fn masks_label_padding_with_sentinel() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        let batch = collator
            .collate(&[
                sample(3, &[1, 2, 3, 4, EOT]),
                sample(3, &[1, 2, 3, 4, 5, 6, 7, EOT]),
            ])
            .unwrap();

        assert_eq!(batch.labels.dim(), (2, 8));
        assert_eq!(batch.labels.row(0).to_vec(), vec![1, 2, 3, 4, 11, -100, -100, -100]);
        assert_eq!(batch.labels.row(1).to_vec(), vec![1, 2, 3, 4, 5, 6, 7, 11]);
    }

    #[test]
    fn keeps_real_end_token_equal_to_pad_id() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);
        assert_eq!(tokenizer.pad_token_id(), EOT);

        let batch = collator
            .collate(&[sample(3, &[1, EOT]), sample(3, &[1, 2, EOT])])
            .unwrap();

        assert_eq!(batch.labels.row(0).to_vec(), vec![1, 11, -100]);
    }

    #[test]
    fn strips_start_token_when_all_rows_share_it() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        let batch = collator
            .collate(&[sample(3, &[SOT, 1, EOT]), sample(3, &[SOT, 2, 3, EOT])])
            .unwrap();

        assert_eq!(batch.labels.dim(), (2, 3));
        assert_eq!(batch.labels.row(0).to_vec(), vec![1, 11, -100]);
        assert_eq!(batch.labels.row(1).to_vec(), vec![2, 3, 11]);
    }

    #[test]
    fn keeps_start_token_when_any_row_differs() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        let batch = collator
            .collate(&[sample(3, &[SOT, 1, EOT]), sample(3, &[2, 3, EOT])])
            .unwrap();

        assert_eq!(batch.labels.dim(), (2, 3));
        assert_eq!(batch.labels[[0, 0]], 12);
        assert_eq!(batch.labels[[1, 0]], 2);
    }

    #[test]
    fn pads_features_to_longest() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);

        let batch = collator
            .collate(&[sample(2, &[1]), sample(5, &[1])])
            .unwrap();

        assert_eq!(batch.input_features.input_features.dim(), (2, 80, 5));
        assert_eq!(batch.input_features.input_features[[0, 0, 4]], 0.0);
        assert_eq!(
            batch.input_features.attention_mask.row(0).to_vec(),
            vec![1, 1, 0, 0, 0]
        );
    }

    #[test]
    fn prepared_samples_collate_to_whisper_shape() {
        let (extractor, tokenizer) = processors();
        let collator = DataCollatorSpeechSeq2SeqWithPadding::new(&extractor, &tokenizer);
        let preparer = crate::prepare::SamplePreparer::new(&extractor, &tokenizer);

        let samples: Vec<_> = ["hello world", "नमस्ते"]
            .into_iter()
            .map(|text| {
                let raw = crate::types::RawSample::new(vec![0.0; 16000], 16000, text);
                preparer.prepare(&raw).unwrap()
            })
            .collect();

        let batch = collator.collate(&samples).unwrap();

        assert_eq!(batch.input_features.input_features.dim(), (2, 80, 3000));
        // prefix (minus start token) + 2 words + end token
        assert_eq!(batch.labels.row(0).to_vec(), vec![14, 16, 17, 1, 2, 11]);
        assert_eq!(batch.labels.row(1).to_vec(), vec![14, 16, 17, 4, 11, -100]);
    }
}
