//! Word error rate evaluation over generated token ids.

use crate::error::{Error, MetricError, Result};
use crate::traits::TextTokenizer;
use crate::types::IGNORE_INDEX;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Word-level alignment counts between a reference and a hypothesis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WordErrors {
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    /// Number of words in the reference
    pub reference_words: usize,
}

impl WordErrors {
    /// Total edit distance.
    pub fn errors(&self) -> usize {
        self.substitutions + self.deletions + self.insertions
    }

    /// Align two whitespace-tokenized strings by Levenshtein distance over words.
    pub fn align(reference: &str, hypothesis: &str) -> Self {
        let ref_words: Vec<&str> = reference.split_whitespace().collect();
        let hyp_words: Vec<&str> = hypothesis.split_whitespace().collect();

        let n = ref_words.len();
        let m = hyp_words.len();

        let mut dp = vec![vec![0usize; m + 1]; n + 1];
        for (i, row) in dp.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=m {
            dp[0][j] = j;
        }

        for i in 1..=n {
            for j in 1..=m {
                let cost = usize::from(ref_words[i - 1] != hyp_words[j - 1]);
                dp[i][j] = (dp[i - 1][j] + 1)
                    .min(dp[i][j - 1] + 1)
                    .min(dp[i - 1][j - 1] + cost);
            }
        }

        let mut counts = Self {
            reference_words: n,
            ..Default::default()
        };

        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            if i > 0 && j > 0 && ref_words[i - 1] == hyp_words[j - 1] {
                i -= 1;
                j -= 1;
            } else if i > 0 && j > 0 && dp[i][j] == dp[i - 1][j - 1] + 1 {
                counts.substitutions += 1;
                i -= 1;
                j -= 1;
            } else if i > 0 && dp[i][j] == dp[i - 1][j] + 1 {
                counts.deletions += 1;
                i -= 1;
            } else {
                counts.insertions += 1;
                j -= 1;
            }
        }

        counts
    }
}

impl AddAssign for WordErrors {
    fn add_assign(&mut self, rhs: Self) {
        self.substitutions += rhs.substitutions;
        self.deletions += rhs.deletions;
        self.insertions += rhs.insertions;
        self.reference_words += rhs.reference_words;
    }
}

/// Corpus-level word error rate in `[0, ∞)`.
///
/// Errors are summed over all pairs and divided by the total number of
/// reference words, so long utterances weigh more than short ones. An empty
/// reference contributes its hypothesis words as insertions.
pub fn word_error_rate<P, R>(predictions: &[P], references: &[R]) -> Result<f64>
where
    P: AsRef<str>,
    R: AsRef<str>,
{
    if predictions.len() != references.len() {
        return Err(MetricError::LengthMismatch {
            predictions: predictions.len(),
            references: references.len(),
        }
        .into());
    }

    let mut total = WordErrors::default();
    for (prediction, reference) in predictions.iter().zip(references) {
        total += WordErrors::align(reference.as_ref(), prediction.as_ref());
    }

    if total.reference_words == 0 {
        return Err(MetricError::EmptyReferences.into());
    }

    Ok(total.errors() as f64 / total.reference_words as f64)
}

/// Generated ids and reference labels from one evaluation pass.
///
/// Both matrices are `(num_samples, seq_len)`; either may carry
/// [`IGNORE_INDEX`] in padded positions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalPrediction {
    pub predictions: Array2<i64>,
    pub label_ids: Array2<i64>,
}

/// Named metric output reported to the trainer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Word error rate as a percentage
    pub wer: f64,
}

/// Computes word error rate from token ids by decoding both sides to text.
pub struct WerMetric<'a, T> {
    tokenizer: &'a T,
}

impl<'a, T: TextTokenizer> WerMetric<'a, T> {
    pub fn new(tokenizer: &'a T) -> Self {
        Self { tokenizer }
    }

    /// Decode predictions and labels, then score them.
    ///
    /// [`IGNORE_INDEX`] is mapped back to the pad id on both sides first so the
    /// tokenizer can decode it. Labels carry it from collation; predictions
    /// carry it where the trainer filled gaps between generated batches.
    /// Special tokens are dropped from both texts.
    pub fn compute(&self, eval: &EvalPrediction) -> Result<MetricResult> {
        let pad = i64::from(self.tokenizer.pad_token_id());
        let unmask = |id: i64| if id == IGNORE_INDEX { pad } else { id };

        let predictions = self.decode_rows(&eval.predictions.mapv(unmask))?;
        let references = self.decode_rows(&eval.label_ids.mapv(unmask))?;

        let wer = 100.0 * word_error_rate(&predictions, &references)?;

        tracing::info!(samples = references.len(), wer, "computed word error rate");

        Ok(MetricResult { wer })
    }

    fn decode_rows(&self, ids: &Array2<i64>) -> Result<Vec<String>> {
        let rows = ids
            .rows()
            .into_iter()
            .map(to_token_ids)
            .collect::<Result<Vec<_>>>()?;

        self.tokenizer.batch_decode(&rows, true)
    }
}

fn to_token_ids(row: ArrayView1<'_, i64>) -> Result<Vec<u32>> {
    row.iter()
        .map(|&id| u32::try_from(id).map_err(|_| Error::from(MetricError::InvalidTokenId(id))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tests::hindi_tokenizer;
    use ndarray::array;

    #[test]
    fn counts_one_substitution() {
        let errors = WordErrors::align("hello word", "hello world");

        assert_eq!(errors.substitutions, 1);
        assert_eq!(errors.errors(), 1);
        assert_eq!(errors.reference_words, 2);
    }

    #[test]
    fn counts_insertions_and_deletions() {
        let errors = WordErrors::align("the cat sat on the mat", "the cat sat mat mat mat");
        assert_eq!(errors.substitutions, 2);
        assert_eq!(errors.errors(), 2);

        let deleted = WordErrors::align("the cat sat", "the sat");
        assert_eq!(deleted.deletions, 1);
        assert_eq!(deleted.errors(), 1);

        let inserted = WordErrors::align("the cat", "the fat cat");
        assert_eq!(inserted.insertions, 1);
        assert_eq!(inserted.errors(), 1);
    }

    #[test]
    fn ignores_extra_whitespace() {
        assert_eq!(WordErrors::align("  hello   world ", "hello world").errors(), 0);
    }

    #[test]
    fn half_wrong_is_fifty_percent() {
        let wer = word_error_rate(&["hello world"], &["hello word"]).unwrap();
        assert!((wer * 100.0 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn aggregates_over_reference_words() {
        // 1 error over 2 words + 0 errors over 4 words
        let wer = word_error_rate(
            &["hello world", "the cat sat on"],
            &["hello word", "the cat sat on"],
        )
        .unwrap();
        assert!((wer - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn empty_reference_counts_insertions() {
        let wer = word_error_rate(&["hello", "extra words"], &["hello", ""]).unwrap();
        assert!((wer - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_all_empty_references() {
        assert!(matches!(
            word_error_rate(&["hello"], &[""]),
            Err(Error::Metric(MetricError::EmptyReferences))
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(matches!(
            word_error_rate(&["a", "b"], &["a"]),
            Err(Error::Metric(MetricError::LengthMismatch {
                predictions: 2,
                references: 1
            }))
        ));
    }

    #[test]
    fn computes_percentage_from_token_ids() {
        let tokenizer = hindi_tokenizer();
        let metric = WerMetric::new(&tokenizer);

        // "hello world" vs "hello word", labels already stripped of the start token
        let eval = EvalPrediction {
            predictions: array![[12, 14, 16, 17, 1, 2, 11]],
            label_ids: array![[14, 16, 17, 1, 3, 11, -100]],
        };

        let result = metric.compute(&eval).unwrap();
        assert!((result.wer - 50.0).abs() < 1e-9);
    }

    #[test]
    fn sentinel_and_pad_id_score_the_same() {
        let tokenizer = hindi_tokenizer();
        let metric = WerMetric::new(&tokenizer);

        let predictions = array![[12, 6, 7, 11, 11], [12, 4, 5, 11, 11]];
        let masked = EvalPrediction {
            predictions: predictions.clone(),
            label_ids: array![[6, 7, 8, 11, -100], [4, 5, 11, -100, -100]],
        };
        let replaced = EvalPrediction {
            predictions,
            label_ids: array![[6, 7, 8, 11, 11], [4, 5, 11, 11, 11]],
        };

        let a = metric.compute(&masked).unwrap();
        let b = metric.compute(&replaced).unwrap();

        assert_eq!(a, b);
        assert!((a.wer - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_negative_prediction_ids() {
        let tokenizer = hindi_tokenizer();
        let metric = WerMetric::new(&tokenizer);

        let eval = EvalPrediction {
            predictions: array![[1, -5]],
            label_ids: array![[1, 2]],
        };

        assert!(matches!(
            metric.compute(&eval),
            Err(Error::Metric(MetricError::InvalidTokenId(-5)))
        ));
    }

    #[test]
    fn sentinel_in_predictions_decodes_as_padding() {
        let tokenizer = hindi_tokenizer();
        let metric = WerMetric::new(&tokenizer);

        let eval = EvalPrediction {
            predictions: array![[12, 14, 16, 17, 1, 2, 11, -100]],
            label_ids: array![[14, 16, 17, 1, 3, 11, -100, -100]],
        };

        let result = metric.compute(&eval).unwrap();
        assert!((result.wer - 50.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_as_named_scalar() {
        let json = serde_json::to_string(&MetricResult { wer: 12.5 }).unwrap();
        assert_eq!(json, r#"{"wer":12.5}"#);
    }
}
