//! Data pipeline for fine-tuning Whisper speech recognition models.
//!
//! The crate turns raw `(audio, transcript)` pairs into model-ready inputs and
//! scores generated transcripts. Training itself runs elsewhere; the pieces
//! here plug into a sequence-to-sequence trainer:
//!
//! - [`prepare::SamplePreparer`] extracts log-mel features and label ids per sample
//! - [`collate::DataCollatorSpeechSeq2SeqWithPadding`] pads a minibatch and masks label padding
//! - [`metrics::WerMetric`] decodes predictions and labels and reports word error rate
//!
//! # Example
//!
//! ```no_run
//! use whisper_finetune::collate::DataCollatorSpeechSeq2SeqWithPadding;
//! use whisper_finetune::prepare::SamplePreparer;
//! use whisper_finetune::processor::WhisperProcessor;
//! use whisper_finetune::tokenizer::Task;
//! use whisper_finetune::types::{ModelRepo, RawSample};
//!
//! # fn main() -> eyre::Result<()> {
//! let repo = ModelRepo::Path("whisper-small".into());
//! let processor = WhisperProcessor::from_repo(&repo, "Hindi".parse()?, Task::Transcribe)?;
//!
//! let preparer = SamplePreparer::new(&processor.feature_extractor, &processor.tokenizer);
//! let sample = preparer.prepare(&RawSample::new(vec![0.0; 16000], 16000, "नमस्ते"))?;
//!
//! let collator =
//!     DataCollatorSpeechSeq2SeqWithPadding::new(&processor.feature_extractor, &processor.tokenizer);
//! let batch = collator.collate(&[sample])?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod collate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod prepare;
pub mod processor;
pub mod tokenizer;
pub mod traits;
pub mod types;
