//! Error types for whisper-finetune organized by processing stage.

use ndarray::ShapeError;
use thiserror::Error;

/// Fine-tuning data pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio loading and feature extraction stage error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Tokenization stage error
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    /// Batch collation stage error
    #[error(transparent)]
    Collate(#[from] CollateError),

    /// Metric computation stage error
    #[error(transparent)]
    Metric(#[from] MetricError),

    /// Corpus manifest and prepared-sample persistence error
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Configuration errors (feature extractor, training arguments).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric field that must be positive was zero or negative
    #[error("invalid {field}: must be positive")]
    NonPositive { field: &'static str },

    /// Chunk is too short to hold a single FFT window
    #[error("chunk of {samples} samples is shorter than n_fft {n_fft}")]
    ChunkTooShort { samples: usize, n_fft: usize },

    /// Checkpoints would not line up with evaluations
    #[error("save_steps {save_steps} must be a multiple of eval_steps {eval_steps}")]
    MisalignedSaveSteps { save_steps: usize, eval_steps: usize },

    /// Only word error rate is computed by the evaluation hook
    #[error("unsupported metric_for_best_model: {0}")]
    UnsupportedMetric(String),

    /// Config file could not be parsed
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Config file could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Audio loading and validation errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample rate validation failed
    #[error("invalid sample rate: expected {expected}Hz, got {got}Hz")]
    InvalidSampleRate { expected: u32, got: u32 },

    /// Channel count validation failed
    #[error("invalid channel count: expected mono or stereo, got {0} channels")]
    InvalidChannels(u16),

    /// Waveform has no samples
    #[error("empty waveform")]
    EmptyWaveform,

    /// Waveform contains NaN or infinity
    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),
}

/// Tokenizer loading, encoding and decoding errors.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Special token required by Whisper is absent from the vocabulary
    #[error("special token missing from vocabulary: {0}")]
    MissingSpecialToken(String),

    /// Language is neither a Whisper language name nor code
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// Error raised by the tokenizers crate
    #[error("tokenizer: {0}")]
    Tokenizers(tokenizers::Error),
}

/// Batch collation errors.
#[derive(Debug, Error)]
pub enum CollateError {
    /// Collator was called with no samples
    #[error("cannot collate an empty batch")]
    EmptyBatch,

    /// Samples in a batch disagree on the feature dimension
    #[error("feature dimension mismatch in batch: expected {expected} mel bins, got {got}")]
    FeatureShape { expected: usize, got: usize },

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Metric computation errors.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Predictions and references differ in count
    #[error("got {predictions} predictions for {references} references")]
    LengthMismatch {
        predictions: usize,
        references: usize,
    },

    /// Negative token id other than the ignore sentinel
    #[error("invalid token id: {0}")]
    InvalidTokenId(i64),

    /// Every reference is empty, so the rate is undefined
    #[error("word error rate is undefined: references contain no words")]
    EmptyReferences,
}

/// Corpus manifest and prepared-sample persistence errors.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Manifest header lacks a required column
    #[error("manifest {path} is missing column {column:?}")]
    MissingColumn { path: String, column: &'static str },

    /// Manifest row has fewer fields than the header
    #[error("manifest {path} line {line}: expected {expected} fields, got {got}")]
    ShortRow {
        path: String,
        line: usize,
        expected: usize,
        got: usize,
    },

    /// Manifest or prepared file is empty
    #[error("no records in {0}")]
    Empty(String),

    /// A worker thread panicked during preparation
    #[error("preparation worker panicked")]
    WorkerPanicked,

    /// Prepared sample could not be (de)serialized
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// IO error reading or writing dataset files
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for whisper-finetune operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → AudioError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Audio(AudioError::Hound(e))
    }
}

// tokenizers::Error → TokenizerError → Error
impl From<tokenizers::Error> for Error {
    fn from(e: tokenizers::Error) -> Self {
        Error::Tokenizer(TokenizerError::Tokenizers(e))
    }
}

// ShapeError → CollateError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Collate(CollateError::Shape(e))
    }
}

// serde_json::Error → DatasetError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Dataset(DatasetError::Json(e))
    }
}

// std::io::Error → DatasetError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Dataset(DatasetError::Io(e))
    }
}
