//! Corpus manifests, parallel preparation and prepared-sample persistence.
//!
//! Splits follow the Common Voice layout:
//!
//! ```text
//! <corpus>/train.tsv
//! <corpus>/test.tsv
//! <corpus>/clips/<clip>.wav
//! ```
//!
//! Only the `path` and `sentence` columns are read; transcripts are kept
//! verbatim. Clips are expected as WAV files already resampled to 16kHz; the
//! manifest may still name the `.mp3`, only the file stem is used.

use crate::audio::read_audio_mono;
use crate::error::{DatasetError, Result};
use crate::prepare::SamplePreparer;
use crate::traits::{FeatureExtractor, TextTokenizer};
use crate::types::{PreparedSample, RawSample};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const PATH_COLUMN: &str = "path";
const SENTENCE_COLUMN: &str = "sentence";

/// One manifest row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Resolved WAV path
    pub audio_path: PathBuf,
    /// Transcript text
    pub sentence: String,
}

impl ManifestEntry {
    /// Load the clip into a [`RawSample`] at its native sampling rate.
    pub fn load(&self) -> Result<RawSample> {
        let (waveform, sampling_rate) = read_audio_mono(&self.audio_path)?;
        Ok(RawSample::new(waveform, sampling_rate, self.sentence.clone()))
    }
}

/// All rows of one corpus split.
#[derive(Clone, Debug)]
pub struct Manifest {
    pub split: String,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Read `<corpus_dir>/<split>.tsv`.
    pub fn from_corpus(corpus_dir: impl AsRef<Path>, split: &str) -> Result<Self> {
        let corpus_dir = corpus_dir.as_ref();
        let tsv_path = corpus_dir.join(format!("{split}.tsv"));
        let clips_dir = corpus_dir.join("clips");

        let entries = read_tsv(&tsv_path, &clips_dir)?;

        tracing::info!(split, entries = entries.len(), "loaded manifest");

        Ok(Self {
            split: split.to_string(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_tsv(tsv_path: &Path, clips_dir: &Path) -> Result<Vec<ManifestEntry>> {
    let display = tsv_path.display().to_string();
    let reader = BufReader::new(File::open(tsv_path)?);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| DatasetError::Empty(display.clone()))?;
    let columns: Vec<&str> = header.split('\t').collect();

    let column = |name: &'static str| {
        columns
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                path: display.clone(),
                column: name,
            })
    };
    let path_idx = column(PATH_COLUMN)?;
    let sentence_idx = column(SENTENCE_COLUMN)?;

    let mut entries = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let (Some(clip), Some(sentence)) = (fields.get(path_idx), fields.get(sentence_idx)) else {
            return Err(DatasetError::ShortRow {
                path: display,
                line: i + 2,
                expected: columns.len(),
                got: fields.len(),
            }
            .into());
        };

        entries.push(ManifestEntry {
            audio_path: clips_dir.join(clip).with_extension("wav"),
            sentence: sentence.to_string(),
        });
    }

    Ok(entries)
}

/// Run the preparer over every manifest entry on `num_workers` threads.
///
/// Entries are split into contiguous chunks, one per worker, so the output
/// keeps manifest order. The first failing entry aborts the split.
pub fn prepare_split<F, T>(
    preparer: SamplePreparer<'_, F, T>,
    manifest: &Manifest,
    num_workers: usize,
) -> Result<Vec<PreparedSample>>
where
    F: FeatureExtractor + Sync,
    T: TextTokenizer + Sync,
{
    if manifest.is_empty() {
        return Err(DatasetError::Empty(manifest.split.clone()).into());
    }

    let num_workers = num_workers.clamp(1, manifest.len());
    let chunk_size = manifest.len().div_ceil(num_workers);

    tracing::info!(
        split = %manifest.split,
        samples = manifest.len(),
        num_workers,
        "preparing split"
    );

    let prepare_chunk = move |chunk: &[ManifestEntry]| -> Result<Vec<PreparedSample>> {
        chunk
            .iter()
            .map(|entry| {
                let sample = entry.load()?;
                preparer.prepare(&sample).inspect_err(|e| {
                    tracing::error!(path = ?entry.audio_path.display(), error = %e, "failed to prepare sample");
                })
            })
            .collect()
    };

    let chunks: Vec<Result<Vec<PreparedSample>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = manifest
            .entries
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || prepare_chunk(chunk)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(DatasetError::WorkerPanicked.into()))
            })
            .collect()
    });

    let mut prepared = Vec::with_capacity(manifest.len());
    for chunk in chunks {
        prepared.extend(chunk?);
    }

    Ok(prepared)
}

/// Write prepared samples as JSON lines.
pub fn write_jsonl(path: impl AsRef<Path>, samples: &[PreparedSample]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for sample in samples {
        serde_json::to_writer(&mut writer, sample)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(path = ?path.display(), samples = samples.len(), "wrote prepared samples");
    Ok(())
}

/// Read prepared samples written by [`write_jsonl`].
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<PreparedSample>> {
    let reader = BufReader::new(File::open(path)?);

    reader
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| -> Result<PreparedSample> { Ok(serde_json::from_str(&line?)?) })
        .collect()
}
