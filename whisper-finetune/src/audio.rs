//! Audio loading and log-mel spectrogram computation.

use crate::error::{AudioError, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use ndarray::{Array2, Axis};
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::path::Path;

/// Sampling rate Whisper features are defined at (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// Log-mel spectrogram in Whisper's convention.
///
/// Centred STFT with reflect padding, periodic Hann window, Slaney mel scale,
/// `log10` compression with an 8 decade dynamic range, rescaled by `(x + 4) / 4`.
#[derive(Clone, Debug)]
pub struct LogMelSpectrogram {
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
}

impl LogMelSpectrogram {
    /// Whisper small/base/medium extractor (80 mel bins).
    pub const WHISPER: Self = Self {
        n_mels: 80,
        n_fft: 400,
        hop_length: 160,
        sample_rate: SAMPLE_RATE,
    };

    /// Apply log-mel extraction to audio samples.
    ///
    /// Returns features of shape `(n_mels, n_frames)` with
    /// `n_frames = audio.len() / hop_length`.
    pub fn apply(&self, audio: &[f32]) -> Array2<f32> {
        if audio.is_empty() {
            return Array2::zeros((self.n_mels, 0));
        }

        let power = stft_power(audio, self.n_fft, self.hop_length);
        let filterbank = mel_filterbank(self.n_fft, self.n_mels, self.sample_rate);
        let mel = filterbank.dot(&power);

        let mut log_mel = mel.mapv(|x| x.max(1e-10).log10());
        let max = log_mel.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        log_mel.mapv_inplace(|x| (x.max(max - 8.0) + 4.0) / 4.0);

        log_mel
    }
}

/// Load audio from a WAV file.
///
/// Returns interleaved samples scaled to `[-1, 1]` and the WAV specification.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<hound::Result<_>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<hound::Result<_>>()?
        }
    };

    Ok((samples, spec))
}

/// Load audio from a WAV file as mono f32 samples at the file's own rate.
///
/// Stereo is averaged down to mono. The sampling rate is returned rather than
/// validated so the caller decides how to handle non-16kHz input.
pub fn read_audio_mono(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let (mut audio, spec) = load_audio(path)?;

    if spec.channels == 0 || spec.channels > 2 {
        return Err(AudioError::InvalidChannels(spec.channels).into());
    }

    if spec.channels == 2 {
        audio = audio
            .chunks(2)
            .map(|chunk| chunk.iter().sum::<f32>() / 2.0)
            .collect();
    }

    Ok((audio, spec.sample_rate))
}

/// Reject waveforms that would silently produce garbage features.
pub fn validate_waveform(waveform: &[f32]) -> Result<()> {
    if waveform.is_empty() {
        return Err(AudioError::EmptyWaveform.into());
    }

    if let Some(index) = waveform.iter().position(|x| !x.is_finite()) {
        return Err(AudioError::NonFiniteSample { index }.into());
    }

    Ok(())
}

/// Mirror an out-of-range index back into `0..len` (numpy "reflect" mode).
fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// Periodic Hann window.
fn hann_window(window_length: usize) -> Vec<f32> {
    (0..window_length)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / window_length as f32).cos())
        .collect()
}

/// Centred STFT power spectrogram of shape `(n_fft / 2 + 1, len / hop_length)`.
///
/// The trailing frame produced by centring is dropped.
fn stft_power(audio: &[f32], n_fft: usize, hop_length: usize) -> Array2<f32> {
    let pad = (n_fft / 2) as isize;
    let padded: Vec<f32> = (-pad..audio.len() as isize + pad)
        .map(|i| audio[reflect_index(i, audio.len())])
        .collect();

    let window = hann_window(n_fft);
    let num_frames = (padded.len() - n_fft) / hop_length;
    let freq_bins = n_fft / 2 + 1;
    let mut spectrogram = Array2::<f32>::zeros((freq_bins, num_frames));

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut frame = vec![Complex::new(0.0, 0.0); n_fft];

    for (frame_idx, mut column) in spectrogram.axis_iter_mut(Axis(1)).enumerate() {
        let start = frame_idx * hop_length;

        for (i, bin) in frame.iter_mut().enumerate() {
            *bin = Complex::new(padded[start + i] * window[i], 0.0);
        }

        fft.process(&mut frame);

        for (k, value) in column.iter_mut().enumerate() {
            *value = frame[k].norm_sqr();
        }
    }

    spectrogram
}

const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = 15.0;
// ln(6.4) / 27
const LOGSTEP: f32 = 0.068_751_78;

/// Convert frequency in Hz to the Slaney mel scale.
fn hz_to_mel(freq: f32) -> f32 {
    if freq >= MIN_LOG_HZ {
        MIN_LOG_MEL + (freq / MIN_LOG_HZ).ln() / LOGSTEP
    } else {
        3.0 * freq / 200.0
    }
}

/// Convert the Slaney mel scale to frequency in Hz.
fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (LOGSTEP * (mel - MIN_LOG_MEL)).exp()
    } else {
        200.0 * mel / 3.0
    }
}

/// Filter edge frequencies: `n_mels + 2` points evenly spaced in mel.
fn mel_points(n_mels: usize, sample_rate: u32) -> Vec<f32> {
    let min_mel = hz_to_mel(0.0);
    let max_mel = hz_to_mel(sample_rate as f32 / 2.0);

    (0..n_mels + 2)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f32 / (n_mels + 1) as f32))
        .collect()
}

/// Slaney-normalised triangular mel filterbank of shape `(n_mels, n_fft / 2 + 1)`.
fn mel_filterbank(n_fft: usize, n_mels: usize, sample_rate: u32) -> Array2<f32> {
    let freq_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f32>::zeros((n_mels, freq_bins));

    let points = mel_points(n_mels, sample_rate);
    let bin_width = sample_rate as f32 / n_fft as f32;

    for (mel_idx, mut row) in filterbank.axis_iter_mut(Axis(0)).enumerate() {
        let left = points[mel_idx];
        let center = points[mel_idx + 1];
        let right = points[mel_idx + 2];
        let enorm = 2.0 / (right - left);

        for (freq_idx, weight) in row.iter_mut().enumerate() {
            let freq = freq_idx as f32 * bin_width;
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            *weight = lower.min(upper).max(0.0) * enorm;
        }
    }

    filterbank
}
