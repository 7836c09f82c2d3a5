//! Autocorrelation pitch estimation.
//!
//! The correlation `r(L) = Σ x[i] * x[i + L]` is taken over a fixed
//! comparison window (a fraction of the buffer) for every lag below
//! `sample_rate / min_detectable_hz`. The search skips the initial
//! non-increasing run that starts at lag 0 and takes the strongest lag after
//! it as the period. Octave errors are not corrected.

use rayon::prelude::*;

use super::buffer::SampleBuffer;
use super::features::{PitchEstimate, PitchFrame, PitchStats};
use crate::config::AnalysisConfig;

/// Mean square below this (-100 dBFS) counts as silence.
const SILENCE_POWER: f64 = 1e-10;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn estimate_pitch(buffer: &SampleBuffer, config: &AnalysisConfig) -> PitchEstimate {
    estimate_from_samples(buffer.samples(), buffer.sample_rate(), config)
}

fn estimate_from_samples(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> PitchEstimate {
    // Lags at or past the end of the buffer would correlate nothing.
    let max_lag = max_lag(sample_rate, config.min_detectable_hz).min(samples.len());
    if max_lag < 2 {
        return PitchEstimate::Undetected;
    }
    let comparison = comparison_len(
        samples.len(),
        config.comparison_fraction,
        max_lag,
        config.max_correlation_ops,
    );
    if comparison == 0 {
        return PitchEstimate::Undetected;
    }

    let corr = autocorrelation(samples, max_lag, comparison);
    if corr[0] / comparison as f64 <= SILENCE_POWER {
        return PitchEstimate::Undetected;
    }

    let Some(start) = first_drop(&corr) else {
        return PitchEstimate::Undetected;
    };
    let lag = peak_lag(&corr, start);
    if lag == 0 || corr[lag] <= 0.0 {
        return PitchEstimate::Undetected;
    }

    let hz = sample_rate as f64 / lag as f64;
    PitchEstimate::Detected {
        hz: ((hz * 10.0).round() / 10.0) as f32,
    }
}

/// Largest lag searched (exclusive): `floor(sample_rate / min_hz)`.
pub fn max_lag(sample_rate: u32, min_hz: f32) -> usize {
    if !(min_hz > 0.0) {
        return 0;
    }
    (sample_rate as f64 / min_hz as f64).floor() as usize
}

/// Comparison window length, truncated so that `max_lag * len` stays under
/// the cost ceiling.
pub fn comparison_len(total: usize, fraction: f32, max_lag: usize, max_ops: u64) -> usize {
    let wanted = (total as f64 * fraction as f64).floor() as usize;
    let ceiling = (max_ops / max_lag.max(1) as u64) as usize;
    if wanted > ceiling {
        log::debug!(
            "Correlation window truncated from {} to {} samples (max_lag={})",
            wanted,
            ceiling,
            max_lag
        );
        return ceiling;
    }
    wanted
}

/// Unnormalized autocorrelation for lags `0..max_lag`.
///
/// Each lag sums sequentially and lags are collected in index order, so
/// the output does not depend on thread scheduling. Lags that run past the
/// end of the buffer only use the overlapping part.
pub fn autocorrelation(samples: &[f32], max_lag: usize, comparison: usize) -> Vec<f64> {
    (0..max_lag)
        .into_par_iter()
        .map(|lag| {
            let end = comparison.min(samples.len().saturating_sub(lag));
            if end == 0 {
                return 0.0;
            }
            samples[..end]
                .iter()
                .zip(&samples[lag..lag + end])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

/// Index where the correlation first rises, `None` if it never does.
pub fn first_drop(corr: &[f64]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < corr.len() && corr[i + 1] <= corr[i] {
        i += 1;
    }
    if i + 1 >= corr.len() {
        None
    } else {
        Some(i)
    }
}

/// Lag of the maximum at or after `start`; the earliest wins ties.
pub fn peak_lag(corr: &[f64], start: usize) -> usize {
    let mut best = start;
    for lag in start..corr.len() {
        if corr[lag] > corr[best] {
            best = lag;
        }
    }
    best
}

/// Frame-by-frame pitch over non-overlapping frames of `pitch_frame_ms`.
///
/// The whole track shares `max_correlation_ops`: when every frame would not
/// fit, only every `stride`-th frame is estimated and the rest are left out.
pub fn pitch_track(buffer: &SampleBuffer, config: &AnalysisConfig) -> Vec<PitchFrame> {
    let sample_rate = buffer.sample_rate();
    let frame_len = (sample_rate as u64 * config.pitch_frame_ms as u64 / 1000) as usize;
    if frame_len == 0 || buffer.is_empty() {
        return Vec::new();
    }
    let min_len = max_lag(sample_rate, config.min_detectable_hz);

    let frames = buffer.len().div_ceil(frame_len);
    let frame_lags = min_len.min(frame_len);
    let frame_comparison = comparison_len(
        frame_len,
        config.comparison_fraction,
        frame_lags,
        config.max_correlation_ops,
    );
    let frame_ops = frame_lags as u64 * frame_comparison as u64;
    let stride = track_stride(frames, frame_ops, config.max_correlation_ops);
    if stride > 1 {
        log::debug!(
            "Pitch track strided: every {} of {} frames ({} ops/frame, ceiling {})",
            stride,
            frames,
            frame_ops,
            config.max_correlation_ops
        );
    }

    buffer
        .samples()
        .par_chunks(frame_len)
        .enumerate()
        .filter(|(i, _)| i % stride == 0)
        .map(|(i, frame)| {
            let estimate = if frame.len() < min_len {
                PitchEstimate::Undetected
            } else {
                estimate_from_samples(frame, sample_rate, config)
            };
            let hz = estimate.hz();
            PitchFrame {
                time_secs: (i * frame_len) as f32 / sample_rate as f32,
                hz,
                note: frequency_to_note(hz),
            }
        })
        .collect()
}

/// Frame step that keeps `estimated frames * frame_ops` within `max_ops`.
/// At least one frame is always estimated.
pub fn track_stride(frames: usize, frame_ops: u64, max_ops: u64) -> usize {
    if frames == 0 {
        return 1;
    }
    let affordable = (max_ops / frame_ops.max(1)).max(1);
    let affordable = usize::try_from(affordable).unwrap_or(usize::MAX);
    frames.div_ceil(affordable).max(1)
}

/// Nearest equal-tempered note, e.g. 440 Hz -> "A4".
pub fn frequency_to_note(hz: f32) -> Option<String> {
    if !(hz > 0.0) || !hz.is_finite() {
        return None;
    }
    let c0 = 440.0f64 * 2f64.powf(-4.75);
    let h = (12.0 * (hz as f64 / c0).log2()).round();
    if h < 0.0 {
        return None;
    }
    let h = h as usize;
    Some(format!("{}{}", NOTE_NAMES[h % 12], h / 12))
}

/// Summary of the global estimate and the voiced frames of `track`.
pub fn pitch_stats(estimate: PitchEstimate, track: Vec<PitchFrame>) -> PitchStats {
    let voiced: Vec<f32> = track.iter().map(|f| f.hz).filter(|&hz| hz > 0.0).collect();

    let (mean_hz, min_hz, max_hz) = if voiced.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mean = voiced.iter().map(|&v| v as f64).sum::<f64>() / voiced.len() as f64;
        let min = voiced.iter().copied().fold(f32::MAX, f32::min);
        let max = voiced.iter().copied().fold(0.0f32, f32::max);
        (mean as f32, min, max)
    };

    PitchStats {
        note: frequency_to_note(estimate.hz()),
        most_common_note: most_common_note(&track),
        voiced_frames: voiced.len(),
        mean_hz,
        min_hz,
        max_hz,
        track,
    }
}

fn most_common_note(track: &[PitchFrame]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for note in track.iter().filter_map(|f| f.note.as_deref()) {
        match counts.iter_mut().find(|(n, _)| *n == note) {
            Some((_, count)) => *count += 1,
            None => counts.push((note, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for &(note, count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((note, count));
        }
    }
    best.map(|(note, _)| note.to_string())
}
