use super::buffer::SampleBuffer;
use super::energy::{build_energy_profile, dynamics, window_size};
use super::features::{AnalysisResult, TempoStats};
use super::pitch::{estimate_pitch, pitch_stats, pitch_track};
use super::tempo::estimate_tempo;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Runs pitch, energy and tempo estimation over one channel.
///
/// The buffer and config are checked up front; past that point every
/// outcome is a defined value, with sentinels for silent or aperiodic input.
pub fn analyze(buffer: &SampleBuffer, config: &AnalysisConfig) -> Result<AnalysisResult> {
    config.validate()?;
    buffer.validate()?;
    if window_size(buffer.sample_rate(), config.onset_window_ms) == 0 {
        return Err(AnalysisError::InvalidBuffer(format!(
            "sample rate {} Hz gives an empty {} ms energy window",
            buffer.sample_rate(),
            config.onset_window_ms
        )));
    }

    log::debug!(
        "Analyzing {} samples at {}Hz ({:.2}s)",
        buffer.len(),
        buffer.sample_rate(),
        buffer.duration_secs()
    );

    let ((pitch, track), (profile, tempo)) = rayon::join(
        || {
            let pitch = estimate_pitch(buffer, config);
            let track = if config.pitch_track {
                pitch_track(buffer, config)
            } else {
                Vec::new()
            };
            (pitch, track)
        },
        || {
            let profile = build_energy_profile(buffer, config.onset_window_ms);
            let tempo = estimate_tempo(&profile, config);
            (profile, tempo)
        },
    );

    if !pitch.is_detected() {
        log::warn!("No pitch detected (silent or aperiodic input)");
    }
    if !tempo.estimate.is_detected() {
        log::warn!(
            "Tempo undetermined from {} onset(s), reporting {} BPM",
            tempo.onsets.len(),
            config.fallback_bpm
        );
    }

    let dynamics = dynamics(&profile);
    let result = AnalysisResult {
        pitch_hz: pitch.hz(),
        tempo_bpm: tempo.estimate.bpm_or(config.fallback_bpm),
        dynamics,
        pitch: pitch_stats(pitch, track),
        tempo: TempoStats {
            detected: tempo.estimate.is_detected(),
            onset_count: tempo.onsets.len(),
            raw_bpm: tempo.raw_bpm,
            winning_interval: tempo.winning_interval,
        },
        sample_rate: buffer.sample_rate(),
        duration_secs: buffer.duration_secs(),
    };

    log::info!(
        "Analysis: pitch={:.1}Hz, tempo={} BPM, dynamics={:.1}/{:.1}/{:.1} dB, windows={}",
        result.pitch_hz,
        result.tempo_bpm,
        dynamics.min_db,
        dynamics.average_db,
        dynamics.max_db,
        profile.len()
    );

    Ok(result)
}
