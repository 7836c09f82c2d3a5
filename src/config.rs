use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AnalysisError;

/// Lowest accepted `min_detectable_hz`; a second of audio per lag search.
const MIN_DETECTABLE_FLOOR_HZ: f32 = 1.0;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// How an out-of-range BPM is pulled back into `tempo_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoCorrection {
    /// Halve or double until the value lands in range
    #[default]
    Repeat,
    /// At most one halving and one doubling, even if still out of range
    Single,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Lowest fundamental the pitch search looks for; sets the maximum lag
    #[serde(default = "default_min_detectable_hz")]
    pub min_detectable_hz: f32,
    /// Energy window length for the tempo profile
    #[serde(default = "default_onset_window_ms")]
    pub onset_window_ms: u32,
    /// Share of the buffer compared against itself at each lag
    #[serde(default = "default_comparison_fraction")]
    pub comparison_fraction: f32,
    /// Plausible tempo range as [min, max] BPM
    #[serde(default = "default_tempo_range")]
    pub tempo_range: [f64; 2],
    #[serde(default)]
    pub tempo_correction: TempoCorrection,
    /// Reported when no tempo can be determined
    #[serde(default = "default_fallback_bpm")]
    pub fallback_bpm: u32,
    /// Upper bound on autocorrelation multiply-adds (max_lag * comparison)
    #[serde(default = "default_max_correlation_ops")]
    pub max_correlation_ops: u64,
    #[serde(default = "default_pitch_track")]
    pub pitch_track: bool,
    #[serde(default = "default_pitch_frame_ms")]
    pub pitch_frame_ms: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    /// Directory for saved results; platform data dir when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_detectable_hz: default_min_detectable_hz(),
            onset_window_ms: default_onset_window_ms(),
            comparison_fraction: default_comparison_fraction(),
            tempo_range: default_tempo_range(),
            tempo_correction: TempoCorrection::default(),
            fallback_bpm: default_fallback_bpm(),
            max_correlation_ops: default_max_correlation_ops(),
            pitch_track: default_pitch_track(),
            pitch_frame_ms: default_pitch_frame_ms(),
        }
    }
}

impl AnalysisConfig {
    /// Rejects option combinations that would divide by zero or never settle
    /// the tempo range correction.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.min_detectable_hz.is_finite() && self.min_detectable_hz >= MIN_DETECTABLE_FLOOR_HZ) {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_detectable_hz must be at least {} Hz, got {}",
                MIN_DETECTABLE_FLOOR_HZ,
                self.min_detectable_hz
            )));
        }
        if self.onset_window_ms == 0 {
            return Err(AnalysisError::InvalidConfig(
                "onset_window_ms must be at least 1".into(),
            ));
        }
        if !(self.comparison_fraction > 0.0 && self.comparison_fraction <= 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "comparison_fraction must be in (0, 1], got {}",
                self.comparison_fraction
            )));
        }
        let [min, max] = self.tempo_range;
        if !(min.is_finite() && max.is_finite() && min > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "tempo_range must be positive, got [{}, {}]",
                min, max
            )));
        }
        // Halving from just above max must not undershoot min.
        if max < min * 2.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "tempo_range [{}, {}] must span at least one octave",
                min, max
            )));
        }
        if self.max_correlation_ops == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_correlation_ops must be at least 1".into(),
            ));
        }
        if self.pitch_track && self.pitch_frame_ms == 0 {
            return Err(AnalysisError::InvalidConfig(
                "pitch_frame_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_min_detectable_hz() -> f32 { 60.0 }
fn default_onset_window_ms() -> u32 { 20 }
fn default_comparison_fraction() -> f32 { 1.0 / 3.0 }
fn default_tempo_range() -> [f64; 2] { [60.0, 240.0] }
fn default_fallback_bpm() -> u32 { 120 }
fn default_max_correlation_ops() -> u64 { 500_000_000 }
fn default_pitch_track() -> bool { true }
fn default_pitch_frame_ms() -> u32 { 200 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// `./tunebeat.toml`, then the XDG-style path, then the platform config dir.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("tunebeat.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("tunebeat").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("tunebeat").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
