use serde::{Deserialize, Serialize};

/// Fundamental frequency of a buffer, or no usable periodicity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PitchEstimate {
    /// Rounded to 0.1 Hz
    Detected { hz: f32 },
    Undetected,
}

impl PitchEstimate {
    /// Frequency in Hz, 0.0 when undetected.
    pub fn hz(&self) -> f32 {
        match *self {
            PitchEstimate::Detected { hz } => hz,
            PitchEstimate::Undetected => 0.0,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PitchEstimate::Detected { .. })
    }
}

/// Global tempo of a buffer, or too few onsets to tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempoEstimate {
    Detected { bpm: u32 },
    Undetermined,
}

impl TempoEstimate {
    pub fn bpm_or(&self, fallback: u32) -> u32 {
        match *self {
            TempoEstimate::Detected { bpm } => bpm,
            TempoEstimate::Undetermined => fallback,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, TempoEstimate::Detected { .. })
    }
}

/// Loudness summary in dBFS, derived from the energy profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dynamics {
    pub average_db: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Dynamics {
    pub fn range_db(&self) -> f32 {
        self.max_db - self.min_db
    }
}

/// Pitch of one fixed-length frame of the buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchFrame {
    pub time_secs: f32,
    /// 0.0 when the frame has no detectable pitch
    pub hz: f32,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchStats {
    /// Note name of the global estimate
    pub note: Option<String>,
    pub most_common_note: Option<String>,
    pub voiced_frames: usize,
    pub mean_hz: f32,
    pub min_hz: f32,
    pub max_hz: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub track: Vec<PitchFrame>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoStats {
    /// False when `tempo_bpm` is the configured fallback
    pub detected: bool,
    pub onset_count: usize,
    /// BPM before range correction and rounding
    pub raw_bpm: Option<f64>,
    /// Winning inter-onset bucket, in energy windows
    pub winning_interval: Option<usize>,
}

/// Everything one analysis produces. Owned by the caller once returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub pitch_hz: f32,
    pub tempo_bpm: u32,
    pub dynamics: Dynamics,
    pub pitch: PitchStats,
    pub tempo: TempoStats,
    pub sample_rate: u32,
    pub duration_secs: f32,
}
