//! Pitch, tempo and dynamics estimation over decoded audio.

pub mod analysis;
pub mod buffer;
pub mod decode;
pub mod energy;
pub mod features;
pub mod pitch;
pub mod tempo;

pub use analysis::analyze;
pub use buffer::{DecodedAudio, SampleBuffer};
pub use energy::{build_energy_profile, EnergyProfile};
pub use features::{AnalysisResult, Dynamics, PitchEstimate, TempoEstimate};
pub use pitch::estimate_pitch;
pub use tempo::estimate_tempo;
