//! tunebeat - pitch and tempo estimation for recorded performances
//!
//! The core in [`audio`] works on an already decoded [`audio::SampleBuffer`]
//! and returns an [`audio::AnalysisResult`] the caller owns. Decoding and
//! result storage are separate collaborators.

pub mod audio;
pub mod config;
pub mod error;
pub mod store;

pub use audio::{analyze, AnalysisResult, SampleBuffer};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
