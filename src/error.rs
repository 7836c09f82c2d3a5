use thiserror::Error;

/// Errors raised before any numeric routine runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Empty buffer, zero sample rate or non-finite samples
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),

    /// Analysis options that cannot produce a defined result
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
