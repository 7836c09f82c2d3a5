use crate::error::{AnalysisError, Result};

/// One channel of decoded samples in [-1, 1] at a fixed rate.
///
/// Estimators only ever borrow a buffer; nothing in the core keeps a
/// reference past the call that received it.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Rejects buffers the numeric routines cannot handle without producing
    /// NaN or Infinity.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidBuffer("sample rate is zero".into()));
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::InvalidBuffer("buffer has no samples".into()));
        }
        if let Some(pos) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidBuffer(format!(
                "non-finite sample at index {}",
                pos
            )));
        }
        Ok(())
    }
}

/// Decoder adapter output: de-interleaved channels sharing one sample rate.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Copy of a single channel, `None` if out of range.
    pub fn channel(&self, index: usize) -> Option<SampleBuffer> {
        self.channels
            .get(index)
            .map(|c| SampleBuffer::new(c.clone(), self.sample_rate))
    }

    /// Average of all channels.
    pub fn downmix(&self) -> SampleBuffer {
        let frames = self.frames();
        let count = self.channels.len();
        if count <= 1 {
            let mono = self.channels.first().cloned().unwrap_or_default();
            return SampleBuffer::new(mono, self.sample_rate);
        }
        let mono = (0..frames)
            .map(|i| {
                self.channels
                    .iter()
                    .map(|c| c.get(i).copied().unwrap_or(0.0))
                    .sum::<f32>()
                    / count as f32
            })
            .collect();
        SampleBuffer::new(mono, self.sample_rate)
    }
}
