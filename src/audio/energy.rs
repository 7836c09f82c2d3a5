use rayon::prelude::*;

use super::buffer::SampleBuffer;
use super::features::Dynamics;

/// Lowest reported level; anything at or below 1e-5 RMS lands here.
pub const DB_FLOOR: f32 = -100.0;
const DB_FLOOR_RMS: f32 = 1e-5;

/// Per-window RMS energy of one channel, in time order.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyProfile {
    pub values: Vec<f32>,
    /// Nominal window length in samples (the last window may be shorter)
    pub window_size: usize,
    pub sample_rate: u32,
}

impl EnergyProfile {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn seconds_per_window(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.window_size as f64 / self.sample_rate as f64
    }
}

/// `floor(sample_rate * window_ms / 1000)` samples.
pub fn window_size(sample_rate: u32, window_ms: u32) -> usize {
    (sample_rate as u64 * window_ms as u64 / 1000) as usize
}

pub fn build_energy_profile(buffer: &SampleBuffer, window_ms: u32) -> EnergyProfile {
    let window = window_size(buffer.sample_rate(), window_ms).max(1);

    let values = buffer
        .samples()
        .par_chunks(window)
        .map(|chunk| {
            let sum: f64 = chunk.iter().map(|&s| s as f64 * s as f64).sum();
            (sum / chunk.len() as f64).sqrt() as f32
        })
        .collect();

    EnergyProfile {
        values,
        window_size: window,
        sample_rate: buffer.sample_rate(),
    }
}

pub fn rms_to_db(rms: f32) -> f32 {
    if rms <= DB_FLOOR_RMS {
        return DB_FLOOR;
    }
    (20.0 * rms.log10()).max(DB_FLOOR)
}

/// Min, max and mean loudness of a profile in dBFS. The mean is the dB value
/// of the mean RMS, so it always lies between the extremes.
pub fn dynamics(profile: &EnergyProfile) -> Dynamics {
    if profile.is_empty() {
        return Dynamics {
            average_db: DB_FLOOR,
            min_db: DB_FLOOR,
            max_db: DB_FLOOR,
        };
    }

    let min = profile.values.iter().copied().fold(f32::MAX, f32::min);
    let max = profile.values.iter().copied().fold(0.0f32, f32::max);
    let mean = profile.values.iter().map(|&v| v as f64).sum::<f64>() / profile.len() as f64;

    let min_db = rms_to_db(min);
    let max_db = rms_to_db(max);
    Dynamics {
        average_db: rms_to_db(mean as f32).clamp(min_db, max_db),
        min_db,
        max_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_length_is_ceiling_of_windows() {
        // 882 samples per 20 ms window at 44.1 kHz
        for len in [1usize, 881, 882, 883, 44100, 44101] {
            let buffer = SampleBuffer::new(vec![0.25; len], 44100);
            let profile = build_energy_profile(&buffer, 20);
            assert_eq!(profile.window_size, 882);
            assert_eq!(profile.len(), (len + 881) / 882, "len {}", len);
            assert!(profile.values.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn short_last_window_uses_its_own_length() {
        // 10 samples per window at 1 kHz / 10 ms; last window has 2 samples
        let mut samples = vec![0.0; 10];
        samples.extend([0.5, 0.5]);
        let profile = build_energy_profile(&SampleBuffer::new(samples, 1000), 10);
        assert_eq!(profile.values, vec![0.0, 0.5]);
    }

    #[test]
    fn rms_of_square_wave() {
        let samples: Vec<f32> = (0..800).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let profile = build_energy_profile(&SampleBuffer::new(samples, 8000), 20);
        assert_eq!(profile.len(), 5);
        for v in &profile.values {
            assert!((v - 0.5).abs() < 1e-6);
        }
        assert!((profile.seconds_per_window() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn dynamics_are_ordered_and_finite() {
        let profile = EnergyProfile {
            values: vec![0.0, 0.1, 1.0, 0.01],
            window_size: 882,
            sample_rate: 44100,
        };
        let d = dynamics(&profile);
        assert_eq!(d.min_db, -100.0);
        assert_eq!(d.max_db, 0.0);
        assert!(d.min_db <= d.average_db && d.average_db <= d.max_db);
        assert!((d.range_db() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn silent_dynamics_sit_on_the_floor() {
        let buffer = SampleBuffer::new(vec![0.0; 4410], 44100);
        let d = dynamics(&build_energy_profile(&buffer, 20));
        assert_eq!(d.min_db, -100.0);
        assert_eq!(d.average_db, -100.0);
        assert_eq!(d.max_db, -100.0);
    }
}
