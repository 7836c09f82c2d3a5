//! Global tempo from an energy profile.
//!
//! Onsets are local energy peaks above `mean + 1.5 * stddev`. Intervals
//! between consecutive onsets are bucketed to even window counts and the
//! most frequent bucket becomes the beat period.

use super::energy::EnergyProfile;
use super::features::TempoEstimate;
use crate::config::{AnalysisConfig, TempoCorrection};

const THRESHOLD_STDDEVS: f64 = 1.5;

/// Tempo estimate plus the intermediate values behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoAnalysis {
    pub estimate: TempoEstimate,
    pub onsets: Vec<usize>,
    pub raw_bpm: Option<f64>,
    pub winning_interval: Option<usize>,
}

pub fn estimate_tempo(profile: &EnergyProfile, config: &AnalysisConfig) -> TempoAnalysis {
    let onsets = detect_onsets(&profile.values);
    let intervals = inter_onset_intervals(&onsets);
    let histogram = interval_histogram(&intervals);

    let undetermined = |onsets: Vec<usize>| TempoAnalysis {
        estimate: TempoEstimate::Undetermined,
        onsets,
        raw_bpm: None,
        winning_interval: None,
    };

    let Some(bucket) = winning_interval(&histogram) else {
        log::debug!("Tempo undetermined: {} onset(s)", onsets.len());
        return undetermined(onsets);
    };

    let seconds_per_beat = bucket as f64 * profile.seconds_per_window();
    if !(seconds_per_beat > 0.0) {
        return undetermined(onsets);
    }
    let raw = 60.0 / seconds_per_beat;
    let corrected = correct_tempo_range(raw, config.tempo_range, config.tempo_correction);

    log::debug!(
        "Tempo: {} onsets, winning interval {} windows, raw {:.2} BPM, corrected {:.2} BPM",
        onsets.len(),
        bucket,
        raw,
        corrected
    );

    TempoAnalysis {
        estimate: TempoEstimate::Detected {
            bpm: corrected.round() as u32,
        },
        onsets,
        raw_bpm: Some(raw),
        winning_interval: Some(bucket),
    }
}

/// `mean + 1.5 * stddev` (population) of the profile.
pub fn onset_threshold(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    mean + THRESHOLD_STDDEVS * variance.sqrt()
}

/// Indices in `1..=len-2` that exceed the threshold, are strictly above the
/// left neighbour and not below the right one. Strictly increasing.
pub fn detect_onsets(values: &[f32]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    let threshold = onset_threshold(values);

    (1..values.len() - 1)
        .filter(|&i| {
            let v = values[i];
            v as f64 > threshold && v > values[i - 1] && v >= values[i + 1]
        })
        .collect()
}

pub fn inter_onset_intervals(onsets: &[usize]) -> Vec<usize> {
    onsets.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Rounds an interval to the nearest even window count, halves rounding up.
pub fn interval_bucket(interval: usize) -> usize {
    (interval + 1) / 2 * 2
}

/// `(bucket, count)` pairs in the order buckets first appear.
pub fn interval_histogram(intervals: &[usize]) -> Vec<(usize, usize)> {
    let mut histogram: Vec<(usize, usize)> = Vec::new();
    for &interval in intervals {
        let bucket = interval_bucket(interval);
        match histogram.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, count)) => *count += 1,
            None => histogram.push((bucket, 1)),
        }
    }
    histogram
}

/// Bucket with the highest count; the first-seen bucket keeps a tie.
pub fn winning_interval(histogram: &[(usize, usize)]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &(bucket, count) in histogram {
        if bucket == 0 {
            continue;
        }
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((bucket, count));
        }
    }
    best.map(|(bucket, _)| bucket)
}

/// Pulls `bpm` into `[min, max]` by octaves.
///
/// `Single` halves at most once and doubles at most once, so extreme values
/// can stay out of range. `Repeat` keeps going and always lands in range for
/// a range spanning at least an octave.
pub fn correct_tempo_range(bpm: f64, range: [f64; 2], mode: TempoCorrection) -> f64 {
    let [min, max] = range;
    if !(bpm > 0.0) || !bpm.is_finite() {
        return bpm;
    }
    let mut bpm = bpm;
    match mode {
        TempoCorrection::Single => {
            if bpm > max {
                bpm /= 2.0;
            }
            if bpm < min {
                bpm *= 2.0;
            }
        }
        TempoCorrection::Repeat => {
            while bpm > max {
                bpm /= 2.0;
            }
            while bpm < min {
                bpm *= 2.0;
            }
        }
    }
    bpm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::SampleBuffer;
    use crate::audio::energy::build_energy_profile;

    const RANGE: [f64; 2] = [60.0, 240.0];

    /// Short clicks every `period` seconds, first at `offset`, over faint noise.
    fn click_train(sample_rate: u32, secs: f64, offset: f64, period: f64) -> SampleBuffer {
        let n = (sample_rate as f64 * secs) as usize;
        let mut state = 12345u32;
        let mut samples: Vec<f32> = (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0) * 0.001
            })
            .collect();
        let click_len = (sample_rate / 1000) as usize;
        let mut t = offset;
        while t < secs {
            let start = (t * sample_rate as f64).round() as usize;
            for s in samples.iter_mut().skip(start).take(click_len) {
                *s = 0.9;
            }
            t += period;
        }
        SampleBuffer::new(samples, sample_rate)
    }

    #[test]
    fn click_train_at_120_bpm() {
        let buffer = click_train(44100, 6.0, 0.25, 0.5);
        let profile = build_energy_profile(&buffer, 20);
        let tempo = estimate_tempo(&profile, &AnalysisConfig::default());

        // 0.5 s = 25 windows of 20 ms, bucketed to 26
        assert_eq!(tempo.onsets.len(), 12);
        assert_eq!(tempo.winning_interval, Some(26));
        let bpm = tempo.estimate.bpm_or(0) as i64;
        assert!((bpm - 120).abs() <= 6, "got {} BPM", bpm);
    }

    #[test]
    fn click_train_on_even_bucket_is_exact() {
        // 0.6 s = 30 windows
        let buffer = click_train(44100, 6.0, 0.25, 0.6);
        let profile = build_energy_profile(&buffer, 20);
        let tempo = estimate_tempo(&profile, &AnalysisConfig::default());
        assert_eq!(tempo.estimate, TempoEstimate::Detected { bpm: 100 });
    }

    #[test]
    fn fast_clicks_are_halved_into_range() {
        // 0.2 s = 10 windows -> 300 BPM raw
        let buffer = click_train(44100, 4.0, 0.25, 0.2);
        let profile = build_energy_profile(&buffer, 20);
        let tempo = estimate_tempo(&profile, &AnalysisConfig::default());
        assert_eq!(tempo.raw_bpm.map(|b| b.round()), Some(300.0));
        assert_eq!(tempo.estimate, TempoEstimate::Detected { bpm: 150 });
    }

    #[test]
    fn silence_is_undetermined() {
        let buffer = SampleBuffer::new(vec![0.0; 44100 * 2], 44100);
        let profile = build_energy_profile(&buffer, 20);
        let tempo = estimate_tempo(&profile, &AnalysisConfig::default());
        assert_eq!(tempo.estimate, TempoEstimate::Undetermined);
        assert!(tempo.onsets.is_empty());
        assert_eq!(tempo.raw_bpm, None);
    }

    #[test]
    fn single_onset_is_undetermined() {
        let profile = EnergyProfile {
            values: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            window_size: 882,
            sample_rate: 44100,
        };
        let tempo = estimate_tempo(&profile, &AnalysisConfig::default());
        assert_eq!(tempo.onsets, vec![3]);
        assert_eq!(tempo.estimate, TempoEstimate::Undetermined);
    }

    #[test]
    fn plateau_yields_one_onset_at_its_start() {
        let values = [0.0, 0.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(detect_onsets(&values), vec![2]);
    }

    #[test]
    fn onsets_never_touch_the_edges() {
        let values = [9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.0];
        assert!(detect_onsets(&values).is_empty());

        let values: Vec<f32> = (0..200).map(|i| if i % 7 == 3 { 1.0 } else { 0.0 }).collect();
        let onsets = detect_onsets(&values);
        assert!(!onsets.is_empty());
        assert!(onsets.windows(2).all(|w| w[0] < w[1]));
        assert!(onsets.iter().all(|&i| i >= 1 && i <= values.len() - 2));
    }

    #[test]
    fn buckets_round_to_even() {
        assert_eq!(interval_bucket(1), 2);
        assert_eq!(interval_bucket(24), 24);
        assert_eq!(interval_bucket(25), 26);
        assert_eq!(inter_onset_intervals(&[3, 10, 12]), vec![7, 2]);
    }

    #[test]
    fn histogram_tie_keeps_first_seen_bucket() {
        let histogram = interval_histogram(&[4, 6, 6, 4]);
        assert_eq!(histogram, vec![(4, 2), (6, 2)]);
        assert_eq!(winning_interval(&histogram), Some(4));

        let histogram = interval_histogram(&[4, 6, 5, 6]);
        assert_eq!(winning_interval(&histogram), Some(6));
        assert_eq!(winning_interval(&[]), None);
    }

    #[test]
    fn single_correction_matches_reference() {
        assert_eq!(correct_tempo_range(300.0, RANGE, TempoCorrection::Single), 150.0);
        assert_eq!(correct_tempo_range(50.0, RANGE, TempoCorrection::Single), 100.0);
        assert_eq!(correct_tempo_range(120.0, RANGE, TempoCorrection::Single), 120.0);
        // Only one halving, still out of range
        assert_eq!(correct_tempo_range(1500.0, RANGE, TempoCorrection::Single), 750.0);
    }

    #[test]
    fn repeated_correction_always_lands_in_range() {
        assert_eq!(correct_tempo_range(1500.0, RANGE, TempoCorrection::Repeat), 187.5);
        assert_eq!(correct_tempo_range(10.0, RANGE, TempoCorrection::Repeat), 80.0);
        let mut bpm = 1.0;
        while bpm < 10_000.0 {
            let out = correct_tempo_range(bpm, RANGE, TempoCorrection::Repeat);
            assert!((60.0..=240.0).contains(&out), "{} -> {}", bpm, out);
            if bpm > 240.0 && bpm / 2.0 >= 60.0 && bpm / 2.0 <= 240.0 {
                assert_eq!(out, bpm / 2.0);
            }
            if bpm < 60.0 && bpm * 2.0 >= 60.0 && bpm * 2.0 <= 240.0 {
                assert_eq!(out, bpm * 2.0);
            }
            bpm *= 1.37;
        }
    }

    #[test]
    fn single_mode_is_selectable_from_config() {
        // Onsets 2 windows apart: 1500 BPM raw at 20 ms
        let mut values = vec![0.0f32; 100];
        for i in [50, 52, 54] {
            values[i] = 1.0;
        }
        let profile = EnergyProfile {
            values,
            window_size: 882,
            sample_rate: 44100,
        };
        let single = AnalysisConfig {
            tempo_correction: TempoCorrection::Single,
            ..Default::default()
        };
        assert_eq!(
            estimate_tempo(&profile, &single).estimate,
            TempoEstimate::Detected { bpm: 750 }
        );
        let repeated = estimate_tempo(&profile, &AnalysisConfig::default());
        assert_eq!(repeated.onsets, vec![50, 52, 54]);
        // 187.5 after three halvings
        assert!(matches!(
            repeated.estimate,
            TempoEstimate::Detected { bpm: 187 | 188 }
        ));
    }
}
