//! Onset detection for auto-slicing samples.
//!
//! Both modes first mark every candidate position independently of each
//! other, then accept candidates earliest-first with a minimum spacing.
//! Because the candidate set only grows as the threshold drops, and greedy
//! earliest-first picks the largest spaced subset, a lower threshold can never
//! yield fewer onsets.

use super::sample_buffer::SampleBuffer;

const PEAK_RELEASE_MS: f64 = 50.0;
const RMS_WINDOW_MS: f64 = 10.0;
const RMS_NOISE_FLOOR: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionMode {
    /// Sample magnitude jumping above a decaying peak envelope.
    Peak,
    /// Short-window energy rising between consecutive frames.
    Rms,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransientOptions {
    pub threshold: f32,       // 0..1, higher = fewer onsets
    pub min_distance_ms: f64, // no two onsets closer than this
    pub mode: DetectionMode,
}

impl Default for TransientOptions {
    fn default() -> Self {
        Self { threshold: 0.3, min_distance_ms: 50.0, mode: DetectionMode::Peak }
    }
}

/// Onset positions as strictly increasing fractions of the buffer in `[0, 1)`.
///
/// `None` or an empty slice is not an error, it just has no onsets.
pub fn detect_transients(
    samples: Option<&[f32]>,
    sample_rate: u32,
    opts: TransientOptions,
) -> Vec<f64> {
    let samples = match samples {
        Some(s) if !s.is_empty() && sample_rate > 0 => s,
        _ => return Vec::new(),
    };
    let threshold = opts.threshold.clamp(0.0, 1.0);
    let candidates = match opts.mode {
        DetectionMode::Peak => peak_candidates(samples, sample_rate, threshold),
        DetectionMode::Rms => rms_candidates(samples, sample_rate, threshold),
    };
    let min_gap = (opts.min_distance_ms.max(0.0) * sample_rate as f64 / 1000.0).ceil() as usize;
    let len = samples.len() as f64;
    accept_spaced(&candidates, min_gap)
        .into_iter()
        .map(|i| i as f64 / len)
        .collect()
}

/// Downmix and detect in one go.
pub fn detect_buffer(buffer: Option<&SampleBuffer>, opts: TransientOptions) -> Vec<f64> {
    match buffer {
        Some(b) => {
            let mono = b.to_mono();
            detect_transients(Some(mono.as_slice()), b.sample_rate, opts)
        }
        None => Vec::new(),
    }
}

fn peak_candidates(samples: &[f32], sample_rate: u32, threshold: f32) -> Vec<usize> {
    let release = (-1.0 / (PEAK_RELEASE_MS * 0.001 * sample_rate as f64)).exp() as f32;
    let mut env = 0.0_f32;
    let mut out = Vec::new();
    for (i, &s) in samples.iter().enumerate() {
        let mag = s.abs();
        let floor = env.min(1.0);
        if mag > floor + threshold * (1.0 - floor) {
            out.push(i);
        }
        env = mag.max(env * release);
    }
    out
}

fn rms_candidates(samples: &[f32], sample_rate: u32, threshold: f32) -> Vec<usize> {
    let window = ((RMS_WINDOW_MS * 0.001 * sample_rate as f64) as usize).max(2);
    let hop = (window / 2).max(1);
    let frames: Vec<(usize, f32)> = (0..samples.len())
        .step_by(hop)
        .map(|start| {
            let end = (start + window).min(samples.len());
            let chunk = &samples[start..end];
            let energy = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
            (start, energy.sqrt())
        })
        .collect();
    let max_rms = frames.iter().fold(0.0_f32, |m, &(_, r)| m.max(r));
    if max_rms <= RMS_NOISE_FLOOR {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut prev = 0.0_f32; // silence before the buffer
    for &(start, rms) in &frames {
        if rms > RMS_NOISE_FLOOR && rms - prev > threshold * max_rms {
            out.push(start);
        }
        prev = rms;
    }
    out
}

fn accept_spaced(candidates: &[usize], min_gap: usize) -> Vec<usize> {
    let mut accepted: Vec<usize> = Vec::new();
    for &c in candidates {
        match accepted.last() {
            Some(&last) if c <= last || c - last < min_gap => {}
            _ => accepted.push(c),
        }
    }
    accepted
}

/// Map onsets onto an `slots`-wide slice grid.
///
/// Each onset goes to its nearest slot; when several land on one slot the one
/// closest to the slot's grid line wins. Empty slots are `None`.
pub fn bucket_onsets(onsets: &[f64], slots: usize) -> Vec<Option<f64>> {
    let mut grid: Vec<Option<f64>> = vec![None; slots];
    if slots == 0 {
        return grid;
    }
    for &pos in onsets {
        let scaled = pos.clamp(0.0, 1.0) * slots as f64;
        let slot = (scaled.round() as usize).min(slots - 1);
        let dist = (scaled - slot as f64).abs();
        let keep = match grid[slot] {
            Some(existing) => dist < (existing * slots as f64 - slot as f64).abs(),
            None => true,
        };
        if keep {
            grid[slot] = Some(pos);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    // decaying noise-free clicks at the given sample offsets
    fn clicks(len: usize, at: &[usize]) -> Vec<f32> {
        let mut data = vec![0.0_f32; len];
        for &start in at {
            for k in 0..2_000 {
                if let Some(s) = data.get_mut(start + k) {
                    let decay = (-(k as f32) / 300.0).exp();
                    *s += 0.9 * decay * if k % 2 == 0 { 1.0 } else { -1.0 };
                }
            }
        }
        data
    }

    #[test]
    fn absent_buffer_has_no_onsets() {
        assert!(detect_transients(None, RATE, TransientOptions::default()).is_empty());
        assert!(detect_transients(Some(&[][..]), RATE, TransientOptions::default()).is_empty());
        assert!(detect_buffer(None, TransientOptions::default()).is_empty());
    }

    #[test]
    fn finds_clicks_in_peak_mode() {
        let data = clicks(RATE as usize, &[0, 11_025, 22_050, 33_075]);
        let onsets = detect_transients(Some(data.as_slice()), RATE, TransientOptions::default());
        assert_eq!(onsets.len(), 4, "{onsets:?}");
        for (found, want) in onsets.iter().zip([0.0, 0.25, 0.5, 0.75]) {
            assert!((found - want).abs() < 0.01, "{found} vs {want}");
        }
    }

    #[test]
    fn finds_clicks_in_rms_mode() {
        let data = clicks(RATE as usize, &[4_410, 22_050]);
        let opts = TransientOptions { mode: DetectionMode::Rms, ..TransientOptions::default() };
        let onsets = detect_transients(Some(data.as_slice()), RATE, opts);
        assert_eq!(onsets.len(), 2, "{onsets:?}");
        assert!((onsets[0] - 0.1).abs() < 0.01);
        assert!((onsets[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn onsets_respect_min_distance() {
        let data = clicks(RATE as usize, &[0, 1_000, 3_000, 10_000, 10_500, 30_000]);
        for min_ms in [0.0, 10.0, 30.0, 100.0, 400.0] {
            for mode in [DetectionMode::Peak, DetectionMode::Rms] {
                let opts = TransientOptions { threshold: 0.1, min_distance_ms: min_ms, mode };
                let onsets = detect_transients(Some(data.as_slice()), RATE, opts);
                let min_frac = min_ms / 1000.0 * RATE as f64 / data.len() as f64;
                for pair in onsets.windows(2) {
                    assert!(pair[1] > pair[0]);
                    assert!(pair[1] - pair[0] >= min_frac - 1e-9, "{mode:?} {min_ms}: {pair:?}");
                }
            }
        }
    }

    #[test]
    fn lower_threshold_never_loses_onsets() {
        let mut data = clicks(RATE as usize, &[0, 5_000, 9_000, 20_000, 31_000]);
        // some quieter hits in between
        for (i, s) in data.iter_mut().enumerate().skip(14_000).take(400) {
            *s += 0.2 * if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        for mode in [DetectionMode::Peak, DetectionMode::Rms] {
            let mut last = usize::MAX;
            for step in 0..=10 {
                let threshold = 1.0 - step as f32 / 10.0;
                let opts = TransientOptions { threshold, min_distance_ms: 20.0, mode };
                let count = detect_transients(Some(data.as_slice()), RATE, opts).len();
                if last != usize::MAX {
                    assert!(count >= last, "{mode:?} threshold {threshold}: {count} < {last}");
                }
                last = count;
            }
        }
    }

    #[test]
    fn buckets_to_nearest_slot() {
        let grid = bucket_onsets(&[0.0, 0.26, 0.22, 0.6, 0.9, 0.97], 4);
        assert_eq!(grid, vec![Some(0.0), Some(0.26), Some(0.6), Some(0.9)]);
        assert_eq!(bucket_onsets(&[0.1], 4), vec![Some(0.1), None, None, None]);
        assert!(bucket_onsets(&[0.5], 0).is_empty());
    }
}
