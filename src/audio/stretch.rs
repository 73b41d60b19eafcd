//! Duration change without pitch change, by granular overlap-add.
//!
//! Grains of `grain_size` samples are read from the source, tapered at both
//! ends and summed into the output every `hop = grain * (1 - overlap)`
//! samples. The output hop is fixed; the source read head moves
//! `hop * ratio` per grain, so the output ends up `1 / ratio` times as long
//! while every grain keeps its original playback speed (and therefore its
//! pitch). Each output sample is divided by the window weight that landed on
//! it, so any overlap keeps unity gain.

use std::f32::consts::PI;

use super::sample_buffer::SampleBuffer;

pub const MIN_RATIO: f32 = 0.25;
pub const MAX_RATIO: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StretchParams {
    pub grain_size: usize,
    pub overlap_ratio: f32,
    /// Playback speed: 2.0 halves the duration, 0.5 doubles it.
    pub ratio: f32,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self { grain_size: 2048, overlap_ratio: 0.5, ratio: 1.0 }
    }
}

impl StretchParams {
    pub fn with_ratio(ratio: f32) -> Self {
        Self { ratio, ..Self::default() }
    }

    fn clamped(self) -> Self {
        Self {
            grain_size: self.grain_size.max(16),
            overlap_ratio: self.overlap_ratio.clamp(0.05, 0.95),
            ratio: if self.ratio.is_finite() {
                self.ratio.clamp(MIN_RATIO, MAX_RATIO)
            } else {
                1.0
            },
        }
    }
}

pub fn output_len(input_len: usize, ratio: f32) -> usize {
    (input_len as f64 / ratio.clamp(MIN_RATIO, MAX_RATIO) as f64).round() as usize
}

/// Stretch every channel of `input`; the sample rate is carried over unchanged.
pub fn time_stretch(input: &SampleBuffer, params: StretchParams) -> SampleBuffer {
    let params = params.clamped();
    let mut out = SampleBuffer {
        channels: input
            .channels
            .iter()
            .map(|c| stretch_channel(c, &params))
            .collect(),
        sample_rate: input.sample_rate,
    };

    // overlapping grains can sum past full scale
    let peak = out.peak();
    if peak > 1.0 {
        let gain = 1.0 / peak;
        for ch in &mut out.channels {
            for s in ch.iter_mut() {
                *s *= gain;
            }
        }
    }
    out
}

fn stretch_channel(input: &[f32], params: &StretchParams) -> Vec<f32> {
    let out_len = output_len(input.len(), params.ratio);
    let mut out = vec![0.0_f32; out_len];
    if input.is_empty() || out_len == 0 {
        return out;
    }

    let grain = params.grain_size;
    let hop = hop_size(params);
    // past half overlap the tapers can't get any longer; more grains stack up instead
    let fade = ((grain as f32 * params.overlap_ratio).round() as usize).clamp(1, grain / 2);
    let window = grain_window(grain, fade);
    let src_hop = hop as f64 * params.ratio as f64;

    let mut weight = vec![0.0_f32; out_len];
    let mut out_pos = 0usize;
    let mut src_pos = 0.0_f64;
    while out_pos < out_len {
        let src_start = src_pos.round() as usize;
        for (j, &w) in window.iter().enumerate() {
            let o = out_pos + j;
            if o >= out_len {
                break;
            }
            if let Some(&s) = input.get(src_start + j) {
                out[o] += s * w;
            }
            weight[o] += w;
        }
        out_pos += hop;
        src_pos += src_hop;
    }

    for (s, &w) in out.iter_mut().zip(&weight) {
        if w > WEIGHT_FLOOR {
            *s /= w;
        }
    }
    out
}

// below this the taper is all but silent; leave those samples as they are
const WEIGHT_FLOOR: f32 = 1e-3;

// output samples between grain starts
fn hop_size(params: &StretchParams) -> usize {
    let params = params.clamped();
    ((params.grain_size as f32 * (1.0 - params.overlap_ratio)).round() as usize).max(1)
}

// raised-cosine fade in over the first `fade` samples, flat, then a mirrored fade out
fn grain_window(grain: usize, fade: usize) -> Vec<f32> {
    (0..grain)
        .map(|j| {
            if j < fade {
                hann_rise(j, fade)
            } else if j >= grain - fade {
                hann_rise(grain - 1 - j, fade)
            } else {
                1.0
            }
        })
        .collect()
}

fn hann_rise(j: usize, fade: usize) -> f32 {
    let x = (j as f32 + 0.5) / fade as f32; // (0, 1)
    0.5 - 0.5 * (PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, freq: f32, rate: u32) -> SampleBuffer {
        let data = (0..len)
            .map(|i| 0.8 * (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect();
        SampleBuffer::mono(data, rate)
    }

    #[test]
    fn output_length_follows_ratio() {
        let buf = sine(10_000, 440.0, 44_100);
        for ratio in [0.25_f32, 0.5, 0.8, 1.0, 1.5, 2.0, 4.0] {
            let out = time_stretch(&buf, StretchParams::with_ratio(ratio));
            let expected = (10_000.0 / ratio as f64).round() as usize;
            let got = out.len();
            assert!(got.abs_diff(expected) <= 1, "ratio {ratio}: {got} vs {expected}");
            assert_eq!(out.sample_rate, 44_100);
        }
    }

    #[test]
    fn ratio_is_clamped() {
        let buf = sine(4_000, 220.0, 44_100);
        assert_eq!(time_stretch(&buf, StretchParams::with_ratio(100.0)).len(), 1_000);
        assert_eq!(time_stretch(&buf, StretchParams::with_ratio(0.01)).len(), 16_000);
    }

    #[test]
    fn stretch_and_back_restores_length() {
        let buf = sine(9_001, 330.0, 48_000);
        for ratio in [0.3_f32, 0.5, 1.7, 3.0] {
            let there = time_stretch(&buf, StretchParams::with_ratio(ratio));
            let back = time_stretch(&there, StretchParams::with_ratio(1.0 / ratio));
            assert!(back.len().abs_diff(buf.len()) <= 1, "ratio {ratio}: {}", back.len());
        }
    }

    #[test]
    fn never_exceeds_full_scale() {
        let loud = SampleBuffer::mono(vec![1.0; 20_000], 44_100);
        let params = StretchParams { overlap_ratio: 0.9, ..StretchParams::with_ratio(0.5) };
        let out = time_stretch(&loud, params);
        assert!(out.peak() <= 1.0 + 1e-6);
    }

    #[test]
    fn overlapping_fades_sum_to_unity() {
        let w = grain_window(2048, 1024);
        let hop = 1024;
        for j in 0..hop {
            let sum = w[j + hop] + w[j];
            assert!((sum - 1.0).abs() < 1e-5, "j={j} sum={sum}");
        }
    }

    #[test]
    fn hop_follows_overlap_past_one_half() {
        let at = |overlap_ratio| {
            hop_size(&StretchParams { overlap_ratio, ..StretchParams::default() })
        };
        assert_eq!(at(0.5), 1024);
        assert_eq!(at(0.75), 512);
        assert_eq!(at(0.9), 205);
        assert_eq!(at(0.99), 102); // clamped to 0.95
    }

    #[test]
    fn high_overlap_keeps_level() {
        let flat = SampleBuffer::mono(vec![0.5; 20_000], 44_100);
        for overlap_ratio in [0.25, 0.5, 0.75, 0.9] {
            let params = StretchParams { overlap_ratio, ..StretchParams::with_ratio(0.5) };
            let out = time_stretch(&flat, params);
            let mid = &out.channels[0][5_000..30_000];
            assert!(mid.iter().all(|s| (s - 0.5).abs() < 1e-4), "overlap {overlap_ratio}");
        }
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let empty = SampleBuffer::mono(Vec::new(), 44_100);
        let out = time_stretch(&empty, StretchParams::with_ratio(2.0));
        assert!(out.is_empty());
    }

    #[test]
    fn works_per_channel() {
        let buf = SampleBuffer::new(vec![vec![0.5; 5_000], vec![-0.5; 5_000]], 44_100);
        let out = time_stretch(&buf, StretchParams::with_ratio(2.0));
        assert_eq!(out.num_channels(), 2);
        assert_eq!(out.channels[0].len(), 2_500);
        assert_eq!(out.channels[1].len(), 2_500);
    }
}
