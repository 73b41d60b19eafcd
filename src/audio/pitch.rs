//! Pitch change without duration change.
//!
//! Playing a buffer back at `rate * r` raises its pitch by `r` but also
//! shortens it by `r`. We undo the shortening up front: stretch the buffer so
//! it lasts `r` times longer (grains keep their pitch), then resample it from
//! `rate * r` back down to `rate`. The net result is the original length with
//! every frequency multiplied by `r`.

use super::sample_buffer::SampleBuffer;
use super::stretch::{time_stretch, StretchParams, MAX_RATIO, MIN_RATIO};

const IDENTITY_EPSILON: f32 = 1e-3;

pub fn pitch_ratio(semitones: f32, cents: f32) -> f32 {
    (2.0_f32.powf(semitones / 12.0) * 2.0_f32.powf(cents / 1200.0)).clamp(MIN_RATIO, MAX_RATIO)
}

pub fn pitch_shift(input: &SampleBuffer, semitones: f32, cents: f32) -> SampleBuffer {
    pitch_shift_with(input, semitones, cents, StretchParams::default())
}

/// Same as [`pitch_shift`] with explicit grain settings; `grain.ratio` is ignored.
pub fn pitch_shift_with(
    input: &SampleBuffer,
    semitones: f32,
    cents: f32,
    grain: StretchParams,
) -> SampleBuffer {
    let ratio = pitch_ratio(semitones, cents);
    if (ratio - 1.0).abs() < IDENTITY_EPSILON || input.is_empty() {
        return input.clone();
    }

    let original_len = input.len();
    let original_rate = input.sample_rate;
    let shifted_rate = original_rate as f64 * ratio as f64;

    // 1 + 2: treat the samples as if recorded at the shifted rate, and make
    // them last `ratio` times longer so the rate change won't shorten them
    let stretched = time_stretch(input, StretchParams { ratio: 1.0 / ratio, ..grain });

    // 3: back to the caller's rate
    let mut out = stretched.resampled(shifted_rate, original_rate);
    for ch in &mut out.channels {
        ch.resize(original_len, 0.0); // rounding can leave us a sample off
    }
    out
}
