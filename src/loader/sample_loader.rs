use std::path::Path;

use tracing::debug;

use crate::audio::{bucket_onsets, detect_buffer, SampleBuffer, TransientOptions};

/// A sample plus the slice grid a `sample` track indexes with `slice_index`.
#[derive(Clone, Debug)]
pub struct SlicedSample {
    pub buffer: SampleBuffer,
    pub onsets: Vec<f64>,
    pub slices: Vec<Option<f64>>,
}

// Load a WAV from disk and bring it to the rate we work at
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<SampleBuffer> {
    let buffer = SampleBuffer::load_wav(path)?;
    if buffer.sample_rate == target_rate {
        return Ok(buffer);
    }
    Ok(buffer.resampled(buffer.sample_rate as f64, target_rate))
}

// Load and auto-slice: detect onsets, then snap them to `slots` slices
pub fn load_sliced(
    path: &Path,
    target_rate: u32,
    opts: TransientOptions,
    slots: usize,
) -> anyhow::Result<SlicedSample> {
    let buffer = load(path, target_rate)?;
    let onsets = detect_buffer(Some(&buffer), opts);
    let slices = bucket_onsets(&onsets, slots);
    debug!(path = %path.display(), onsets = onsets.len(), slots, "sliced sample");
    Ok(SlicedSample { buffer, onsets, slices })
}
