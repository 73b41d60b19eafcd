use std::path::Path;

use anyhow::Context;

/// Planar multi-channel audio plus the rate it was recorded at.
///
/// The caller owns the storage; every DSP function in this module reads a
/// `&SampleBuffer` and hands back a freshly allocated one.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub channels: Vec<Vec<f32>>, // one Vec per channel, all the same length
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self { channels, sample_rate }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { channels: vec![samples], sample_rate }
    }

    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    /// Average all channels down to one.
    pub fn to_mono(&self) -> Vec<f32> {
        let n = self.num_channels();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return self.channels[0].clone();
        }
        let scale = 1.0 / n as f32;
        (0..self.len())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
            .collect()
    }

    // Load a WAV file from disk, keeping its native rate and channel layout
    pub fn load_wav(path: &Path) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let num_channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        // interleaved -> planar
        let mut channels = vec![Vec::with_capacity(samples.len() / num_channels); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Ok(Self { channels, sample_rate: spec.sample_rate })
    }

    /// Change the sample rate by linear interpolation. Rates may be fractional.
    pub fn resampled(&self, source_rate: f64, target_rate: u32) -> SampleBuffer {
        SampleBuffer {
            channels: self
                .channels
                .iter()
                .map(|c| resample_linear(c, source_rate, target_rate as f64))
                .collect(),
            sample_rate: target_rate,
        }
    }
}

pub fn resample_linear(samples: &[f32], source_rate: f64, target_rate: f64) -> Vec<f32> {
    if source_rate == target_rate || source_rate <= 0.0 || target_rate <= 0.0 {
        return samples.to_vec();
    }
    let ratio = target_rate / source_rate;
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= samples.len().saturating_sub(1) { // edge case
            out.push(samples.last().copied().unwrap_or(0.0));
        } else {
            let a = samples[idx];
            let b = samples[idx + 1];
            out.push(a * (1.0 - frac) + b * frac); // blend via frac
        }
    }
    out
}
