// Everything the external renderer ever hears from us. The renderer owns
// voices and output; we only tell it what to play and at what absolute
// clock time.

pub use crate::pipeline::{TrackKind, TrackParams, Waveform};

/// How a trigger treats the envelope of whatever the track is already playing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnvelopeMode {
    Retrigger,
    /// Glide from `from_pitch` into the trigger's pitch without restarting the envelope.
    Slide { from_pitch: f32 },
    /// Keep the previous note sounding.
    Tie,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TriggerParams {
    pub track: usize,
    pub kind: TrackKind,
    pub step: usize,
    pub time_ms: f64, // absolute, on the engine clock; never a relative delay
    pub velocity: u8,
    pub params: TrackParams, // base params with this step's locks merged in
    pub waveform: Waveform,
    pub reverse: bool,
    pub envelope: EnvelopeMode,
    pub accent: bool,
    pub ratchet_index: u8, // 0-based within the step
    pub ratchet_count: u8,
    pub slice_index: Option<u16>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioCommand {
    Trigger(TriggerParams),

    // Anything already queued at or after this time should be dropped. Sent
    // on pause/stop since the lookahead has already handed out future triggers.
    CancelFrom { time_ms: f64 },

    SetMasterVolume(f32),
}
