// Offline sample processing. None of this runs on the sequencing path: every
// function takes an immutable buffer and returns a new one, so it's fine to
// call from any thread while the scheduler keeps ticking.

mod pitch;
mod sample_buffer;
mod stretch;
mod transient;

pub use pitch::{pitch_ratio, pitch_shift, pitch_shift_with};
pub use sample_buffer::{resample_linear, SampleBuffer};
pub use stretch::{output_len as stretched_len, time_stretch, StretchParams};
pub use transient::{
    bucket_onsets, detect_buffer, detect_transients, DetectionMode, TransientOptions,
};
