mod interpolator;

pub use interpolator::{
    commit_discrete, ease_in_out_cubic, interpolate, MorphFrame, SceneInterpolator,
};
