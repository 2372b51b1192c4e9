//! Deterministic synthetic data generation helpers.
//!
//! Small building blocks for constructing frame sequences with known motion:
//! procedural textures, translating and forward-moving cameras, and
//! reproducible intensity noise. Used by tests across the workspace.

mod noise;
mod scene;
mod texture;

pub use noise::IntensityNoise;
pub use scene::{DepthProfile, ForwardMotionScene, TranslatingScene};
pub use texture::{SinusoidTexture, Wave};
