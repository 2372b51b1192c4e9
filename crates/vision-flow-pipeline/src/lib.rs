//! End-to-end flow-to-depth pipeline.
//!
//! Turns a grayscale frame stack from a translating camera into dense
//! Lucas-Kanade flow, the epipole (focus of expansion), and a normalized
//! relative depth map.
//!
//! ## Session API
//!
//! The session API uses a mutable state container with step functions.
//!
//! ```no_run
//! use vision_flow_pipeline::{FlowDepthSession, step_depth, step_epipole, step_flow, step_gradients};
//! # fn main() -> anyhow::Result<()> {
//! # let frames: vision_flow_core::FrameVolume = unimplemented!();
//!
//! let mut session = FlowDepthSession::new();
//! session.set_input(frames, vision_flow_core::Mat3::identity())?;
//!
//! step_gradients(&mut session)?;
//! step_flow(&mut session)?;
//! step_epipole(&mut session)?;
//! step_depth(&mut session)?;
//!
//! let json = session.export_json()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## One-shot
//!
//! [`run_flow_depth`] runs every step on a fresh session and returns the
//! [`FlowDepthEstimate`].

pub mod config;
pub mod estimate;
pub mod session;
pub mod steps;

pub use crate::config::{EpipoleConfig, FlowDepthConfig};
pub use crate::estimate::{FlowDepthEstimate, FlowDepthReport};
pub use crate::session::{FlowDepthInput, FlowDepthSession, FlowDepthState, LogEntry};
pub use crate::steps::{
    run_flow_depth, run_session, step_depth, step_epipole, step_flow, step_gradients,
};

// Re-export from vision-flow-core for convenience
pub use vision_flow_core::{FlowField, FrameVolume, FxFyCxCySkew, Map2, Mat3, Vec3};
