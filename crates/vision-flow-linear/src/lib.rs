//! Closed-form motion and structure solvers.
//!
//! The pipeline stages, leaves first:
//!
//! 1. [`gradient`]: `Ix`, `Iy`, `It` volumes from separable 7-tap filters.
//! 2. [`lucas_kanade`]: per-patch least-squares flow with a singular-value
//!    confidence, and its dense per-pixel version.
//! 3. [`epipole`]: homogeneous least-squares focus of expansion from
//!    confident flow vectors, subsampled reproducibly.
//! 4. [`depth`]: relative depth for a purely translating camera,
//!    outlier-clipped and normalized to `[0, 1]`.
//!
//! Every function is a pure transform of its inputs and returns
//! [`FlowError`](vision_flow_core::FlowError) on shape mismatches or
//! undefined arithmetic.
//!
//! # Example
//!
//! ```
//! use vision_flow_core::FrameVolume;
//! use vision_flow_linear::prelude::*;
//!
//! let frames = FrameVolume::from_fn(16, 16, 3, |y, x, t| {
//!     ((x as f64 - 0.5 * t as f64) * 0.4).sin() * 40.0 + ((y as f64) * 0.3).cos() * 40.0
//! });
//! let grads = compute_gradients(&frames);
//! let slice = grads.slice(1)?;
//! let dense = flow_lk(&slice.ix, &slice.iy, &slice.it, DEFAULT_PATCH_SIZE)?;
//! assert_eq!(dense.flow.shape(), (16, 16));
//! # Ok::<(), vision_flow_core::FlowError>(())
//! ```

pub mod depth;
pub mod epipole;
pub mod gradient;
pub mod lucas_kanade;

pub use depth::{DEFAULT_DEPTH_THRESHOLD, OUTLIER_SIGMAS, depth};
pub use epipole::{
    EPIPOLE_SEED, EpipoleEstimate, EpipoleEstimator, EpipoleOptions, MAX_EPIPOLE_POINTS,
    epipole_to_pixel, estimate_epipole,
};
pub use gradient::{
    GradientSlice, Gradients, KERNEL_G, KERNEL_H, compute_gradients, compute_it, compute_ix,
    compute_iy, convolve_axis,
};
pub use lucas_kanade::{
    DEFAULT_PATCH_SIZE, DenseFlow, PatchFlow, flow_lk, flow_lk_patch, flow_lk_slice,
};

/// Convenience re-exports of every solver entry point.
pub mod prelude {
    pub use crate::depth::*;
    pub use crate::epipole::*;
    pub use crate::gradient::*;
    pub use crate::lucas_kanade::*;
}
