//! Serializable pipeline output.

use serde::{Deserialize, Serialize};
use vision_flow_core::{FlowField, Map2, Pt2, Real, Vec3, from_homogeneous};

/// Counts and diagnostics gathered along the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDepthReport {
    /// Frame the flow was solved on.
    pub frame_index: usize,
    pub patch_size: usize,
    /// Pixels with confidence above the epipole threshold.
    pub epipole_candidates: usize,
    /// Pixels used in the epipole solve after subsampling.
    pub epipole_points: usize,
    /// Smallest singular value of the epipole system.
    pub epipole_residual: Real,
    /// Pixels with a positive depth after clipping.
    pub depth_pixels: usize,
}

/// Flow, epipole and depth recovered from one frame stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDepthEstimate {
    pub flow: FlowField,
    /// Smallest singular value of each pixel's patch system.
    pub confidence: Map2,
    /// Homogeneous epipole relative to the image center.
    pub epipole_centered: Vec3,
    /// Homogeneous epipole in pixel coordinates.
    pub epipole_pixel: Vec3,
    /// Relative depth in `[0, 1]`, `0` where rejected.
    pub depth: Map2,
    pub report: FlowDepthReport,
}

impl FlowDepthEstimate {
    /// Epipole as an image point, or `None` when it lies at infinity.
    pub fn epipole_point(&self) -> Option<Pt2> {
        let e = &self.epipole_pixel;
        (e.z.abs() > 1e-12).then(|| from_homogeneous(e))
    }
}
