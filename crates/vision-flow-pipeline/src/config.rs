//! Configuration for the flow-to-depth pipeline.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use vision_flow_core::Real;
use vision_flow_linear::prelude::*;

/// Epipole solve options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpipoleConfig {
    /// Seed of the subsampling permutation.
    pub seed: u32,
    /// Maximum number of flow vectors kept.
    pub max_points: usize,
    /// Scale centered coordinates to unit RMS before the solve.
    pub normalize: bool,
}

impl Default for EpipoleConfig {
    fn default() -> Self {
        Self {
            seed: EPIPOLE_SEED,
            max_points: MAX_EPIPOLE_POINTS,
            normalize: true,
        }
    }
}

/// Configuration for [`run_flow_depth`](crate::run_flow_depth).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowDepthConfig {
    /// Side length of the Lucas-Kanade patch (odd).
    pub patch_size: usize,

    /// Frame whose gradients feed the flow solve. `None` selects the middle
    /// frame `N / 2`.
    pub frame_index: Option<usize>,

    /// Confidence a flow vector needs to enter the epipole solve.
    pub epipole_threshold: Real,

    pub epipole: EpipoleConfig,

    /// Confidence a pixel needs to receive a depth.
    pub depth_threshold: Real,
}

impl Default for FlowDepthConfig {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            frame_index: None,
            epipole_threshold: DEFAULT_DEPTH_THRESHOLD,
            epipole: EpipoleConfig::default(),
            depth_threshold: DEFAULT_DEPTH_THRESHOLD,
        }
    }
}

impl FlowDepthConfig {
    /// Check option ranges that do not depend on the input.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.patch_size % 2 == 1,
            "patch_size must be odd, got {}",
            self.patch_size
        );
        ensure!(
            self.epipole_threshold.is_finite(),
            "epipole_threshold must be finite"
        );
        ensure!(
            self.depth_threshold.is_finite(),
            "depth_threshold must be finite"
        );
        ensure!(
            self.epipole.max_points >= 2,
            "epipole.max_points must be at least 2, got {}",
            self.epipole.max_points
        );
        Ok(())
    }

    /// Frame used for the flow solve in a sequence of `frames` frames.
    pub fn resolve_frame(&self, frames: usize) -> Result<usize> {
        ensure!(frames > 0, "frame volume is empty");
        let t = self.frame_index.unwrap_or(frames / 2);
        ensure!(
            t < frames,
            "frame_index {t} out of range for {frames} frames"
        );
        Ok(t)
    }

    /// Convert to linear-solver epipole options.
    pub fn epipole_opts(&self) -> EpipoleOptions {
        EpipoleOptions {
            seed: self.epipole.seed,
            max_points: self.epipole.max_points,
            normalize: self.epipole.normalize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_solver_constants() {
        let cfg = FlowDepthConfig::default();
        assert_eq!(cfg.patch_size, 5);
        assert_eq!(cfg.depth_threshold, 10.0);
        assert_eq!(cfg.epipole_opts(), EpipoleOptions::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_round_trip_and_partial_documents() {
        let cfg = FlowDepthConfig {
            patch_size: 7,
            frame_index: Some(2),
            epipole_threshold: 4.5,
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: FlowDepthConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        let partial: FlowDepthConfig = serde_json::from_str(r#"{ "patch_size": 3 }"#).unwrap();
        assert_eq!(partial.patch_size, 3);
        assert_eq!(partial.depth_threshold, 10.0);
        assert_eq!(partial.epipole.seed, 10);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let even = FlowDepthConfig {
            patch_size: 4,
            ..Default::default()
        };
        assert!(even.validate().is_err());

        let nan = FlowDepthConfig {
            depth_threshold: Real::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn frame_resolution() {
        let cfg = FlowDepthConfig::default();
        assert_eq!(cfg.resolve_frame(7).unwrap(), 3);
        assert_eq!(cfg.resolve_frame(2).unwrap(), 1);
        assert!(cfg.resolve_frame(0).is_err());

        let fixed = FlowDepthConfig {
            frame_index: Some(5),
            ..Default::default()
        };
        assert!(fixed.resolve_frame(5).is_err());
    }
}
