//! Frame sequences with known ground-truth motion.
//!
//! Frames are sampled analytically from a [`SinusoidTexture`], so no
//! interpolation error enters the sequences. Time is centered: for `N`
//! frames, frame `t` sits at `t - (N - 1) / 2`, so the middle frame of an odd
//! sequence shows the texture undisplaced.

use serde::{Deserialize, Serialize};

use super::SinusoidTexture;
use crate::{FlowField, FrameVolume, Map2, Pt2, Real, Vec2};

#[inline]
fn centered_time(t: usize, frames: usize) -> Real {
    t as Real - (frames as Real - 1.0) * 0.5
}

/// A texture sliding by a constant `flow` (pixels per frame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatingScene {
    pub texture: SinusoidTexture,
    pub flow: Vec2,
}

impl TranslatingScene {
    /// Render `frames` frames of size `height x width`.
    pub fn render(&self, height: usize, width: usize, frames: usize) -> FrameVolume {
        FrameVolume::from_fn(height, width, frames, |y, x, t| {
            let s = centered_time(t, frames);
            self.texture
                .eval(x as Real - self.flow.x * s, y as Real - self.flow.y * s)
        })
    }
}

/// Depth as a function of image position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DepthProfile {
    /// Fronto-parallel plane.
    Constant(Real),
    /// Depth varying linearly with the column, from `left` at `x = 0` to
    /// `right` at `x = width - 1`.
    ColumnRamp { left: Real, right: Real },
}

impl DepthProfile {
    pub fn depth_at(&self, x: Real, width: usize) -> Real {
        match *self {
            DepthProfile::Constant(z) => z,
            DepthProfile::ColumnRamp { left, right } => {
                let span = (width.max(2) - 1) as Real;
                left + (right - left) * x / span
            }
        }
    }
}

/// Camera translating along its optical axis in front of a textured surface.
///
/// Every image point moves away from `epipole` with flow
/// `(p - e) * speed / Z(p)`, the first-order motion field of a forward
/// translation with unit focal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardMotionScene {
    pub texture: SinusoidTexture,
    /// Focus of expansion in pixel coordinates.
    pub epipole: Pt2,
    /// Forward displacement per frame, in depth units.
    pub speed: Real,
    pub depth: DepthProfile,
}

impl ForwardMotionScene {
    /// Render `frames` frames of size `height x width`.
    pub fn render(&self, height: usize, width: usize, frames: usize) -> FrameVolume {
        FrameVolume::from_fn(height, width, frames, |y, x, t| {
            let s = centered_time(t, frames);
            let (px, py) = (x as Real, y as Real);
            let rate = self.speed / self.depth.depth_at(px, width);
            let scale = 1.0 - s * rate;
            self.texture.eval(
                self.epipole.x + (px - self.epipole.x) * scale,
                self.epipole.y + (py - self.epipole.y) * scale,
            )
        })
    }

    /// Ground-truth flow at the reference (undisplaced) frame.
    pub fn true_flow(&self, height: usize, width: usize) -> FlowField {
        let mut flow = FlowField::zeros(height, width);
        for y in 0..height {
            for x in 0..width {
                let (px, py) = (x as Real, y as Real);
                let rate = self.speed / self.depth.depth_at(px, width);
                flow.set(
                    y,
                    x,
                    Vec2::new((px - self.epipole.x) * rate, (py - self.epipole.y) * rate),
                );
            }
        }
        flow
    }

    /// Ground-truth depth map.
    pub fn true_depth(&self, height: usize, width: usize) -> Map2 {
        Map2::from_fn(height, width, |_, x| self.depth.depth_at(x as Real, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture() -> SinusoidTexture {
        SinusoidTexture::random(3, 3, 0.1, 0.3, 60.0)
    }

    #[test]
    fn middle_frame_of_odd_sequence_is_undisplaced() {
        let scene = TranslatingScene {
            texture: texture(),
            flow: Vec2::new(0.5, -0.25),
        };
        let frames = scene.render(8, 9, 5);
        assert_eq!(frames.shape(), (8, 9, 5));
        assert_eq!(frames.get(3, 4, 2), scene.texture.eval(4.0, 3.0));
    }

    #[test]
    fn translating_frames_shift_by_flow() {
        let scene = TranslatingScene {
            texture: texture(),
            flow: Vec2::new(1.0, 2.0),
        };
        let frames = scene.render(10, 10, 3);
        // Content at (x, y) in frame 1 appears at (x + 1, y + 2) in frame 2.
        assert!((frames.get(3, 4, 1) - frames.get(5, 5, 2)).abs() < 1e-9);
    }

    #[test]
    fn forward_flow_vanishes_at_epipole() {
        let scene = ForwardMotionScene {
            texture: texture(),
            epipole: Pt2::new(4.0, 3.0),
            speed: 0.01,
            depth: DepthProfile::ColumnRamp {
                left: 1.0,
                right: 2.0,
            },
        };
        let flow = scene.true_flow(8, 9);
        assert_eq!(flow.at(3, 4), Vec2::zeros());
        let f = flow.at(3, 8);
        assert!(f.x > 0.0 && f.y == 0.0);
        let z = scene.true_depth(8, 9);
        assert_eq!(z[(0, 0)], 1.0);
        assert_eq!(z[(0, 8)], 2.0);
    }
}
