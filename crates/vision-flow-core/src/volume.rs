//! Frame and gradient volumes.
//!
//! A [`FrameVolume`] stores `N` grayscale frames of size `H x W` as one
//! contiguous buffer with shape `(H, W, N)`, indexed `[row(y), col(x),
//! frame(t)]`. The row axis always comes first.

use serde::{Deserialize, Serialize};

use crate::{FlowError, Map2, Real};

/// One of the three axes of a [`FrameVolume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Image rows (`y`).
    Row,
    /// Image columns (`x`).
    Col,
    /// Frames (`t`).
    Frame,
}

/// Real-valued `(H, W, N)` volume, laid out row-major with the frame index
/// varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameVolume {
    height: usize,
    width: usize,
    frames: usize,
    data: Vec<Real>,
}

impl FrameVolume {
    /// All-zero volume of the given shape.
    pub fn zeros(height: usize, width: usize, frames: usize) -> Self {
        Self {
            height,
            width,
            frames,
            data: vec![0.0; height * width * frames],
        }
    }

    /// Build a volume by evaluating `f(y, x, t)` at every sample.
    pub fn from_fn(
        height: usize,
        width: usize,
        frames: usize,
        mut f: impl FnMut(usize, usize, usize) -> Real,
    ) -> Self {
        let mut data = Vec::with_capacity(height * width * frames);
        for y in 0..height {
            for x in 0..width {
                for t in 0..frames {
                    data.push(f(y, x, t));
                }
            }
        }
        Self {
            height,
            width,
            frames,
            data,
        }
    }

    /// Wrap an existing `(H, W, N)` row-major buffer.
    pub fn from_vec(
        height: usize,
        width: usize,
        frames: usize,
        data: Vec<Real>,
    ) -> Result<Self, FlowError> {
        if data.len() != height * width * frames {
            return Err(FlowError::ShapeMismatch {
                what: "volume buffer",
                expected: (height * width * frames, 1),
                got: (data.len(), 1),
            });
        }
        Ok(Self {
            height,
            width,
            frames,
            data,
        })
    }

    /// Stack equally sized frames along the time axis.
    pub fn from_frames(frames: &[Map2]) -> Result<Self, FlowError> {
        let Some(first) = frames.first() else {
            return Ok(Self::zeros(0, 0, 0));
        };
        let shape = first.shape();
        for frame in frames {
            FlowError::check_shape("frame", shape, frame.shape())?;
        }
        let (height, width) = shape;
        Ok(Self::from_fn(height, width, frames.len(), |y, x, t| {
            frames[t][(y, x)]
        }))
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// `(H, W, N)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.frames)
    }

    /// Number of samples along `axis`.
    pub fn len_along(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.height,
            Axis::Col => self.width,
            Axis::Frame => self.frames,
        }
    }

    /// Distance in the flat buffer between neighbours along `axis`.
    pub fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.width * self.frames,
            Axis::Col => self.frames,
            Axis::Frame => 1,
        }
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize, t: usize) -> Real {
        self.data[self.offset(y, x, t)]
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, t: usize, value: Real) {
        let idx = self.offset(y, x, t);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Real] {
        &mut self.data
    }

    /// Copy out frame `t` as an `(H, W)` map.
    pub fn frame(&self, t: usize) -> Result<Map2, FlowError> {
        if t >= self.frames {
            return Err(FlowError::ShapeMismatch {
                what: "frame index",
                expected: (self.frames, 1),
                got: (t, 1),
            });
        }
        Ok(Map2::from_fn(self.height, self.width, |y, x| {
            self.get(y, x, t)
        }))
    }

    #[inline]
    fn offset(&self, y: usize, x: usize, t: usize) -> usize {
        (y * self.width + x) * self.frames + t
    }
}
