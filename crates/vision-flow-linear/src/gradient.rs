//! Spatio-temporal image gradients from separable 7-tap filters.
//!
//! Each derivative volume is produced by convolving along one axis with the
//! derivative kernel [`KERNEL_H`] and along the two remaining axes with the
//! smoothing kernel [`KERNEL_G`]:
//!
//! | output | `KERNEL_H` along | `KERNEL_G` along |
//! |--------|------------------|------------------|
//! | `Ix`   | columns          | rows, frames     |
//! | `Iy`   | rows             | columns, frames  |
//! | `It`   | frames           | rows, columns    |
//!
//! Borders use half-sample symmetric reflection (`d c b a | a b c d | d c b a`),
//! repeated when an axis is shorter than the kernel radius. Accumulation
//! pairs mirrored taps of symmetric and antisymmetric kernels, the same way
//! SciPy's `convolve1d` does, so results match it sample for sample.

use vision_flow_core::{Axis, FlowError, FrameVolume, Map2, Real};

/// Derivative-of-Gaussian kernel (unit gain on a linear ramp).
pub const KERNEL_H: [Real; 7] = [
    0.03125, 0.125, 0.15625, 0.0, -0.15625, -0.125, -0.03125,
];

/// Binomial smoothing kernel (sums to one).
pub const KERNEL_G: [Real; 7] = [
    0.015625, 0.09375, 0.234375, 0.3125, 0.234375, 0.09375, 0.015625,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    Symmetric,
    Antisymmetric,
    General,
}

fn symmetry(weights: &[Real]) -> Symmetry {
    let n = weights.len();
    if n % 2 == 0 {
        return Symmetry::General;
    }
    let half = n / 2;
    let pairs = (1..=half).map(|i| (weights[half - i], weights[half + i]));
    if pairs.clone().all(|(l, r)| (l - r).abs() <= Real::EPSILON) {
        Symmetry::Symmetric
    } else if pairs.clone().all(|(l, r)| (l + r).abs() <= Real::EPSILON) {
        Symmetry::Antisymmetric
    } else {
        Symmetry::General
    }
}

/// Fold an out-of-range index back into `[0, n)` by mirror reflection.
#[inline]
fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}

/// Convolve every 1-D line of `input` along `axis` with `kernel`.
///
/// The kernel is applied as a true convolution (flipped): for an odd kernel of
/// radius `r`, `out[i] = Σ_k kernel[k] · in[i + r − k]`.
pub fn convolve_axis(input: &FrameVolume, kernel: &[Real], axis: Axis) -> FrameVolume {
    let (h, w, n) = input.shape();
    let mut output = FrameVolume::zeros(h, w, n);
    let len = input.len_along(axis);
    if len == 0 || kernel.is_empty() {
        return output;
    }

    // Correlation weights centered on `radius`.
    let flipped: Vec<Real> = kernel.iter().rev().copied().collect();
    let radius = flipped.len() / 2;
    let sym = symmetry(&flipped);

    let stride = input.stride(axis);
    let src = input.as_slice();
    let dst = output.as_mut_slice();

    let mut line = vec![0.0; len + 2 * radius];
    let line_starts = (0..src.len()).filter(|&offset| (offset / stride) % len == 0);
    for start in line_starts {
        for (j, slot) in line.iter_mut().enumerate() {
            let i = reflect_index(j as isize - radius as isize, len);
            *slot = src[start + i * stride];
        }
        for i in 0..len {
            let c = i + radius;
            let value = match sym {
                Symmetry::Symmetric => {
                    let mut acc = line[c] * flipped[radius];
                    for k in (1..=radius).rev() {
                        acc += (line[c - k] + line[c + k]) * flipped[radius - k];
                    }
                    acc
                }
                Symmetry::Antisymmetric => {
                    let mut acc = line[c] * flipped[radius];
                    for k in (1..=radius).rev() {
                        acc += (line[c - k] - line[c + k]) * flipped[radius - k];
                    }
                    acc
                }
                Symmetry::General => {
                    let mut acc = 0.0;
                    for (k, wk) in flipped.iter().enumerate() {
                        acc += line[i + k] * wk;
                    }
                    acc
                }
            };
            dst[start + i * stride] = value;
        }
    }
    output
}

fn derivative_along(frames: &FrameVolume, derive: Axis, smooth: [Axis; 2]) -> FrameVolume {
    let out = convolve_axis(frames, &KERNEL_H, derive);
    let out = convolve_axis(&out, &KERNEL_G, smooth[0]);
    convolve_axis(&out, &KERNEL_G, smooth[1])
}

/// Gradient along `x` (columns).
pub fn compute_ix(frames: &FrameVolume) -> FrameVolume {
    derivative_along(frames, Axis::Col, [Axis::Row, Axis::Frame])
}

/// Gradient along `y` (rows).
pub fn compute_iy(frames: &FrameVolume) -> FrameVolume {
    derivative_along(frames, Axis::Row, [Axis::Col, Axis::Frame])
}

/// Temporal gradient (along frames).
pub fn compute_it(frames: &FrameVolume) -> FrameVolume {
    derivative_along(frames, Axis::Frame, [Axis::Row, Axis::Col])
}

/// The three derivative volumes of a frame stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub ix: FrameVolume,
    pub iy: FrameVolume,
    pub it: FrameVolume,
}

/// One time slice of [`Gradients`], ready for flow estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientSlice {
    pub ix: Map2,
    pub iy: Map2,
    pub it: Map2,
}

impl Gradients {
    /// Extract the `(H, W)` gradient maps of frame `t`.
    pub fn slice(&self, t: usize) -> Result<GradientSlice, FlowError> {
        Ok(GradientSlice {
            ix: self.ix.frame(t)?,
            iy: self.iy.frame(t)?,
            it: self.it.frame(t)?,
        })
    }
}

/// Compute `Ix`, `Iy` and `It` for a whole frame stack.
pub fn compute_gradients(frames: &FrameVolume) -> Gradients {
    Gradients {
        ix: compute_ix(frames),
        iy: compute_iy(frames),
        it: compute_it(frames),
    }
}
