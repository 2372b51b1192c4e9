//! Lucas-Kanade optical flow on square patches.
//!
//! For a pixel `(x, y)` the brightness-constancy constraints
//! `Ix·u + Iy·v = −It` of every pixel in the surrounding patch are stacked
//! into `A·[u v]ᵀ ≈ b` with `A = [Ix Iy]` (n x 2) and solved in the least
//! squares sense through the SVD of `A`. The smallest singular value of `A` is
//! reported as the confidence: it is near zero on textureless patches and
//! along edges (aperture problem).
//!
//! Patches are clipped at the image border rather than padded, so border
//! pixels are solved from fewer constraints.

use log::debug;
use nalgebra::{DMatrix, DVector, linalg::SVD};
use rayon::prelude::*;
use vision_flow_core::{FlowError, FlowField, Map2, Real, Vec2};

use crate::gradient::GradientSlice;

/// Default patch side length in pixels.
pub const DEFAULT_PATCH_SIZE: usize = 5;

const MAX_SVD_ITERS: usize = 200;

/// Flow estimate for one patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchFlow {
    /// `(u, v)` displacement in pixels per frame.
    pub flow: Vec2,
    /// Smallest singular value of the patch system matrix.
    pub confidence: Real,
}

/// Flow and confidence for every pixel of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseFlow {
    pub flow: FlowField,
    pub confidence: Map2,
}

fn check_gradients(ix: &Map2, iy: &Map2, it: &Map2) -> Result<(), FlowError> {
    FlowError::check_shape("Iy", ix.shape(), iy.shape())?;
    FlowError::check_shape("It", ix.shape(), it.shape())
}

/// Lucas-Kanade flow for the patch centered at column `x`, row `y`.
///
/// The patch spans `[x − size/2, x + size/2] × [y − size/2, y + size/2]`
/// (inclusive), clipped to the image. Rank-deficient patches do not fail:
/// directions with vanishing singular values are dropped from the solve
/// and the confidence comes out at or near zero.
pub fn flow_lk_patch(
    ix: &Map2,
    iy: &Map2,
    it: &Map2,
    x: usize,
    y: usize,
    size: usize,
) -> Result<PatchFlow, FlowError> {
    check_gradients(ix, iy, it)?;
    let (h, w) = ix.shape();
    if y >= h || x >= w {
        return Err(FlowError::ShapeMismatch {
            what: "patch center",
            expected: (h, w),
            got: (y, x),
        });
    }
    solve_patch(ix, iy, it, x, y, size / 2)
}

fn solve_patch(
    ix: &Map2,
    iy: &Map2,
    it: &Map2,
    x: usize,
    y: usize,
    half: usize,
) -> Result<PatchFlow, FlowError> {
    let (h, w) = ix.shape();
    let (x0, x1) = (x.saturating_sub(half), (x + half).min(w - 1));
    let (y0, y1) = (y.saturating_sub(half), (y + half).min(h - 1));
    let n = (x1 - x0 + 1) * (y1 - y0 + 1);

    let mut a = DMatrix::<Real>::zeros(n, 2);
    let mut b = DVector::<Real>::zeros(n);
    let coords = (y0..=y1).flat_map(|yy| (x0..=x1).map(move |xx| (yy, xx)));
    for (row, (yy, xx)) in coords.enumerate() {
        a[(row, 0)] = ix[(yy, xx)];
        a[(row, 1)] = iy[(yy, xx)];
        b[row] = -it[(yy, xx)];
    }

    let svd = SVD::try_new(a, true, true, Real::EPSILON, MAX_SVD_ITERS).ok_or_else(|| {
        FlowError::DegenerateSystem(format!("patch svd did not converge at ({x}, {y})"))
    })?;
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();

    // Singular values at or below machine precision relative to the largest
    // one are treated as zero.
    let cutoff = Real::EPSILON * s_max;
    let sol = svd
        .solve(&b, cutoff)
        .map_err(|e| FlowError::DegenerateSystem(e.to_string()))?;

    Ok(PatchFlow {
        flow: Vec2::new(sol[0], sol[1]),
        confidence: s_min,
    })
}

/// Lucas-Kanade flow at every pixel.
///
/// Pixels are independent, so rows are solved in parallel.
pub fn flow_lk(ix: &Map2, iy: &Map2, it: &Map2, size: usize) -> Result<DenseFlow, FlowError> {
    check_gradients(ix, iy, it)?;
    let (h, w) = ix.shape();
    let half = size / 2;

    let rows = (0..h)
        .into_par_iter()
        .map(|y| {
            (0..w)
                .map(|x| solve_patch(ix, iy, it, x, y, half))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut flow = FlowField::zeros(h, w);
    let mut confidence = Map2::zeros(h, w);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, patch) in row.into_iter().enumerate() {
            flow.set(y, x, patch.flow);
            confidence[(y, x)] = patch.confidence;
        }
    }

    let degenerate = confidence.iter().filter(|&&c| c <= Real::EPSILON).count();
    debug!(
        "dense lk flow: {}x{} pixels, patch size {}, {} degenerate patches",
        h, w, size, degenerate
    );

    Ok(DenseFlow { flow, confidence })
}

/// Convenience wrapper running [`flow_lk`] on one gradient slice.
pub fn flow_lk_slice(slice: &GradientSlice, size: usize) -> Result<DenseFlow, FlowError> {
    flow_lk(&slice.ix, &slice.iy, &slice.it, size)
}
