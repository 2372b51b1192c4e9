//! Epipole (focus of expansion) from a dense flow field.
//!
//! Under pure camera translation every flow vector lies on a line through the
//! epipole. For an image point `p = (x, y, 1)` with flow `f = (u, v, 0)` the
//! line through `p` along `f` is `l = p × f`, and the epipole `e` satisfies
//! `lᵀ e = 0`. Stacking those lines gives `A e ≈ 0`, solved as the right
//! singular vector of `A` with the smallest singular value.
//!
//! Coordinates are centered on `(W div 2, H div 2)` before building `A`; use
//! [`epipole_to_pixel`] to move the result back to pixel coordinates. By
//! default the centered coordinates are also scaled so their RMS distance
//! from the center is `√2`, which keeps the homogeneous coordinate on the
//! same footing as `x` and `y`. The result is mapped back to centered pixel
//! units either way.
//!
//! Only pixels whose confidence exceeds a threshold take part, and at most
//! [`MAX_EPIPOLE_POINTS`] of them, picked by a seeded permutation so the
//! estimate is reproducible bit for bit.

use log::debug;
use nalgebra::{DMatrix, linalg::SVD};
use vision_flow_core::{FlowError, Map2, Mat3, Real, Vec3};

mod sampling;

pub use sampling::{legacy_permutation, subsample};

/// Seed of the subsampling permutation.
pub const EPIPOLE_SEED: u32 = 10;

/// Upper bound on the number of flow vectors in the linear system.
pub const MAX_EPIPOLE_POINTS: usize = 3000;

const MAX_SVD_ITERS: usize = 500;

/// Options for [`EpipoleEstimator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpipoleOptions {
    /// Seed of the subsampling permutation.
    pub seed: u32,
    /// Maximum number of points kept after permutation.
    pub max_points: usize,
    /// Scale centered coordinates to unit RMS before the solve.
    ///
    /// Without it, noise in the flow direction is weighted by the pixel
    /// distance from the center and easily pulls the null vector towards
    /// infinity.
    pub normalize: bool,
}

impl Default for EpipoleOptions {
    fn default() -> Self {
        Self {
            seed: EPIPOLE_SEED,
            max_points: MAX_EPIPOLE_POINTS,
            normalize: true,
        }
    }
}

/// Output of [`EpipoleEstimator::estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct EpipoleEstimate {
    /// Homogeneous epipole in centered coordinates.
    ///
    /// Scaled so that `z == 1` unless the epipole lies at infinity (flow
    /// vectors all parallel), in which case it is the unit-norm null vector.
    pub epipole: Vec3,
    /// Number of pixels above the confidence threshold.
    pub num_candidates: usize,
    /// Number of pixels used in the solve.
    pub num_points: usize,
    /// Smallest singular value of the constraint matrix, in the scaled
    /// coordinates when normalization is on.
    pub residual: Real,
}

/// Linear epipole estimation from flow.
#[derive(Debug, Clone, Copy)]
pub struct EpipoleEstimator;

/// Estimate the epipole with the default sampling options.
///
/// Returns the homogeneous epipole in centered coordinates; see
/// [`EpipoleEstimate::epipole`].
pub fn estimate_epipole(
    flow_x: &Map2,
    flow_y: &Map2,
    confidence: &Map2,
    threshold: Real,
) -> Result<Vec3, FlowError> {
    EpipoleEstimator::estimate(
        flow_x,
        flow_y,
        confidence,
        threshold,
        &EpipoleOptions::default(),
    )
    .map(|est| est.epipole)
}

impl EpipoleEstimator {
    /// Estimate the epipole from flow components and their confidence.
    ///
    /// Fails with [`FlowError::DegenerateSystem`] when fewer than two pixels
    /// pass `confidence > threshold`.
    pub fn estimate(
        flow_x: &Map2,
        flow_y: &Map2,
        confidence: &Map2,
        threshold: Real,
        opts: &EpipoleOptions,
    ) -> Result<EpipoleEstimate, FlowError> {
        FlowError::check_shape("flow_y", flow_x.shape(), flow_y.shape())?;
        FlowError::check_shape("confidence", flow_x.shape(), confidence.shape())?;
        let (h, w) = flow_x.shape();

        // Flattened row-major indices.
        let candidates: Vec<usize> = (0..h * w)
            .filter(|&idx| confidence[(idx / w, idx % w)] > threshold)
            .collect();
        let selected = subsample(&candidates, opts.seed, opts.max_points);
        if selected.len() < 2 {
            return Err(FlowError::DegenerateSystem(format!(
                "need at least 2 flow vectors above confidence {threshold}, got {}",
                selected.len()
            )));
        }

        let cx = (w / 2) as Real;
        let cy = (h / 2) as Real;
        let centered: Vec<(usize, usize, Real, Real)> = selected
            .iter()
            .map(|&idx| {
                let (y, x) = (idx / w, idx % w);
                (y, x, x as Real - cx, y as Real - cy)
            })
            .collect();

        let scale = if opts.normalize {
            let mean_sq = centered
                .iter()
                .map(|&(_, _, px, py)| px * px + py * py)
                .sum::<Real>()
                / centered.len() as Real;
            let s = (0.5 * mean_sq).sqrt();
            if s > 0.0 { s } else { 1.0 }
        } else {
            1.0
        };

        // Pad to a square system so the thin SVD keeps the full right basis.
        let mut a = DMatrix::<Real>::zeros(centered.len().max(3), 3);
        for (row, &(y, x, px, py)) in centered.iter().enumerate() {
            let p = Vec3::new(px / scale, py / scale, 1.0);
            let f = Vec3::new(flow_x[(y, x)], flow_y[(y, x)], 0.0);
            let line = p.cross(&f);
            a[(row, 0)] = line.x;
            a[(row, 1)] = line.y;
            a[(row, 2)] = line.z;
        }

        let svd = SVD::try_new(a, false, true, Real::EPSILON, MAX_SVD_ITERS)
            .ok_or_else(|| FlowError::DegenerateSystem("epipole svd did not converge".into()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| FlowError::DegenerateSystem("epipole svd failed".into()))?;
        let (k, residual) = svd.singular_values.argmin();
        let null = Vec3::new(v_t[(k, 0)], v_t[(k, 1)], v_t[(k, 2)]);
        let unscaled = Vec3::new(null.x * scale, null.y * scale, null.z);

        let epipole = if null.z.abs() > 1e-12 {
            unscaled / unscaled.z
        } else {
            debug!("epipole at infinity: flow field is parallel");
            unscaled.normalize()
        };

        debug!(
            "epipole from {} of {} candidates: ({:.3}, {:.3}, {:.3}), residual {:.3e}",
            selected.len(),
            candidates.len(),
            epipole.x,
            epipole.y,
            epipole.z,
            residual
        );

        Ok(EpipoleEstimate {
            epipole,
            num_candidates: candidates.len(),
            num_points: selected.len(),
            residual,
        })
    }
}

/// Shift a centered homogeneous epipole back to pixel coordinates of an image
/// with the given `width` and `height`.
pub fn epipole_to_pixel(epipole: &Vec3, width: usize, height: usize) -> Vec3 {
    let shift = Mat3::new(
        1.0,
        0.0,
        (width / 2) as Real,
        0.0,
        1.0,
        (height / 2) as Real,
        0.0,
        0.0,
        1.0,
    );
    shift * epipole
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn radial_flow(h: usize, w: usize, ex: Real, ey: Real, rate: Real) -> (Map2, Map2) {
        let u = Map2::from_fn(h, w, |_, x| (x as Real - ex) * rate);
        let v = Map2::from_fn(h, w, |y, _| (y as Real - ey) * rate);
        (u, v)
    }

    #[test]
    fn radial_flow_recovers_focus_of_expansion() {
        let (h, w) = (30, 40);
        let (u, v) = radial_flow(h, w, 20.0, 12.0, 0.05);
        let conf = Map2::from_element(h, w, 100.0);

        let ep = estimate_epipole(&u, &v, &conf, 1.0).unwrap();
        assert!((ep - Vec3::new(0.0, -3.0, 1.0)).norm() < 1e-8, "{ep:?}");

        let px = epipole_to_pixel(&ep, w, h);
        assert!((px - Vec3::new(20.0, 12.0, 1.0)).norm() < 1e-8);
    }

    #[test]
    fn parallel_flow_puts_epipole_at_infinity() {
        let (h, w) = (16, 16);
        let u = Map2::from_element(h, w, 0.6);
        let v = Map2::from_element(h, w, 0.8);
        let conf = Map2::from_element(h, w, 50.0);

        let est =
            EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &EpipoleOptions::default()).unwrap();
        let ep = est.epipole;
        assert!(ep.z.abs() < 1e-9);
        // Direction parallel to the flow.
        assert!((ep.x * 0.8 - ep.y * 0.6).abs() < 1e-9);
        assert!((ep.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_confident_points_is_degenerate() {
        let (u, v) = radial_flow(8, 8, 4.0, 4.0, 0.1);
        let mut conf = Map2::zeros(8, 8);
        conf[(2, 3)] = 20.0;
        let err = estimate_epipole(&u, &v, &conf, 10.0).unwrap_err();
        assert!(matches!(err, FlowError::DegenerateSystem(_)));

        // Two points are enough to pin down the intersection.
        conf[(6, 1)] = 20.0;
        let ep = estimate_epipole(&u, &v, &conf, 10.0).unwrap();
        assert!((ep - Vec3::new(0.0, 0.0, 1.0)).norm() < 1e-8);
    }

    #[test]
    fn sample_count_is_capped() {
        let (h, w) = (80, 80);
        let (u, v) = radial_flow(h, w, 40.0, 40.0, 0.02);
        let conf = Map2::from_element(h, w, 20.0);
        let est =
            EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &EpipoleOptions::default()).unwrap();
        assert_eq!(est.num_candidates, h * w);
        assert_eq!(est.num_points, MAX_EPIPOLE_POINTS);
    }

    #[test]
    fn estimate_is_bitwise_reproducible() {
        let (h, w) = (48, 64);
        let mut rng = StdRng::seed_from_u64(99);
        let (mut u, mut v) = radial_flow(h, w, 30.0, 20.0, 0.03);
        u.iter_mut().for_each(|c| *c += rng.random_range(-0.05..0.05));
        v.iter_mut().for_each(|c| *c += rng.random_range(-0.05..0.05));
        let conf = Map2::from_fn(h, w, |_, _| rng.random_range(0.0..20.0));

        let opts = EpipoleOptions {
            max_points: 500,
            ..Default::default()
        };
        let a = EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &opts).unwrap();
        let b = EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &opts).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_points, 500);

        let other = EpipoleOptions { seed: 11, ..opts };
        let c = EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &other).unwrap();
        assert_ne!(a.epipole, c.epipole);
    }

    #[test]
    fn normalization_reduces_bias_under_noise() {
        let (h, w) = (48, 64);
        let mut rng = StdRng::seed_from_u64(7);
        let (mut u, mut v) = radial_flow(h, w, 30.0, 20.0, 0.03);
        u.iter_mut().for_each(|c| *c += rng.random_range(-0.05..0.05));
        v.iter_mut().for_each(|c| *c += rng.random_range(-0.05..0.05));
        let conf = Map2::from_element(h, w, 20.0);
        let truth = Vec3::new(30.0, 20.0, 1.0);

        let error = |normalize: bool| {
            let opts = EpipoleOptions {
                normalize,
                ..Default::default()
            };
            let est = EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &opts).unwrap();
            (epipole_to_pixel(&est.epipole, w, h) - truth).norm()
        };
        let (plain, normalized) = (error(false), error(true));
        assert!(normalized < 0.2, "normalized error {normalized}");
        assert!(normalized < plain, "{normalized} vs {plain}");
    }

    #[test]
    fn exact_flow_gives_same_epipole_with_and_without_scaling() {
        let (u, v) = radial_flow(20, 20, 6.0, 15.0, 0.04);
        let conf = Map2::from_element(20, 20, 50.0);
        let plain = EpipoleOptions {
            normalize: false,
            ..Default::default()
        };
        let a = EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &plain).unwrap();
        let b =
            EpipoleEstimator::estimate(&u, &v, &conf, 10.0, &EpipoleOptions::default()).unwrap();
        assert!((a.epipole - b.epipole).norm() < 1e-8);
        assert!((a.epipole - Vec3::new(-4.0, 5.0, 1.0)).norm() < 1e-8);
    }

    #[test]
    fn shapes_must_agree() {
        let a = Map2::zeros(4, 4);
        let b = Map2::zeros(4, 3);
        assert!(estimate_epipole(&a, &a, &b, 0.0).is_err());
        assert!(estimate_epipole(&a, &b, &a, 0.0).is_err());
    }
}
