//! Relative depth from flow under a purely translating camera.
//!
//! For a camera translating without rotation, the flow at an image point `p`
//! points away from (or towards) the epipole `e` with magnitude proportional
//! to `‖p − e‖ / Z`. Inverting gives depth up to a global scale:
//!
//! `Z(p) ∝ ‖K⁻¹p − K⁻¹e‖ / ‖flow(p)‖`
//!
//! Rotation is neither estimated nor compensated; a rotating camera produces
//! meaningless depth. The map is clipped at `mean + 10·std` of the positive
//! depths and normalized to `[0, 1]`, with `0` marking rejected pixels.

use log::debug;
use vision_flow_core::{
    FlowError, FlowField, Map2, Mat3, Pt2, Real, Vec3, back_project, inverse_intrinsics,
    to_homogeneous,
};

/// Default confidence threshold.
pub const DEFAULT_DEPTH_THRESHOLD: Real = 10.0;

/// Number of standard deviations above the mean beyond which depths are
/// discarded.
pub const OUTLIER_SIGMAS: Real = 10.0;

/// Normalized depth map from flow, confidence, epipole and intrinsics.
///
/// `epipole` is homogeneous in **pixel** coordinates (see
/// `epipole_to_pixel`); pixels are back-projected as `(col, row, 1)`.
/// Pixels with `confidence <= threshold`, zero flow, or depth beyond the
/// outlier bound come out as exactly `0`.
///
/// Fails with [`FlowError::EmptyResult`] when no pixel ends up with a
/// positive depth and with [`FlowError::SingularIntrinsics`] when `k` has no
/// inverse.
pub fn depth(
    flow: &FlowField,
    confidence: &Map2,
    epipole: &Vec3,
    k: &Mat3,
    threshold: Real,
) -> Result<Map2, FlowError> {
    FlowError::check_shape("confidence", flow.shape(), confidence.shape())?;
    let k_inv = inverse_intrinsics(k)?;
    let ep_n = back_project(&k_inv, epipole);
    let (h, w) = flow.shape();

    let mut depth_map = Map2::zeros(h, w);
    let mut rejected = 0usize;
    for y in 0..h {
        for x in 0..w {
            if !(confidence[(y, x)] > threshold) {
                continue;
            }
            let pixel = to_homogeneous(&Pt2::new(x as Real, y as Real));
            let p_n = back_project(&k_inv, &pixel);
            let z = (p_n - ep_n).norm() / flow.at(y, x).norm();
            if z.is_finite() {
                depth_map[(y, x)] = z.max(0.0);
            } else {
                rejected += 1;
            }
        }
    }
    if rejected > 0 {
        debug!("depth: {} confident pixels with zero flow rejected", rejected);
    }

    let positive: Vec<Real> = depth_map.iter().copied().filter(|&d| d > 0.0).collect();
    if positive.is_empty() {
        return Err(FlowError::EmptyResult(format!(
            "no pixel with positive depth above confidence {threshold}"
        )));
    }
    let n = positive.len() as Real;
    let mean = positive.iter().sum::<Real>() / n;
    let var = positive.iter().map(|d| (d - mean) * (d - mean)).sum::<Real>() / n;
    let bound = mean + OUTLIER_SIGMAS * var.sqrt();

    let mut clipped = 0usize;
    depth_map.iter_mut().for_each(|d| {
        if *d > bound {
            *d = 0.0;
            clipped += 1;
        }
    });

    let max = depth_map.max();
    if !(max > 0.0) {
        return Err(FlowError::EmptyResult(
            "every positive depth exceeded the outlier bound".into(),
        ));
    }
    depth_map /= max;

    debug!(
        "depth: {} positive pixels, mean {:.4}, bound {:.4}, {} clipped",
        positive.len(),
        mean,
        bound,
        clipped
    );
    Ok(depth_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision_flow_core::{FxFyCxCySkew, Vec2};

    /// Flow expanding from `e` for a forward step of 0.02 in front of a
    /// surface at depth `z(x)`.
    fn expanding_flow(
        h: usize,
        w: usize,
        e: (Real, Real),
        z: impl Fn(usize) -> Real,
    ) -> FlowField {
        let mut flow = FlowField::zeros(h, w);
        for y in 0..h {
            for x in 0..w {
                let rate = 0.02 / z(x);
                flow.set(
                    y,
                    x,
                    Vec2::new(
                        (x as Real - e.0) * rate,
                        (y as Real - e.1) * rate,
                    ),
                );
            }
        }
        flow
    }

    #[test]
    fn depth_is_normalized_and_ordered() {
        let (h, w) = (12, 20);
        let flow = expanding_flow(h, w, (10.0, 6.0), |x| 1.0 + x as Real / 19.0);
        let conf = Map2::from_element(h, w, 50.0);
        let k = Mat3::identity();
        let ep = Vec3::new(10.0, 6.0, 1.0);
        let d = depth(&flow, &conf, &ep, &k, DEFAULT_DEPTH_THRESHOLD).unwrap();

        assert!(d.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(d.max(), 1.0);
        // Epipole pixel has zero flow and is rejected.
        assert_eq!(d[(6, 10)], 0.0);
        // Depth grows with the column.
        assert!(d[(0, 0)] < d[(0, 19)]);
        assert!(d[(11, 2)] < d[(11, 17)]);
        // Recovered up to scale: ratio matches the true depth ratio.
        let ratio = d[(0, 19)] / d[(0, 0)];
        assert!((ratio - 2.0).abs() < 1e-9, "ratio {ratio}");
    }

    #[test]
    fn low_confidence_pixels_are_exactly_zero() {
        let (h, w) = (10, 10);
        let flow = expanding_flow(h, w, (5.0, 5.0), |_| 1.5);
        let conf = Map2::from_fn(h, w, |y, x| if (x + y) % 3 == 0 { 5.0 } else { 30.0 });
        let ep = Vec3::new(5.0, 5.0, 1.0);
        let d = depth(&flow, &conf, &ep, &Mat3::identity(), 10.0).unwrap();
        for y in 0..h {
            for x in 0..w {
                if conf[(y, x)] <= 10.0 {
                    assert_eq!(d[(y, x)], 0.0);
                }
            }
        }
    }

    #[test]
    fn intrinsics_only_rescale_uniform_focal_depth() {
        let (h, w) = (10, 14);
        let flow = expanding_flow(h, w, (7.0, 5.0), |x| 2.0 + x as Real / 13.0);
        let conf = Map2::from_element(h, w, 40.0);
        let k = FxFyCxCySkew {
            fx: 300.0,
            fy: 300.0,
            cx: 7.0,
            cy: 5.0,
            skew: 0.0,
        }
        .k_matrix();
        let ep = Vec3::new(7.0, 5.0, 1.0);
        let a = depth(&flow, &conf, &ep, &Mat3::identity(), 10.0).unwrap();
        let b = depth(&flow, &conf, &ep, &k, 10.0).unwrap();
        assert!((a - b).abs().max() < 1e-12);
    }

    #[test]
    fn outliers_beyond_bound_are_zeroed() {
        let (h, w) = (20, 20);
        let mut flow = expanding_flow(h, w, (10.0, 10.0), |_| 1.0);
        // A near-zero flow yields a huge depth.
        flow.set(0, 0, Vec2::new(-1e-9, -1e-9));
        let conf = Map2::from_element(h, w, 50.0);
        let ep = Vec3::new(10.0, 10.0, 1.0);
        let d = depth(&flow, &conf, &ep, &Mat3::identity(), 10.0).unwrap();
        assert_eq!(d[(0, 0)], 0.0);
        assert_eq!(d.max(), 1.0);
    }

    #[test]
    fn nothing_confident_is_an_empty_result() {
        let flow = expanding_flow(6, 6, (3.0, 3.0), |_| 1.0);
        let conf = Map2::zeros(6, 6);
        let ep = Vec3::new(3.0, 3.0, 1.0);
        let err = depth(&flow, &conf, &ep, &Mat3::identity(), 10.0).unwrap_err();
        assert!(matches!(err, FlowError::EmptyResult(_)));
    }

    #[test]
    fn singular_intrinsics_are_rejected() {
        let flow = expanding_flow(4, 4, (2.0, 2.0), |_| 1.0);
        let conf = Map2::from_element(4, 4, 50.0);
        let ep = Vec3::new(2.0, 2.0, 1.0);
        let err = depth(&flow, &conf, &ep, &Mat3::zeros(), 10.0).unwrap_err();
        assert_eq!(err, FlowError::SingularIntrinsics);
    }
}
