use nalgebra::{Matrix3, RealField, Vector3};
use serde::{Deserialize, Serialize};

use crate::FlowError;

/// Standard pinhole intrinsics with optional skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    /// Focal length in pixels along X.
    pub fx: S,
    /// Focal length in pixels along Y.
    pub fy: S,
    /// Principal point X coordinate in pixels.
    pub cx: S,
    /// Principal point Y coordinate in pixels.
    pub cy: S,
    /// Skew term (typically 0).
    pub skew: S,
}

impl<S: RealField + Copy> FxFyCxCySkew<S> {
    /// Unit focal length, principal point at the origin.
    ///
    /// With these intrinsics pixel and normalized coordinates coincide.
    pub fn identity() -> Self {
        Self {
            fx: S::one(),
            fy: S::one(),
            cx: S::zero(),
            cy: S::zero(),
            skew: S::zero(),
        }
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Matrix3<S> {
        Matrix3::new(
            self.fx,
            self.skew,
            self.cx,
            S::zero(),
            self.fy,
            self.cy,
            S::zero(),
            S::zero(),
            S::one(),
        )
    }

    /// Read intrinsics back from an upper-triangular K with `K[2,2]` scaled to 1.
    pub fn from_k_matrix(k: &Matrix3<S>) -> Result<Self, FlowError> {
        let w = k[(2, 2)];
        if w == S::zero() {
            return Err(FlowError::SingularIntrinsics);
        }
        let k = k / w;
        let out = Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        };
        if out.fx == S::zero() || out.fy == S::zero() {
            return Err(FlowError::SingularIntrinsics);
        }
        Ok(out)
    }
}

/// `K⁻¹`, or [`FlowError::SingularIntrinsics`] when K is not invertible.
pub fn inverse_intrinsics<S: RealField + Copy>(k: &Matrix3<S>) -> Result<Matrix3<S>, FlowError> {
    k.try_inverse().ok_or(FlowError::SingularIntrinsics)
}

/// Map a homogeneous pixel point onto normalized camera coordinates.
#[inline]
pub fn back_project<S: RealField + Copy>(k_inv: &Matrix3<S>, pixel_h: &Vector3<S>) -> Vector3<S> {
    k_inv * pixel_h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_round_trips() {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 780.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.5,
        };
        let back = FxFyCxCySkew::from_k_matrix(&k.k_matrix()).unwrap();
        assert_eq!(back, k);
    }

    #[test]
    fn intrinsics_read_from_json() {
        let k: FxFyCxCySkew<f64> = serde_json::from_str(
            r#"{ "fx": 525.0, "fy": 525.0, "cx": 319.5, "cy": 239.5, "skew": 0.0 }"#,
        )
        .unwrap();
        assert_eq!(k.k_matrix()[(0, 2)], 319.5);
        let json = serde_json::to_string(&k).unwrap();
        assert_eq!(serde_json::from_str::<FxFyCxCySkew<f64>>(&json).unwrap(), k);
    }

    #[test]
    fn back_projection_inverts_k() {
        let k = FxFyCxCySkew {
            fx: 500.0,
            fy: 500.0,
            cx: 32.0,
            cy: 16.0,
            skew: 0.0,
        }
        .k_matrix();
        let k_inv = inverse_intrinsics(&k).unwrap();
        let n = back_project(&k_inv, &Vector3::new(532.0, 16.0, 1.0));
        assert!((n - Vector3::new(1.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn singular_k_is_rejected() {
        let k = Matrix3::<f64>::zeros();
        assert_eq!(inverse_intrinsics(&k), Err(FlowError::SingularIntrinsics));
        assert!(FxFyCxCySkew::from_k_matrix(&k).is_err());
    }
}
