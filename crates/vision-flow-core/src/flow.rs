//! Dense flow fields and their confidence maps.

use serde::{Deserialize, Serialize};

use crate::{FlowError, Map2, Pt2, Real, Vec2};

/// Per-pixel flow `(u, v)` stored as two `(H, W)` component maps.
///
/// `u` is the displacement along `x` (columns), `v` along `y` (rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowField {
    pub u: Map2,
    pub v: Map2,
}

impl FlowField {
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            u: Map2::zeros(height, width),
            v: Map2::zeros(height, width),
        }
    }

    /// Pair up two component maps of identical shape.
    pub fn from_components(u: Map2, v: Map2) -> Result<Self, FlowError> {
        FlowError::check_shape("flow v", u.shape(), v.shape())?;
        Ok(Self { u, v })
    }

    pub fn height(&self) -> usize {
        self.u.nrows()
    }

    pub fn width(&self) -> usize {
        self.u.ncols()
    }

    /// `(H, W)`.
    pub fn shape(&self) -> (usize, usize) {
        self.u.shape()
    }

    /// Flow vector at row `y`, column `x`.
    #[inline]
    pub fn at(&self, y: usize, x: usize) -> Vec2 {
        Vec2::new(self.u[(y, x)], self.v[(y, x)])
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, flow: Vec2) {
        self.u[(y, x)] = flow.x;
        self.v[(y, x)] = flow.y;
    }

    /// Euclidean norm of the flow at every pixel.
    pub fn magnitude(&self) -> Map2 {
        self.u.zip_map(&self.v, |u, v| u.hypot(v))
    }

    /// Pixel positions and flow vectors where `confidence > threshold`.
    ///
    /// Positions are `(x, y)` pixel coordinates, listed in row-major order.
    /// This is the data an overlay renderer needs to draw a vector field.
    pub fn confident_vectors(
        &self,
        confidence: &Map2,
        threshold: Real,
    ) -> Result<Vec<(Pt2, Vec2)>, FlowError> {
        FlowError::check_shape("confidence", self.shape(), confidence.shape())?;
        let (h, w) = self.shape();
        let mut out = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if confidence[(y, x)] > threshold {
                    out.push((Pt2::new(x as Real, y as Real), self.at(y, x)));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_vectors_follow_row_major_order() {
        let mut flow = FlowField::zeros(2, 3);
        flow.set(0, 2, Vec2::new(1.0, 2.0));
        flow.set(1, 0, Vec2::new(-3.0, 0.5));
        let mut conf = Map2::zeros(2, 3);
        conf[(0, 2)] = 5.0;
        conf[(1, 0)] = 7.0;
        conf[(1, 1)] = 1.0;

        let vectors = flow.confident_vectors(&conf, 2.0).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].0, Pt2::new(2.0, 0.0));
        assert_eq!(vectors[0].1, Vec2::new(1.0, 2.0));
        assert_eq!(vectors[1].0, Pt2::new(0.0, 1.0));
        assert_eq!(vectors[1].1, Vec2::new(-3.0, 0.5));
    }

    #[test]
    fn confidence_shape_must_match() {
        let flow = FlowField::zeros(4, 4);
        let conf = Map2::zeros(4, 5);
        assert!(flow.confident_vectors(&conf, 0.0).is_err());
    }

    #[test]
    fn magnitude_is_componentwise_norm() {
        let u = Map2::from_element(2, 2, 3.0);
        let v = Map2::from_element(2, 2, 4.0);
        let flow = FlowField::from_components(u, v).unwrap();
        assert!(flow.magnitude().iter().all(|&m| (m - 5.0).abs() < 1e-12));
    }
}
