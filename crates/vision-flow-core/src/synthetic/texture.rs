//! Procedural textures built from a handful of plane waves.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::Real;

/// One plane wave `amplitude * sin(kx * x + ky * y + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub kx: Real,
    pub ky: Real,
    pub amplitude: Real,
    pub phase: Real,
}

/// Smooth, band-limited intensity pattern defined on the whole plane.
///
/// Textures with waves in at least two directions give every patch gradients
/// along both image axes, which is what Lucas-Kanade needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinusoidTexture {
    /// Constant intensity offset.
    pub offset: Real,
    pub waves: Vec<Wave>,
}

impl SinusoidTexture {
    /// Random texture with `count` waves of angular frequency in
    /// `[min_freq, max_freq]` (radians per pixel) and total amplitude
    /// `amplitude`.
    pub fn random(
        seed: u64,
        count: usize,
        min_freq: Real,
        max_freq: Real,
        amplitude: Real,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let per_wave = if count == 0 {
            0.0
        } else {
            amplitude / count as Real
        };
        let waves = (0..count)
            .map(|i| {
                // Spread orientations over the half circle so directions differ.
                let base = std::f64::consts::PI * i as Real / count as Real;
                let theta = base + rng.random_range(0.0..0.5);
                let freq = rng.random_range(min_freq..=max_freq);
                Wave {
                    kx: freq * theta.cos(),
                    ky: freq * theta.sin(),
                    amplitude: per_wave,
                    phase: rng.random_range(0.0..std::f64::consts::TAU),
                }
            })
            .collect();
        Self {
            offset: 128.0,
            waves,
        }
    }

    /// Intensity at continuous pixel coordinates `(x, y)`.
    pub fn eval(&self, x: Real, y: Real) -> Real {
        self.offset
            + self
                .waves
                .iter()
                .map(|w| w.amplitude * (w.kx * x + w.ky * y + w.phase).sin())
                .sum::<Real>()
    }
}
