//! Deterministic noise helpers for synthetic frame volumes.
//!
//! The functions here avoid `thread_rng` and do not depend on the internal
//! algorithm of `rand` RNGs. This keeps synthetic sequences stable across
//! versions and platforms.

use crate::{FrameVolume, Real};

/// Deterministic uniform intensity noise in `[-amplitude, +amplitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntensityNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute noise added to a sample.
    pub amplitude: Real,
}

impl IntensityNoise {
    /// Sample the noise value for frame `t` at flat pixel index `pixel_idx`.
    #[inline]
    pub fn sample(&self, t: usize, pixel_idx: usize) -> Real {
        let amp = self.amplitude.abs();
        if amp == 0.0 {
            return 0.0;
        }
        let u = u64_to_unit_f64(splitmix64(mix_key(self.seed, t, pixel_idx)));
        (u - 0.5) * 2.0 * amp
    }

    /// Return a copy of `frames` with noise added to every sample.
    pub fn apply(&self, frames: &FrameVolume) -> FrameVolume {
        let (h, w, n) = frames.shape();
        FrameVolume::from_fn(h, w, n, |y, x, t| {
            frames.get(y, x, t) + self.sample(t, y * w + x)
        })
    }
}

#[inline]
fn mix_key(seed: u64, t: usize, pixel_idx: usize) -> u64 {
    seed ^ (t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (pixel_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // Top 53 bits -> [0, 1).
    let mantissa = x >> 11;
    (mantissa as Real) * (1.0 / ((1u64 << 53) as Real))
}
