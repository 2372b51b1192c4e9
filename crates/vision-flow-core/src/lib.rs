//! Core types for the `vision-flow` workspace.
//!
//! This crate provides the building blocks shared by the solver and pipeline
//! crates:
//!
//! - linear algebra type aliases (`Real`, `Vec2`, `Mat3`, `Map2`, ...),
//! - [`FrameVolume`], the `(H, W, N)` stack of frames and gradients,
//! - [`FlowField`], per-pixel `(u, v)` motion,
//! - pinhole intrinsics ([`FxFyCxCySkew`]) and `K⁻¹` back-projection,
//! - the [`FlowError`] taxonomy.
//!
//! Arrays are indexed row first: `(y, x)` for maps, `(y, x, t)` for volumes.
//!
//! # Example
//!
//! ```
//! use vision_flow_core::{FrameVolume, FxFyCxCySkew};
//!
//! let frames = FrameVolume::from_fn(4, 6, 2, |y, x, t| (y + x + t) as f64);
//! assert_eq!(frames.shape(), (4, 6, 2));
//!
//! let k = FxFyCxCySkew::<f64>::identity().k_matrix();
//! assert_eq!(k, vision_flow_core::Mat3::identity());
//! ```

mod error;
mod flow;
/// Linear algebra type aliases and helpers.
mod math;
/// Camera intrinsics.
mod models;
mod volume;

/// Deterministic synthetic data generation helpers.
pub mod synthetic;

pub use error::FlowError;
pub use flow::FlowField;
pub use math::*;
pub use models::*;
pub use volume::{Axis, FrameVolume};
