//! Core math and camera primitives for the `carve` reconstruction pipeline.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the rig camera model (pinhole projection + Brown-Conrady distortion +
//!   pixel intrinsics + world pose),
//! - serializable camera parameter records,
//! - validated 3D/2D correspondence containers.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ pinhole(pose · p_world)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion.
pub mod camera;
/// Serializable camera parameter records.
pub mod params;
/// Correspondence containers.
pub mod view;

pub use camera::*;
pub use math::*;
pub use params::*;
pub use view::*;
