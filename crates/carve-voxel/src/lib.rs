//! Voxel occupancy reconstruction from calibrated silhouettes.
//!
//! The capture volume is discretized into a regular grid; every voxel center
//! is projected once into each camera (the lookup table), and a voxel
//! survives carving only when every camera that sees it sees foreground.
//! Surviving voxels take the mean color of their pixel samples.

pub mod carve;
pub mod export;
pub mod grid;
pub mod lut;

pub use carve::{carve, OccupiedVoxel};
pub use export::{save_voxels_ply, save_voxels_text, write_voxels_ply, write_voxels_text};
pub use grid::{AxisRange, VoxelGrid};
pub use lut::ProjectionTable;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoxelError {
    #[error("projection table built for {table} cameras, got {given} silhouettes")]
    CameraCountMismatch { table: usize, given: usize },
    #[error("silhouette and color image sizes differ for camera {0}")]
    ImageSizeMismatch(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
