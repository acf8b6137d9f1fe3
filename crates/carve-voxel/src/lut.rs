//! Per-camera projection lookup tables.
//!
//! The rig cameras are fixed, so every voxel center projects to the same
//! pixel in every frame. Projecting the whole grid once per camera and
//! reusing the table across carving runs is the main cost saver of the
//! pipeline.

use carve_core::RigCamera;
use rayon::prelude::*;

use crate::grid::VoxelGrid;

/// Precomputed voxel-to-pixel maps, one per camera.
///
/// An entry is `None` when the voxel center is behind the camera or its
/// projection falls outside the image bounds.
#[derive(Debug, Clone)]
pub struct ProjectionTable {
    tables: Vec<Vec<Option<(u32, u32)>>>,
}

impl ProjectionTable {
    /// Project every voxel center of `grid` through every camera.
    pub fn build(grid: &VoxelGrid, cameras: &[RigCamera]) -> Self {
        let tables = cameras
            .iter()
            .map(|cam| {
                (0..grid.num_voxels())
                    .into_par_iter()
                    .map(|i| cam.project_to_pixel(&grid.center(i)))
                    .collect()
            })
            .collect();

        log::debug!(
            "projection table built: {} cameras x {} voxels",
            cameras.len(),
            grid.num_voxels()
        );

        Self { tables }
    }

    pub fn num_cameras(&self) -> usize {
        self.tables.len()
    }

    pub fn num_voxels(&self) -> usize {
        self.tables.first().map_or(0, |t| t.len())
    }

    /// Pixel of voxel `voxel` in camera `camera`, if visible in-frame.
    pub fn pixel(&self, camera: usize, voxel: usize) -> Option<(u32, u32)> {
        self.tables[camera][voxel]
    }
}
