//! The reconstruction volume.

use carve_core::{Pt3, Real};
use serde::{Deserialize, Serialize};

/// Inclusive sample range along one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: Real,
    pub max: Real,
}

impl AxisRange {
    pub fn new(min: Real, max: Real) -> Self {
        Self { min, max }
    }

    /// The `i`-th of `n` evenly spaced samples, endpoints included.
    fn sample(&self, i: usize, n: usize) -> Real {
        if n <= 1 {
            return self.min;
        }
        self.min + (self.max - self.min) * (i as Real) / ((n - 1) as Real)
    }
}

/// A regular grid of voxel centers spanning the capture volume.
///
/// The default volume matches the rig: x, y ∈ [-1024, 1024] and
/// z ∈ [0, 2048] world units at 200 samples per axis, with exported indices
/// scaled down by 16.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoxelGrid {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    /// Samples per axis.
    pub resolution: usize,
    /// World units per exported index step.
    pub index_scale: Real,
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-1024.0, 1024.0),
            y: AxisRange::new(-1024.0, 1024.0),
            z: AxisRange::new(0.0, 2048.0),
            resolution: 200,
            index_scale: 16.0,
        }
    }
}

impl VoxelGrid {
    pub fn num_voxels(&self) -> usize {
        self.resolution * self.resolution * self.resolution
    }

    /// Split a flat voxel index into its (xi, yi, zi) axis indices.
    pub fn axis_indices(&self, index: usize) -> (usize, usize, usize) {
        let n = self.resolution;
        let zi = index % n;
        let yi = (index / n) % n;
        let xi = index / (n * n);
        (xi, yi, zi)
    }

    /// World-space center of the voxel at a flat index.
    pub fn center(&self, index: usize) -> Pt3 {
        let n = self.resolution;
        let (xi, yi, zi) = self.axis_indices(index);
        Pt3::new(
            self.x.sample(xi, n),
            self.y.sample(yi, n),
            self.z.sample(zi, n),
        )
    }

    /// Exported integer index of a world position (truncation toward zero,
    /// matching the rig's established output files).
    pub fn export_index(&self, p: &Pt3) -> [i32; 3] {
        [
            (p.x / self.index_scale) as i32,
            (p.y / self.index_scale) as i32,
            (p.z / self.index_scale) as i32,
        ]
    }

    /// Length of a voxel cell diagonal, an upper bound on the distance from
    /// any point of a cell to its center.
    pub fn cell_diagonal(&self) -> Real {
        let n = (self.resolution.max(2) - 1) as Real;
        let dx = (self.x.max - self.x.min) / n;
        let dy = (self.y.max - self.y.min) / n;
        let dz = (self.z.max - self.z.min) / n;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
