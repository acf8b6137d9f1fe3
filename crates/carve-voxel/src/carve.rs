//! Silhouette carving.

use image::{GrayImage, RgbImage};
use rayon::prelude::*;

use crate::grid::VoxelGrid;
use crate::lut::ProjectionTable;
use crate::VoxelError;

const FG: u8 = 255;

/// A voxel that survived carving: exported grid index plus mean color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedVoxel {
    pub index: [i32; 3],
    pub color: [u8; 3],
}

/// Carve the grid against every camera's silhouette.
///
/// A camera *vetoes* a voxel when the voxel projects inside its frame onto a
/// background pixel. Cameras whose frustum misses the voxel abstain. A voxel
/// survives when no camera vetoes it and at least one camera sees it; its
/// color is the mean of the sampled pixels.
pub fn carve(
    grid: &VoxelGrid,
    table: &ProjectionTable,
    silhouettes: &[GrayImage],
    colors: &[RgbImage],
) -> Result<Vec<OccupiedVoxel>, VoxelError> {
    if table.num_cameras() != silhouettes.len() || silhouettes.len() != colors.len() {
        return Err(VoxelError::CameraCountMismatch {
            table: table.num_cameras(),
            given: silhouettes.len().min(colors.len()),
        });
    }
    for (i, (mask, color)) in silhouettes.iter().zip(colors).enumerate() {
        if mask.dimensions() != color.dimensions() {
            return Err(VoxelError::ImageSizeMismatch(i));
        }
    }

    let occupied: Vec<OccupiedVoxel> = (0..grid.num_voxels())
        .into_par_iter()
        .filter_map(|voxel| {
            let mut sum = [0u32; 3];
            let mut samples = 0u32;

            for cam in 0..table.num_cameras() {
                let Some((x, y)) = table.pixel(cam, voxel) else {
                    // Out of this camera's view: abstain.
                    continue;
                };
                if silhouettes[cam].get_pixel(x, y)[0] != FG {
                    // Seen as background anywhere kills the voxel.
                    return None;
                }
                let px = colors[cam].get_pixel(x, y);
                sum[0] += px[0] as u32;
                sum[1] += px[1] as u32;
                sum[2] += px[2] as u32;
                samples += 1;
            }

            if samples == 0 {
                return None;
            }

            let center = grid.center(voxel);
            Some(OccupiedVoxel {
                index: grid.export_index(&center),
                color: [
                    (sum[0] / samples) as u8,
                    (sum[1] / samples) as u8,
                    (sum[2] / samples) as u8,
                ],
            })
        })
        .collect();

    log::info!(
        "carving kept {} of {} voxels",
        occupied.len(),
        grid.num_voxels()
    );

    Ok(occupied)
}
