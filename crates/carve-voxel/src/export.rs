//! Voxel output formats.
//!
//! Two writers: the rig's established whitespace text format
//! (`ix iy iz r g b` per line) and an ASCII PLY point cloud for viewers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::carve::OccupiedVoxel;
use crate::VoxelError;

/// Write voxels in the `ix iy iz r g b` line format.
pub fn write_voxels_text<W: Write>(out: &mut W, voxels: &[OccupiedVoxel]) -> Result<(), VoxelError> {
    for v in voxels {
        writeln!(
            out,
            "{} {} {} {} {} {}",
            v.index[0], v.index[1], v.index[2], v.color[0], v.color[1], v.color[2]
        )?;
    }
    Ok(())
}

pub fn save_voxels_text(path: &Path, voxels: &[OccupiedVoxel]) -> Result<(), VoxelError> {
    let mut file = BufWriter::new(File::create(path)?);
    write_voxels_text(&mut file, voxels)
}

/// Write voxels as an ASCII PLY vertex cloud.
pub fn write_voxels_ply<W: Write>(out: &mut W, voxels: &[OccupiedVoxel]) -> Result<(), VoxelError> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", voxels.len())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "property uchar red")?;
    writeln!(out, "property uchar green")?;
    writeln!(out, "property uchar blue")?;
    writeln!(out, "end_header")?;

    for v in voxels {
        writeln!(
            out,
            "{} {} {} {} {} {}",
            v.index[0], v.index[1], v.index[2], v.color[0], v.color[1], v.color[2]
        )?;
    }
    Ok(())
}

pub fn save_voxels_ply(path: &Path, voxels: &[OccupiedVoxel]) -> Result<(), VoxelError> {
    let mut file = BufWriter::new(File::create(path)?);
    write_voxels_ply(&mut file, voxels)
}
