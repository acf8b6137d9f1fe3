//! Run summary.

use carve_core::CameraParams;
use serde::{Deserialize, Serialize};

/// Per-camera summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraReport {
    pub params: CameraParams,
    /// Mean reprojection error of the world-board corners, in pixels.
    pub mean_reproj_error: f64,
    /// Fraction of scene pixels classified foreground.
    pub silhouette_coverage: f64,
}

/// Summary of a full reconstruction run, serializable for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionReport {
    pub cameras: Vec<CameraReport>,
    pub voxel_count: usize,
}
