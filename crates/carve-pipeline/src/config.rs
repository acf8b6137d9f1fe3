//! Rig configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use carve_calib::{DistortionFitOptions, IterativeOptions};
use carve_silhouette::{GmmConfig, SubtractionConfig};
use carve_targets::{BoardSpec, DetectorConfig};
use carve_voxel::VoxelGrid;
use serde::{Deserialize, Serialize};

/// Intrinsic calibration settings, the serializable face of
/// [`IterativeOptions`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationSettings {
    pub iterations: usize,
    pub fix_tangential: bool,
    pub fix_k3: bool,
    pub zero_skew: bool,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            iterations: 2,
            fix_tangential: false,
            fix_k3: true,
            zero_skew: true,
        }
    }
}

impl CalibrationSettings {
    pub fn to_options(self) -> IterativeOptions {
        IterativeOptions {
            iterations: self.iterations,
            distortion_opts: DistortionFitOptions {
                fix_tangential: self.fix_tangential,
                fix_k3: self.fix_k3,
                iters: 8,
            },
            zero_skew: self.zero_skew,
        }
    }
}

/// On-disk layout under each `cam{N}` directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLayout {
    /// Subdirectory of board frames for intrinsic calibration.
    pub intrinsics_dir: String,
    /// Subdirectory with the world-frame (floor board) frames.
    pub extrinsics_dir: String,
    /// Subdirectory of background-only frames.
    pub background_dir: String,
    /// Subdirectory of scene frames.
    pub scene_dir: String,
    /// Which scene frame to reconstruct.
    pub scene_frame_index: usize,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            intrinsics_dir: "intrinsics".to_string(),
            extrinsics_dir: "extrinsics".to_string(),
            background_dir: "background".to_string(),
            scene_dir: "video".to_string(),
            scene_frame_index: 0,
        }
    }
}

/// Everything the pipeline needs to know about the rig and its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    pub num_cameras: usize,
    pub board: BoardSpec,
    pub detector: DetectorConfig,
    pub calibration: CalibrationSettings,
    pub gmm: GmmConfig,
    pub subtraction: SubtractionConfig,
    pub grid: VoxelGrid,
    pub data: DataLayout,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            num_cameras: 4,
            board: BoardSpec::default(),
            detector: DetectorConfig::default(),
            calibration: CalibrationSettings::default(),
            gmm: GmmConfig::default(),
            subtraction: SubtractionConfig::default(),
            grid: VoxelGrid::default(),
            data: DataLayout::default(),
        }
    }
}

impl RigConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write config {}", path.display()))
    }
}
