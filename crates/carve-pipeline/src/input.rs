//! In-memory pipeline input.

use anyhow::{ensure, Result};
use carve_core::CorrespondenceView;
use image::RgbImage;

/// Everything one camera contributes to a reconstruction run.
#[derive(Debug, Clone)]
pub struct CameraInput {
    pub image_width: u32,
    pub image_height: u32,
    /// Board observations for intrinsic calibration (≥3 views).
    pub calibration_views: Vec<CorrespondenceView>,
    /// Observation of the world-frame board on the floor.
    pub world_view: CorrespondenceView,
    /// Background-only frames for model training.
    pub background_frames: Vec<RgbImage>,
    /// The synchronized scene frame to reconstruct.
    pub scene_frame: RgbImage,
}

/// Input for the whole rig.
#[derive(Debug, Clone)]
pub struct RigInput {
    pub cameras: Vec<CameraInput>,
}

impl RigInput {
    pub fn new(cameras: Vec<CameraInput>) -> Result<Self> {
        ensure!(!cameras.is_empty(), "rig input needs at least one camera");
        for (i, cam) in cameras.iter().enumerate() {
            ensure!(
                cam.calibration_views.len() >= 3,
                "camera {} has {} calibration views, need at least 3",
                i,
                cam.calibration_views.len()
            );
            ensure!(
                !cam.background_frames.is_empty(),
                "camera {} has no background frames",
                i
            );
            let (w, h) = cam.scene_frame.dimensions();
            ensure!(
                (w, h) == (cam.image_width, cam.image_height),
                "camera {} scene frame is {}x{}, expected {}x{}",
                i,
                w,
                h,
                cam.image_width,
                cam.image_height
            );
        }
        Ok(Self { cameras })
    }

    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }
}
