//! The staged reconstruction session.
//!
//! Mirrors the calibration-session pattern: a session owns config, input,
//! and accumulated state; step functions validate preconditions, do one
//! stage of work, and append a log entry. Per-camera work inside a step
//! fans out across the rig with rayon.

use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use carve_calib::{estimate_intrinsics_iterative, estimate_rig_extrinsics, CalibrationView};
use carve_core::{CameraExtrinsics, CameraParams, CorrespondenceView};
use carve_silhouette::{equalize_foreground_colors, extract_silhouette, BackgroundModel};
use carve_voxel::{carve, OccupiedVoxel, ProjectionTable};
use image::{GrayImage, RgbImage};
use rayon::prelude::*;

use crate::config::RigConfig;
use crate::input::{CameraInput, RigInput};
use crate::params_io::save_camera_xml;
use crate::report::{CameraReport, ReconstructionReport};

const FG: u8 = 255;

/// Everything computed so far.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub calibrations: Option<Vec<CameraParams>>,
    pub background_images: Option<Vec<RgbImage>>,
    pub silhouettes: Option<Vec<GrayImage>>,
    /// Scene frames after cross-camera color equalization.
    pub scene_colors: Option<Vec<RgbImage>>,
    pub voxels: Option<Vec<OccupiedVoxel>>,
}

/// One step's outcome in the run log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub step: String,
    pub success: bool,
    pub notes: String,
}

pub struct ReconstructionSession {
    pub config: RigConfig,
    input: Option<RigInput>,
    pub state: SessionState,
    pub log: Vec<LogEntry>,
}

impl ReconstructionSession {
    pub fn new(config: RigConfig) -> Self {
        Self {
            config,
            input: None,
            state: SessionState::default(),
            log: Vec::new(),
        }
    }

    /// Attach rig input. Resets all computed state.
    pub fn set_input(&mut self, input: RigInput) -> Result<()> {
        ensure!(
            input.num_cameras() == self.config.num_cameras,
            "config expects {} cameras, input has {}",
            self.config.num_cameras,
            input.num_cameras()
        );
        self.input = Some(input);
        self.state = SessionState::default();
        Ok(())
    }

    pub fn require_input(&self) -> Result<&RigInput> {
        self.input
            .as_ref()
            .ok_or_else(|| anyhow!("no input set - call set_input first"))
    }

    fn record(&mut self, step: &str, success: bool, notes: String) {
        if success {
            log::info!("{}: {}", step, notes);
        } else {
            log::error!("{} failed: {}", step, notes);
        }
        self.log.push(LogEntry {
            step: step.to_string(),
            success,
            notes,
        });
    }

    /// Build the run report. Requires every step to have run.
    pub fn export(&self) -> Result<ReconstructionReport> {
        let input = self.require_input()?;
        let calibrations = self
            .state
            .calibrations
            .as_ref()
            .ok_or_else(|| anyhow!("calibration not run"))?;
        let silhouettes = self
            .state
            .silhouettes
            .as_ref()
            .ok_or_else(|| anyhow!("silhouettes not computed"))?;
        let voxels = self
            .state
            .voxels
            .as_ref()
            .ok_or_else(|| anyhow!("reconstruction not run"))?;

        let cameras = calibrations
            .iter()
            .zip(silhouettes)
            .zip(&input.cameras)
            .map(|((params, mask), cam_input)| {
                let coverage = mask.pixels().filter(|p| p[0] == FG).count() as f64
                    / (mask.width() * mask.height()) as f64;
                CameraReport {
                    params: params.clone(),
                    mean_reproj_error: mean_reproj_error(params, &cam_input.world_view),
                    silhouette_coverage: coverage,
                }
            })
            .collect();

        Ok(ReconstructionReport {
            cameras,
            voxel_count: voxels.len(),
        })
    }

    /// Write calibration files, voxel exports, and the report under `dir`.
    pub fn save_outputs(&self, dir: &Path) -> Result<()> {
        let calibrations = self
            .state
            .calibrations
            .as_ref()
            .ok_or_else(|| anyhow!("calibration not run"))?;
        let voxels = self
            .state
            .voxels
            .as_ref()
            .ok_or_else(|| anyhow!("reconstruction not run"))?;

        for (i, params) in calibrations.iter().enumerate() {
            let cam_dir = dir.join(format!("cam{}", i + 1));
            std::fs::create_dir_all(&cam_dir)
                .with_context(|| format!("failed to create {}", cam_dir.display()))?;
            save_camera_xml(&cam_dir.join("camera_properties.xml"), params)?;
        }

        carve_voxel::save_voxels_text(&dir.join("voxels.txt"), voxels)?;
        carve_voxel::save_voxels_ply(&dir.join("voxels.ply"), voxels)?;

        let report = self.export()?;
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(dir.join("report.json"), json)?;
        Ok(())
    }
}

/// Mean pixel distance between observed and reprojected world-board corners.
fn mean_reproj_error(params: &CameraParams, world_view: &CorrespondenceView) -> f64 {
    let rig = params.to_rig_camera();
    let mut total = 0.0;
    let mut count = 0usize;
    for (p3, p2) in world_view.points_3d.iter().zip(&world_view.points_2d) {
        if let Some(px) = rig.project_world(p3) {
            total += (px - p2.coords).norm();
            count += 1;
        }
    }
    if count == 0 {
        f64::INFINITY
    } else {
        total / count as f64
    }
}

fn calibrate_camera(cam: &CameraInput, config: &RigConfig) -> Result<CameraParams> {
    let views: Vec<CalibrationView> = cam
        .calibration_views
        .iter()
        .map(|v| CalibrationView::new(v.board_points_2d(), v.points_2d.clone()))
        .collect();

    let estimate = estimate_intrinsics_iterative(&views, config.calibration.to_options())
        .context("intrinsic calibration failed")?;

    let pose = estimate_rig_extrinsics(&cam.world_view, &estimate.intrinsics, &estimate.distortion)
        .context("extrinsic calibration failed")?;

    Ok(CameraParams {
        image_width: cam.image_width,
        image_height: cam.image_height,
        intrinsics: estimate.intrinsics,
        distortion: estimate.distortion,
        extrinsics: CameraExtrinsics::from_isometry(&pose),
    })
}

/// Calibrate every camera of the rig.
pub fn step_calibrate(session: &mut ReconstructionSession) -> Result<()> {
    let input = session.require_input()?;
    let config = session.config.clone();

    let result: Result<Vec<CameraParams>> = input
        .cameras
        .par_iter()
        .map(|cam| calibrate_camera(cam, &config))
        .collect();

    match result {
        Ok(calibrations) => {
            let notes = calibrations
                .iter()
                .map(|p| format!("fx={:.1}", p.intrinsics.fx))
                .collect::<Vec<_>>()
                .join(", ");
            session.state.calibrations = Some(calibrations);
            session.record("calibrate", true, notes);
            Ok(())
        }
        Err(e) => {
            session.record("calibrate", false, e.to_string());
            Err(e)
        }
    }
}

/// Train the per-camera background models.
pub fn step_background(session: &mut ReconstructionSession) -> Result<()> {
    let input = session.require_input()?;
    let gmm = session.config.gmm;
    let num_cameras = input.num_cameras();

    let result: Result<Vec<RgbImage>> = input
        .cameras
        .par_iter()
        .map(|cam| {
            let model = BackgroundModel::train(&cam.background_frames, &gmm)?;
            Ok(model.background_image())
        })
        .collect();

    match result {
        Ok(images) => {
            session.state.background_images = Some(images);
            session.record(
                "background",
                true,
                format!("{} models trained", num_cameras),
            );
            Ok(())
        }
        Err(e) => {
            session.record("background", false, e.to_string());
            Err(e)
        }
    }
}

/// Extract silhouettes from the scene frames and equalize foreground colors
/// across the rig.
pub fn step_silhouettes(session: &mut ReconstructionSession) -> Result<()> {
    let input = session.require_input()?;
    let backgrounds = session
        .state
        .background_images
        .as_ref()
        .ok_or_else(|| anyhow!("background models not trained - run step_background first"))?;
    let cfg = session.config.subtraction;

    let result: Result<Vec<GrayImage>> = input
        .cameras
        .par_iter()
        .zip(backgrounds)
        .map(|(cam, bg)| Ok(extract_silhouette(&cam.scene_frame, bg, &cfg)?))
        .collect();

    match result {
        Ok(masks) => {
            let mut colors: Vec<RgbImage> = input
                .cameras
                .iter()
                .map(|cam| cam.scene_frame.clone())
                .collect();
            equalize_foreground_colors(&mut colors, &masks);

            let covered: usize = masks
                .iter()
                .map(|m| m.pixels().filter(|p| p[0] == FG).count())
                .sum();
            session.state.silhouettes = Some(masks);
            session.state.scene_colors = Some(colors);
            session.record(
                "silhouettes",
                true,
                format!("{} foreground pixels across the rig", covered),
            );
            Ok(())
        }
        Err(e) => {
            session.record("silhouettes", false, e.to_string());
            Err(e)
        }
    }
}

/// Project the voxel grid and carve it against the silhouettes.
pub fn step_reconstruct(session: &mut ReconstructionSession) -> Result<()> {
    let calibrations = session
        .state
        .calibrations
        .as_ref()
        .ok_or_else(|| anyhow!("calibration not run - run step_calibrate first"))?;
    let silhouettes = session
        .state
        .silhouettes
        .as_ref()
        .ok_or_else(|| anyhow!("silhouettes not computed - run step_silhouettes first"))?;
    let colors = session
        .state
        .scene_colors
        .as_ref()
        .ok_or_else(|| anyhow!("scene colors missing - run step_silhouettes first"))?;

    let cameras: Vec<_> = calibrations.iter().map(|p| p.to_rig_camera()).collect();
    let table = ProjectionTable::build(&session.config.grid, &cameras);

    match carve(&session.config.grid, &table, silhouettes, colors) {
        Ok(voxels) => {
            let notes = format!(
                "{} of {} voxels occupied",
                voxels.len(),
                session.config.grid.num_voxels()
            );
            session.state.voxels = Some(voxels);
            session.record("reconstruct", true, notes);
            Ok(())
        }
        Err(e) => {
            session.record("reconstruct", false, e.to_string());
            Err(e.into())
        }
    }
}

/// Run the full pipeline: calibrate → background → silhouettes → carve.
pub fn run_full(session: &mut ReconstructionSession) -> Result<()> {
    step_calibrate(session)?;
    step_background(session)?;
    step_silhouettes(session)?;
    step_reconstruct(session)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::{
        BrownConrady5, CameraIntrinsics, Iso3, PinholeCamera, Pt2, Pt3, Real,
    };
    use carve_targets::BoardSpec;
    use carve_voxel::{AxisRange, VoxelGrid};
    use image::Rgb;
    use nalgebra::{Rotation3, Translation3, UnitQuaternion};

    const W: u32 = 128;
    const H: u32 = 128;

    fn gt_camera() -> PinholeCamera {
        PinholeCamera::new(
            CameraIntrinsics {
                fx: 300.0,
                fy: 300.0,
                cx: 64.0,
                cy: 64.0,
                skew: 0.0,
            },
            BrownConrady5::default(),
        )
    }

    fn project_board(
        cam: &PinholeCamera,
        pose: &Iso3,
        board: &[Pt3],
    ) -> CorrespondenceView {
        let mut p2 = Vec::new();
        for pw in board {
            let px = cam.project_point(&pose.transform_point(pw)).unwrap();
            p2.push(Pt2::new(px.x, px.y));
        }
        CorrespondenceView::new(board.to_vec(), p2).unwrap()
    }

    fn pose(rx: Real, ry: Real, t: [Real; 3]) -> Iso3 {
        let rot = Rotation3::from_euler_angles(rx, ry, 0.0);
        Iso3::from_parts(
            Translation3::new(t[0], t[1], t[2]),
            UnitQuaternion::from_rotation_matrix(&rot),
        )
    }

    fn camera_input(world_pose: &Iso3) -> CameraInput {
        let cam = gt_camera();
        let board = BoardSpec {
            rows: 5,
            cols: 6,
            square_size: 0.08,
        };
        let board_points = board.object_points();

        // Handheld board poses for intrinsics.
        let calib_poses = [
            pose(0.15, 0.05, [-0.2, -0.15, 1.1]),
            pose(-0.1, 0.2, [-0.3, -0.2, 1.4]),
            pose(0.25, -0.1, [-0.15, -0.25, 0.9]),
            pose(0.05, 0.1, [-0.25, -0.1, 1.2]),
        ];
        let calibration_views: Vec<CorrespondenceView> = calib_poses
            .iter()
            .map(|p| project_board(&cam, p, &board_points))
            .collect();

        // The floor board defines the world frame.
        let floor = BoardSpec {
            rows: 6,
            cols: 8,
            square_size: 0.115,
        };
        let world_view = project_board(&cam, world_pose, &floor.object_points());

        let background = Rgb([50u8, 60, 70]);
        let background_frames: Vec<RgbImage> =
            (0..8).map(|_| RgbImage::from_pixel(W, H, background)).collect();
        // Scene frame differs everywhere: silhouettes cover the full frame.
        let scene_frame = RgbImage::from_pixel(W, H, Rgb([200, 80, 40]));

        CameraInput {
            image_width: W,
            image_height: H,
            calibration_views,
            world_view,
            background_frames,
            scene_frame,
        }
    }

    fn test_config() -> RigConfig {
        let mut cfg = RigConfig::default();
        cfg.num_cameras = 2;
        // Small grid under the board area so the test stays fast.
        cfg.grid = VoxelGrid {
            x: AxisRange::new(0.3, 0.5),
            y: AxisRange::new(0.2, 0.4),
            z: AxisRange::new(-0.1, 0.1),
            resolution: 5,
            index_scale: 0.05,
        };
        cfg
    }

    fn test_input() -> RigInput {
        let pose_a = pose(0.5, 0.0, [-0.4, -0.1, 2.0]);
        let pose_b = pose(0.45, 0.1, [-0.35, -0.05, 2.2]);
        RigInput::new(vec![camera_input(&pose_a), camera_input(&pose_b)]).unwrap()
    }

    #[test]
    fn full_pipeline_produces_voxels_and_log() {
        let mut session = ReconstructionSession::new(test_config());
        session.set_input(test_input()).unwrap();

        run_full(&mut session).unwrap();

        assert!(session.state.calibrations.is_some());
        assert!(session.state.voxels.is_some());
        assert!(
            !session.state.voxels.as_ref().unwrap().is_empty(),
            "full-frame silhouettes should keep in-frustum voxels"
        );

        let steps: Vec<&str> = session.log.iter().map(|e| e.step.as_str()).collect();
        assert_eq!(
            steps,
            vec!["calibrate", "background", "silhouettes", "reconstruct"]
        );
        assert!(session.log.iter().all(|e| e.success));
    }

    #[test]
    fn calibration_recovers_intrinsics() {
        let mut session = ReconstructionSession::new(test_config());
        session.set_input(test_input()).unwrap();

        step_calibrate(&mut session).unwrap();

        let calibs = session.state.calibrations.as_ref().unwrap();
        assert_eq!(calibs.len(), 2);
        for params in calibs {
            // Noise-free synthetic data: the linear pipeline lands close.
            assert!(
                (params.intrinsics.fx - 300.0).abs() < 30.0,
                "fx = {}",
                params.intrinsics.fx
            );
        }
    }

    #[test]
    fn report_carries_reprojection_and_coverage() {
        let mut session = ReconstructionSession::new(test_config());
        session.set_input(test_input()).unwrap();
        run_full(&mut session).unwrap();

        let report = session.export().unwrap();
        assert_eq!(report.cameras.len(), 2);
        for cam in &report.cameras {
            assert!(cam.mean_reproj_error < 2.0, "reproj {}", cam.mean_reproj_error);
            assert!(cam.silhouette_coverage > 0.95);
        }
        assert_eq!(report.voxel_count, session.state.voxels.as_ref().unwrap().len());
    }

    #[test]
    fn steps_enforce_ordering() {
        let mut session = ReconstructionSession::new(test_config());
        session.set_input(test_input()).unwrap();

        let err = step_silhouettes(&mut session).unwrap_err();
        assert!(err.to_string().contains("background"));

        let err = step_reconstruct(&mut session).unwrap_err();
        assert!(err.to_string().contains("calibrat"));
    }

    #[test]
    fn camera_count_mismatch_rejected() {
        let mut cfg = test_config();
        cfg.num_cameras = 4;
        let mut session = ReconstructionSession::new(cfg);
        assert!(session.set_input(test_input()).is_err());
    }

    #[test]
    fn outputs_written_to_disk() {
        let mut session = ReconstructionSession::new(test_config());
        session.set_input(test_input()).unwrap();
        run_full(&mut session).unwrap();

        let dir = tempfile::tempdir().unwrap();
        session.save_outputs(dir.path()).unwrap();

        assert!(dir.path().join("cam1/camera_properties.xml").exists());
        assert!(dir.path().join("cam2/camera_properties.xml").exists());
        assert!(dir.path().join("voxels.txt").exists());
        assert!(dir.path().join("voxels.ply").exists());
        assert!(dir.path().join("report.json").exists());
    }
}
