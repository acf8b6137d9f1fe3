//! Building [`RigInput`] from a data directory.
//!
//! Expected layout, one directory per camera:
//!
//! ```text
//! data/
//!   cam1/
//!     intrinsics/   frame_*.png   board views for intrinsic calibration
//!     extrinsics/   frame_*.png   view(s) of the floor board
//!     background/   frame_*.png   background-only clip
//!     video/        frame_*.png   the scene clip
//!   cam2/ ...
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use carve_core::CorrespondenceView;
use carve_targets::{detect_board, BoardSpec, DetectorConfig};
use image::GrayImage;

use crate::config::RigConfig;
use crate::frames;
use crate::input::{CameraInput, RigInput};

fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(img.to_luma8())
}

/// Detect the board in every frame of a directory, skipping failures.
fn detect_views(
    dir: &Path,
    board: &BoardSpec,
    detector: &DetectorConfig,
) -> Result<Vec<CorrespondenceView>> {
    let mut views = Vec::new();
    let mut skipped = 0usize;

    for path in frames::list_frames(dir)? {
        let gray = load_gray(&path)?;
        match detect_board(&gray, board, detector) {
            Some(detection) => views.push(detection.correspondences(board)?),
            None => {
                skipped += 1;
                log::warn!("no board found in {}", path.display());
            }
        }
    }

    log::info!(
        "{}: {} board views ({} skipped)",
        dir.display(),
        views.len(),
        skipped
    );
    Ok(views)
}

fn load_camera_input(dir: &Path, config: &RigConfig) -> Result<CameraInput> {
    let layout = &config.data;

    let calibration_views = detect_views(
        &dir.join(&layout.intrinsics_dir),
        &config.board,
        &config.detector,
    )?;
    if calibration_views.len() < 3 {
        bail!(
            "{}: only {} usable calibration views, need at least 3",
            dir.display(),
            calibration_views.len()
        );
    }

    let world_views = detect_views(
        &dir.join(&layout.extrinsics_dir),
        &config.board,
        &config.detector,
    )?;
    let Some(world_view) = world_views.into_iter().next() else {
        bail!("{}: floor board not detected in any frame", dir.display());
    };

    let background_frames = frames::load_frames(&dir.join(&layout.background_dir))?;

    let scene_paths = frames::list_frames(&dir.join(&layout.scene_dir))?;
    let Some(scene_path) = scene_paths.get(layout.scene_frame_index) else {
        bail!(
            "{}: scene frame index {} out of range ({} frames)",
            dir.display(),
            layout.scene_frame_index,
            scene_paths.len()
        );
    };
    let scene_frame = frames::load_frame(scene_path)?;
    let (image_width, image_height) = scene_frame.dimensions();

    Ok(CameraInput {
        image_width,
        image_height,
        calibration_views,
        world_view,
        background_frames,
        scene_frame,
    })
}

/// Load every camera's data from `root/cam1`, `root/cam2`, ...
pub fn load_rig_input(root: &Path, config: &RigConfig) -> Result<RigInput> {
    let cameras = (1..=config.num_cameras)
        .map(|i| {
            let dir = root.join(format!("cam{}", i));
            load_camera_input(&dir, config)
                .with_context(|| format!("failed to load camera {}", i))
        })
        .collect::<Result<Vec<_>>>()?;
    RigInput::new(cameras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    /// Axis-aligned chessboard render, as the detector tests use.
    fn board_image(spec: &BoardSpec, square_px: u32, margin: u32) -> GrayImage {
        let w = margin * 2 + (spec.cols + 1) * square_px;
        let h = margin * 2 + (spec.rows + 1) * square_px;
        let mut img = GrayImage::from_pixel(w, h, Luma([160u8]));
        for sy in 0..spec.rows + 1 {
            for sx in 0..spec.cols + 1 {
                let shade = if (sx + sy) % 2 == 0 { 40u8 } else { 220u8 };
                for y in 0..square_px {
                    for x in 0..square_px {
                        img.put_pixel(margin + sx * square_px + x, margin + sy * square_px + y, Luma([shade]));
                    }
                }
            }
        }
        img
    }

    fn write_camera_dir(dir: &Path, config: &RigConfig) {
        let board = board_image(&config.board, 20, 24);
        let (w, h) = board.dimensions();

        let intr = dir.join(&config.data.intrinsics_dir);
        std::fs::create_dir_all(&intr).unwrap();
        for i in 0..3 {
            board.save(intr.join(format!("frame_{}.png", i))).unwrap();
        }

        let extr = dir.join(&config.data.extrinsics_dir);
        std::fs::create_dir_all(&extr).unwrap();
        board.save(extr.join("frame_0.png")).unwrap();

        let bg = dir.join(&config.data.background_dir);
        std::fs::create_dir_all(&bg).unwrap();
        for i in 0..2 {
            RgbImage::from_pixel(w, h, Rgb([40, 40, 40]))
                .save(bg.join(format!("frame_{}.png", i)))
                .unwrap();
        }

        let scene = dir.join(&config.data.scene_dir);
        std::fs::create_dir_all(&scene).unwrap();
        RgbImage::from_pixel(w, h, Rgb([200, 60, 60]))
            .save(scene.join("frame_0.png"))
            .unwrap();
    }

    fn small_board_config() -> RigConfig {
        let mut cfg = RigConfig::default();
        cfg.num_cameras = 1;
        cfg.board = BoardSpec {
            rows: 4,
            cols: 5,
            square_size: 30.0,
        };
        cfg
    }

    #[test]
    fn loads_a_complete_camera_directory() {
        let root = tempfile::tempdir().unwrap();
        let cfg = small_board_config();
        write_camera_dir(&root.path().join("cam1"), &cfg);

        let input = load_rig_input(root.path(), &cfg).unwrap();
        assert_eq!(input.num_cameras(), 1);

        let cam = &input.cameras[0];
        assert_eq!(cam.calibration_views.len(), 3);
        assert_eq!(cam.world_view.len(), cfg.board.num_corners());
        assert_eq!(cam.background_frames.len(), 2);
    }

    #[test]
    fn missing_camera_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let cfg = small_board_config();
        let err = load_rig_input(root.path(), &cfg).unwrap_err();
        assert!(err.to_string().contains("camera 1"));
    }

    #[test]
    fn undetectable_board_frames_fail_with_context() {
        let root = tempfile::tempdir().unwrap();
        let cfg = small_board_config();
        let cam_dir = root.path().join("cam1");
        write_camera_dir(&cam_dir, &cfg);

        // Replace intrinsics frames with blanks: no board to detect.
        let intr = cam_dir.join(&cfg.data.intrinsics_dir);
        for entry in std::fs::read_dir(&intr).unwrap() {
            let p = entry.unwrap().path();
            GrayImage::from_pixel(64, 64, Luma([128u8])).save(&p).unwrap();
        }

        let err = load_rig_input(root.path(), &cfg).unwrap_err();
        assert!(format!("{:#}", err).contains("calibration views"));
    }
}
