//! Rig extrinsics from the world-frame board.
//!
//! The world coordinate frame of the rig is defined by a chessboard lying on
//! the floor of the capture volume. Each camera observes that board once;
//! undistorting the observed corners and decomposing the board-to-image
//! homography gives the world-to-camera pose directly, because the board
//! frame *is* the world frame.

use carve_core::{
    from_homogeneous, to_homogeneous, BrownConrady5, CameraIntrinsics, CorrespondenceView, Iso3,
    Pt2,
};
use thiserror::Error;

use crate::homography::{dlt_homography, HomographyError};
use crate::planar_pose::{pose_from_homography, PlanarPoseError};

#[derive(Debug, Error)]
pub enum ExtrinsicsError {
    #[error("homography estimation failed: {0}")]
    HomographyFailed(#[from] HomographyError),
    #[error("pose decomposition failed: {0}")]
    PoseFailed(#[from] PlanarPoseError),
    #[error("intrinsics matrix is not invertible")]
    IntrinsicsNotInvertible,
}

/// Estimate the world-to-camera pose of one rig camera from its view of the
/// world-frame board.
///
/// `view.points_3d` must lie in the world Z = 0 plane (the floor board);
/// `view.points_2d` are raw distorted pixels.
pub fn estimate_rig_extrinsics(
    view: &CorrespondenceView,
    intrinsics: &CameraIntrinsics,
    distortion: &BrownConrady5,
) -> Result<Iso3, ExtrinsicsError> {
    let kmtx = intrinsics.k_matrix();
    let k_inv = kmtx
        .try_inverse()
        .ok_or(ExtrinsicsError::IntrinsicsNotInvertible)?;

    // Undistort the observations so the homography is distortion-free.
    let undistorted: Vec<Pt2> = view
        .points_2d
        .iter()
        .map(|p| {
            let n_dist = from_homogeneous(&(k_inv * to_homogeneous(p)));
            let n_undist = distortion.undistort(&n_dist.coords);
            from_homogeneous(&(kmtx * carve_core::Vec3::new(n_undist.x, n_undist.y, 1.0)))
        })
        .collect();

    let board = view.board_points_2d();
    let hmtx = dlt_homography(&board, &undistorted)?;
    Ok(pose_from_homography(&kmtx, &hmtx)?)
}
