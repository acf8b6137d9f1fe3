//! Alternating intrinsics/distortion estimation.
//!
//! Zhang's method assumes distortion-free observations; raw corner pixels
//! are distorted, so a single pass gives biased intrinsics. The loop here
//! alternates the two linear estimators:
//!
//! 1. Estimate K from the current pixels (Zhang).
//! 2. With K fixed, estimate distortion from homography residuals.
//! 3. Undistort the raw pixels, recompute homographies, re-estimate K.
//!
//! One or two rounds are enough for the narrow-lens rig cameras; the result
//! is what the rest of the pipeline projects through.

use carve_core::{
    from_homogeneous, to_homogeneous, BrownConrady5, CameraIntrinsics, Mat3, Pt2, Real,
};
use thiserror::Error;

use crate::distortion::{
    estimate_distortion_from_homographies, DistortionFitError, DistortionFitOptions,
    DistortionObservations,
};
use crate::homography::{dlt_homography, HomographyError};
use crate::intrinsics::{estimate_intrinsics_from_homographies, IntrinsicsInitError};

#[derive(Debug, Error)]
pub enum IterativeError {
    #[error("zhang intrinsics failed: {0}")]
    ZhangFailed(#[from] IntrinsicsInitError),
    #[error("distortion estimation failed: {0}")]
    DistortionFailed(#[from] DistortionFitError),
    #[error("homography estimation failed: {0}")]
    HomographyFailed(#[from] HomographyError),
    #[error("need at least 3 views, got {0}")]
    NotEnoughViews(usize),
}

/// One planar calibration view: board-plane points with observed pixels.
#[derive(Debug, Clone)]
pub struct CalibrationView {
    /// Coordinates on the board plane (Z = 0), in world units.
    pub board_points: Vec<Pt2>,
    /// Raw (distorted) pixel observations.
    pub pixel_points: Vec<Pt2>,
}

impl CalibrationView {
    pub fn new(board_points: Vec<Pt2>, pixel_points: Vec<Pt2>) -> Self {
        Self {
            board_points,
            pixel_points,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IterativeOptions {
    /// Refinement rounds after the initial Zhang pass.
    pub iterations: usize,
    pub distortion_opts: DistortionFitOptions,
    /// Force skew to zero after each intrinsics estimate.
    pub zero_skew: bool,
}

impl Default for IterativeOptions {
    fn default() -> Self {
        Self {
            iterations: 2,
            distortion_opts: DistortionFitOptions::default(),
            zero_skew: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IterativeResult {
    pub intrinsics: CameraIntrinsics,
    pub distortion: BrownConrady5,
    /// Estimate after each round; index 0 is the plain Zhang pass.
    pub intrinsics_history: Vec<CameraIntrinsics>,
}

fn undistort_pixels(
    k: &CameraIntrinsics,
    dist: &BrownConrady5,
    pixels: &[Pt2],
) -> Result<Vec<Pt2>, DistortionFitError> {
    let kmtx = k.k_matrix();
    let k_inv = kmtx
        .try_inverse()
        .ok_or(DistortionFitError::IntrinsicsNotInvertible)?;

    Ok(pixels
        .iter()
        .map(|p| {
            let n_dist = from_homogeneous(&(k_inv * to_homogeneous(p)));
            let n_undist = dist.undistort(&n_dist.coords);
            from_homogeneous(&(kmtx * carve_core::Vec3::new(n_undist.x, n_undist.y, 1.0)))
        })
        .collect())
}

fn homographies_for(
    views: &[CalibrationView],
    pixels: impl Fn(&CalibrationView) -> Result<Vec<Pt2>, IterativeError>,
) -> Result<Vec<Mat3>, IterativeError> {
    views
        .iter()
        .map(|v| {
            let px = pixels(v)?;
            dlt_homography(&v.board_points, &px).map_err(IterativeError::from)
        })
        .collect()
}

fn zero_skew(mut k: CameraIntrinsics, enabled: bool) -> CameraIntrinsics {
    if enabled {
        k.skew = 0.0;
    }
    k
}

/// Estimate intrinsics and distortion by alternating linear passes.
pub fn estimate_intrinsics_iterative(
    views: &[CalibrationView],
    opts: IterativeOptions,
) -> Result<IterativeResult, IterativeError> {
    if views.len() < 3 {
        return Err(IterativeError::NotEnoughViews(views.len()));
    }

    // Round 0: Zhang on the raw (distorted) pixels.
    let raw_homographies = homographies_for(views, |v| Ok(v.pixel_points.clone()))?;
    let mut intrinsics = zero_skew(
        estimate_intrinsics_from_homographies(&raw_homographies)?,
        opts.zero_skew,
    );
    let mut distortion = BrownConrady5 {
        iters: opts.distortion_opts.iters,
        ..BrownConrady5::default()
    };

    let mut history = vec![intrinsics];

    for round in 0..opts.iterations {
        // Homographies from the current best pixel estimates.
        let homographies = if round == 0 {
            raw_homographies.clone()
        } else {
            homographies_for(views, |v| {
                undistort_pixels(&intrinsics, &distortion, &v.pixel_points)
                    .map_err(IterativeError::from)
            })?
        };

        // Distortion from residuals against the raw observations.
        let kmtx = intrinsics.k_matrix();
        let obs: Result<Vec<_>, _> = views
            .iter()
            .zip(&homographies)
            .map(|(v, h)| {
                DistortionObservations::new(*h, v.board_points.clone(), v.pixel_points.clone())
            })
            .collect();
        distortion =
            estimate_distortion_from_homographies(&kmtx, &obs?, opts.distortion_opts)?;

        // Re-estimate K from undistorted pixels.
        let corrected = homographies_for(views, |v| {
            undistort_pixels(&intrinsics, &distortion, &v.pixel_points)
                .map_err(IterativeError::from)
        })?;
        intrinsics = zero_skew(
            estimate_intrinsics_from_homographies(&corrected)?,
            opts.zero_skew,
        );
        history.push(intrinsics);
    }

    Ok(IterativeResult {
        intrinsics,
        distortion,
        intrinsics_history: history,
    })
}
