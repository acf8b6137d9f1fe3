//! Linear distortion estimation from homography residuals.
//!
//! With intrinsics K fixed, the residual between a homography-predicted
//! pixel and the observed pixel, expressed in normalized coordinates, is a
//! linear function of the Brown-Conrady coefficients. Stacking every
//! correspondence of every view gives an overdetermined system solved by
//! SVD. The estimate is initialization-grade: accurate enough to undistort
//! observations for another Zhang pass, not a final refinement.

use carve_core::{from_homogeneous, to_homogeneous, BrownConrady5, Mat3, Pt2, Real, Vec2};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy)]
pub enum DistortionFitError {
    #[error("need at least {0} points for distortion estimation, got {1}")]
    NotEnoughPoints(usize, usize),
    #[error("svd failed during distortion estimation")]
    SvdFailed,
    #[error("intrinsics matrix is not invertible")]
    IntrinsicsNotInvertible,
    #[error("degenerate configuration: all points near the image center")]
    DegenerateConfiguration,
}

/// Options controlling which coefficients are estimated.
#[derive(Debug, Clone, Copy)]
pub struct DistortionFitOptions {
    /// Fix tangential coefficients (p1, p2) to zero.
    pub fix_tangential: bool,
    /// Fix the r^6 radial coefficient (k3) to zero. It overfits easily on
    /// narrow-lens rig footage, so the default keeps it out.
    pub fix_k3: bool,
    /// Undistortion iterations stored on the returned model.
    pub iters: u32,
}

impl Default for DistortionFitOptions {
    fn default() -> Self {
        Self {
            fix_tangential: false,
            fix_k3: true,
            iters: 8,
        }
    }
}

/// One view's inputs: a homography computed from *distorted* pixels together
/// with the raw correspondences that produced it.
#[derive(Debug, Clone)]
pub struct DistortionObservations {
    pub homography: Mat3,
    pub board_points: Vec<Pt2>,
    pub pixel_points: Vec<Pt2>,
}

impl DistortionObservations {
    pub fn new(
        homography: Mat3,
        board_points: Vec<Pt2>,
        pixel_points: Vec<Pt2>,
    ) -> Result<Self, DistortionFitError> {
        if board_points.len() != pixel_points.len() {
            return Err(DistortionFitError::NotEnoughPoints(
                board_points.len(),
                pixel_points.len(),
            ));
        }
        Ok(Self {
            homography,
            board_points,
            pixel_points,
        })
    }
}

fn normalized(k_inv: &Mat3, p: &Pt2) -> Vec2 {
    let h = k_inv * to_homogeneous(p);
    let n = from_homogeneous(&h);
    Vec2::new(n.x, n.y)
}

/// Estimate Brown-Conrady coefficients given fixed intrinsics.
pub fn estimate_distortion_from_homographies(
    intrinsics: &Mat3,
    views: &[DistortionObservations],
    opts: DistortionFitOptions,
) -> Result<BrownConrady5, DistortionFitError> {
    let total_points: usize = views.iter().map(|v| v.board_points.len()).sum();

    let n_params: usize = match (opts.fix_tangential, opts.fix_k3) {
        (true, true) => 2,
        (true, false) => 3,
        (false, true) => 4,
        (false, false) => 5,
    };

    let min_points = n_params.div_ceil(2) + 2;
    if total_points < min_points {
        return Err(DistortionFitError::NotEnoughPoints(min_points, total_points));
    }

    let k_inv = intrinsics
        .try_inverse()
        .ok_or(DistortionFitError::IntrinsicsNotInvertible)?;

    let mut a = DMatrix::<Real>::zeros(2 * total_points, n_params);
    let mut b = DVector::<Real>::zeros(2 * total_points);

    let mut max_r2: Real = 0.0;
    let mut row = 0;
    for view in views {
        for (board_pt, pixel_obs) in view.board_points.iter().zip(&view.pixel_points) {
            let ideal_px = from_homogeneous(&(view.homography * to_homogeneous(board_pt)));
            let n_ideal = normalized(&k_inv, &ideal_px);
            let n_obs = normalized(&k_inv, pixel_obs);

            // The residual in normalized coordinates carries the distortion.
            let residual = n_obs - n_ideal;

            let (x, y) = (n_ideal.x, n_ideal.y);
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            max_r2 = max_r2.max(r2);

            let mut col = 0;

            a[(row, col)] = x * r2;
            a[(row + 1, col)] = y * r2;
            col += 1;

            a[(row, col)] = x * r4;
            a[(row + 1, col)] = y * r4;
            col += 1;

            if !opts.fix_k3 {
                let r6 = r4 * r2;
                a[(row, col)] = x * r6;
                a[(row + 1, col)] = y * r6;
                col += 1;
            }

            if !opts.fix_tangential {
                let xy = x * y;
                a[(row, col)] = 2.0 * xy;
                a[(row + 1, col)] = r2 + 2.0 * y * y;
                col += 1;

                a[(row, col)] = r2 + 2.0 * x * x;
                a[(row + 1, col)] = 2.0 * xy;
            }

            b[row] = residual.x;
            b[row + 1] = residual.y;
            row += 2;
        }
    }

    if max_r2 < 1e-6 {
        return Err(DistortionFitError::DegenerateConfiguration);
    }

    let svd = a.svd(true, true);
    let x = svd
        .solve(&b, 1e-10)
        .map_err(|_| DistortionFitError::SvdFailed)?;

    let mut col = 0;
    let k1 = x[col];
    col += 1;
    let k2 = x[col];
    col += 1;
    let k3 = if opts.fix_k3 {
        0.0
    } else {
        let v = x[col];
        col += 1;
        v
    };
    let (p1, p2) = if opts.fix_tangential {
        (0.0, 0.0)
    } else {
        (x[col], x[col + 1])
    };

    Ok(BrownConrady5 {
        k1,
        k2,
        k3,
        p1,
        p2,
        iters: opts.iters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::Vec3;
    use nalgebra::{Isometry3, Rotation3, Translation3, Vector3};

    fn kmtx() -> Mat3 {
        Mat3::new(700.0, 0.0, 320.0, 0.0, 700.0, 240.0, 0.0, 0.0, 1.0)
    }

    fn board_grid() -> Vec<Pt2> {
        let mut pts = Vec::new();
        for j in 0..6 {
            for i in 0..8 {
                pts.push(Pt2::new(i as Real * 30.0, j as Real * 30.0));
            }
        }
        pts
    }

    fn view_with_distortion(
        kmtx: &Mat3,
        dist: &BrownConrady5,
        rot: Rotation3<Real>,
        t: Vector3<Real>,
        board: &[Pt2],
    ) -> DistortionObservations {
        let iso = Isometry3::from_parts(Translation3::from(t), rot.into());

        let mut pixels = Vec::new();
        for bp in board {
            let p3d = iso.transform_point(&nalgebra::Point3::new(bp.x, bp.y, 0.0));
            let n_undist = Vec2::new(p3d.x / p3d.z, p3d.y / p3d.z);
            let n_dist = dist.distort(&n_undist);
            let px = from_homogeneous(&(kmtx * Vec3::new(n_dist.x, n_dist.y, 1.0)));
            pixels.push(px);
        }

        // The distortion-free homography H = K [r1 r2 t].
        let binding = iso.rotation.to_rotation_matrix();
        let r_mat = binding.matrix();
        let mut hmtx = Mat3::zeros();
        hmtx.set_column(0, &(kmtx * r_mat.column(0)));
        hmtx.set_column(1, &(kmtx * r_mat.column(1)));
        hmtx.set_column(2, &(kmtx * t));

        DistortionObservations::new(hmtx, board.to_vec(), pixels).unwrap()
    }

    #[test]
    fn radial_coefficients_recovered() {
        let kmtx = kmtx();
        let dist_gt = BrownConrady5 {
            k1: -0.22,
            k2: 0.06,
            k3: 0.0,
            p1: 0.0,
            p2: 0.0,
            iters: 8,
        };
        let board = board_grid();

        let poses = [
            (
                Rotation3::from_euler_angles(0.1, 0.0, 0.05),
                Vector3::new(100.0, -50.0, 1000.0),
            ),
            (
                Rotation3::from_euler_angles(-0.05, 0.15, -0.1),
                Vector3::new(-50.0, 100.0, 1200.0),
            ),
            (
                Rotation3::from_euler_angles(0.2, -0.1, 0.0),
                Vector3::new(0.0, 0.0, 900.0),
            ),
        ];

        let views: Vec<_> = poses
            .iter()
            .map(|(rot, t)| view_with_distortion(&kmtx, &dist_gt, *rot, *t, &board))
            .collect();

        let opts = DistortionFitOptions {
            fix_tangential: true,
            fix_k3: true,
            iters: 8,
        };
        let est = estimate_distortion_from_homographies(&kmtx, &views, opts).unwrap();

        assert!((est.k1 - dist_gt.k1).abs() < 0.1, "k1 = {}", est.k1);
        assert!((est.k2 - dist_gt.k2).abs() < 0.04, "k2 = {}", est.k2);
        assert_eq!(est.k3, 0.0);
        assert_eq!(est.p1, 0.0);
        assert_eq!(est.p2, 0.0);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let r = DistortionObservations::new(
            Mat3::identity(),
            vec![Pt2::new(0.0, 0.0)],
            vec![],
        );
        assert!(r.is_err());
    }

    #[test]
    fn singular_intrinsics_rejected() {
        let board = board_grid();
        let views = vec![DistortionObservations::new(
            Mat3::identity(),
            board.clone(),
            board,
        )
        .unwrap()];
        let res = estimate_distortion_from_homographies(
            &Mat3::zeros(),
            &views,
            DistortionFitOptions::default(),
        );
        assert!(matches!(
            res,
            Err(DistortionFitError::IntrinsicsNotInvertible)
        ));
    }
}
