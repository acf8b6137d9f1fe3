//! Pose from a plane-induced homography.

use carve_core::{Iso3, Mat3, Real};
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanarPoseError {
    #[error("intrinsics matrix is not invertible")]
    IntrinsicsNotInvertible,
    #[error("svd failed while projecting onto SO(3)")]
    SvdFailed,
}

/// Decompose a homography `H = K [r1 r2 t]` into the pose of the board
/// (Z = 0 in its own frame) relative to the camera.
///
/// The first two columns of `K^-1 H` give the scaled rotation columns; the
/// reconstructed matrix is projected onto SO(3) by polar decomposition.
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PlanarPoseError> {
    let k_inv = kmtx
        .try_inverse()
        .ok_or(PlanarPoseError::IntrinsicsNotInvertible)?;

    let h1 = k_inv * hmtx.column(0);
    let h2 = k_inv * hmtx.column(1);
    let h3 = k_inv * hmtx.column(2);

    // Average the two column norms for the scale; they differ only by noise.
    // The sign is fixed so the board lies in front of the camera.
    let mut lambda = 2.0 / (h1.norm() + h2.norm());
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);

    let mut r_mat = Matrix3::<Real>::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    // Nearest rotation via SVD polar decomposition.
    let svd = r_mat.svd(true, true);
    let u = svd.u.ok_or(PlanarPoseError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PlanarPoseError::SvdFailed)?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t_vec: Vector3<Real> = h3 * lambda;
    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));

    Ok(Iso3::from_parts(Translation3::from(t_vec), rot))
}
