//! Closed-form intrinsics from plane homographies (Zhang's method).

use carve_core::{CameraIntrinsics, Mat3, Real};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntrinsicsInitError {
    #[error("need at least 3 homographies, got {0}")]
    NotEnoughHomographies(usize),
    #[error("svd failed")]
    SvdFailed,
    #[error("degenerate homography configuration")]
    DegenerateConfiguration,
}

/// Build the 6-vector v_ij(H) from Zhang's constraint equations.
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> nalgebra::SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    nalgebra::SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate camera intrinsics from a set of plane homographies using Zhang's
/// closed-form solution (no distortion).
///
/// Each homography contributes two constraints on the image of the absolute
/// conic B = K^-T K^-1; the stacked system `V b = 0` is solved by SVD and K
/// recovered from B in closed form.
pub fn estimate_intrinsics_from_homographies(
    hmtxs: &[Mat3],
) -> Result<CameraIntrinsics, IntrinsicsInitError> {
    if hmtxs.len() < 3 {
        return Err(IntrinsicsInitError::NotEnoughHomographies(hmtxs.len()));
    }

    let m = hmtxs.len();
    let mut vmtx = DMatrix::<Real>::zeros(2 * m, 6);

    for (k, hmtx) in hmtxs.iter().enumerate() {
        let v11 = v_ij(hmtx, 0, 0);
        let v22 = v_ij(hmtx, 1, 1);
        let v12 = v_ij(hmtx, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    let svd = vmtx.svd(false, true);
    let v_t = svd.v_t.ok_or(IntrinsicsInitError::SvdFailed)?;
    let b = v_t.row(v_t.nrows() - 1);

    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    // Closed-form recovery of K from B (Zhang, PAMI 2000, appendix B):
    //
    // v0 = (B12 B13 - B11 B23) / (B11 B22 - B12^2)
    // λ  = B33 - (B13^2 + v0 (B12 B13 - B11 B23)) / B11
    // α  = sqrt(λ / B11)
    // β  = sqrt(λ B11 / (B11 B22 - B12^2))
    // γ  = -B12 α^2 β / λ
    // u0 = γ v0 / β - B13 α^2 / λ

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm <= 1e-6 {
        return Err(IntrinsicsInitError::DegenerateConfiguration);
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    if lambda.signum() != b11.signum() {
        return Err(IntrinsicsInitError::DegenerateConfiguration);
    }

    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(CameraIntrinsics {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, Rotation3, Translation3, Vector3};

    fn board_homography(kmtx: &Mat3, rot: Rotation3<Real>, t: Vector3<Real>) -> Mat3 {
        let iso = Isometry3::from_parts(Translation3::from(t), rot.into());

        // For the Z=0 plane, H = K [r1 r2 t].
        let binding = iso.rotation.to_rotation_matrix();
        let r_mat = binding.matrix();

        let mut hmtx = Mat3::zeros();
        hmtx.set_column(0, &(kmtx * r_mat.column(0)));
        hmtx.set_column(1, &(kmtx * r_mat.column(1)));
        hmtx.set_column(2, &(kmtx * t));
        hmtx
    }

    #[test]
    fn recovers_intrinsics_from_three_views() {
        let k_gt = CameraIntrinsics {
            fx: 720.0,
            fy: 700.0,
            cx: 330.0,
            cy: 250.0,
            skew: 0.0,
        };
        let kmtx = k_gt.k_matrix();

        let hmtxs = vec![
            board_homography(
                &kmtx,
                Rotation3::from_euler_angles(0.15, 0.0, 0.05),
                Vector3::new(0.1, -0.05, 1.1),
            ),
            board_homography(
                &kmtx,
                Rotation3::from_euler_angles(-0.05, 0.2, -0.1),
                Vector3::new(-0.05, 0.1, 1.3),
            ),
            board_homography(
                &kmtx,
                Rotation3::from_euler_angles(0.25, -0.1, 0.0),
                Vector3::new(0.0, 0.0, 0.95),
            ),
        ];

        let k = estimate_intrinsics_from_homographies(&hmtxs).unwrap();

        assert!((k.fx - k_gt.fx).abs() < 5.0, "fx = {}", k.fx);
        assert!((k.fy - k_gt.fy).abs() < 5.0, "fy = {}", k.fy);
        assert!((k.cx - k_gt.cx).abs() < 10.0, "cx = {}", k.cx);
        assert!((k.cy - k_gt.cy).abs() < 10.0, "cy = {}", k.cy);
        assert!(k.skew.abs() < 1e-6, "skew = {}", k.skew);
    }

    #[test]
    fn two_views_are_not_enough() {
        let kmtx = Mat3::identity();
        let hmtxs = vec![kmtx, kmtx];
        assert!(matches!(
            estimate_intrinsics_from_homographies(&hmtxs),
            Err(IntrinsicsInitError::NotEnoughHomographies(2))
        ));
    }
}
