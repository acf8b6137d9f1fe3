use carve_core::{Mat3, Pt2, Real};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("svd failed")]
    SvdFailed,
}

/// Estimate H such that `image ~ H · plane` using the direct linear transform.
pub fn dlt_homography(plane: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = plane.len();
    if n < 4 || image.len() != n {
        return Err(HomographyError::NotEnoughPoints(n.min(image.len())));
    }

    let mut a = DMatrix::<Real>::zeros(2 * n, 9);

    for (i, (pw, pi)) in plane.iter().zip(image.iter()).enumerate() {
        let (x, y) = (pw.x, pw.y);
        let (u, v) = (pi.x, pi.y);

        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Null vector of A via SVD: row of V^T with the smallest singular value.
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let h = v_t.row(v_t.nrows() - 1);

    let mut hmtx = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            hmtx[(r, c)] = h[3 * r + c];
        }
    }

    // normalise such that H[2,2] = 1
    let scale = hmtx[(2, 2)];
    if scale.abs() > Real::EPSILON {
        hmtx /= scale;
    }

    Ok(hmtx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::{from_homogeneous, to_homogeneous};

    #[test]
    fn recovers_pure_scaling() {
        let plane = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let image: Vec<Pt2> = plane.iter().map(|p| Pt2::new(3.0 * p.x, 3.0 * p.y)).collect();

        let h = dlt_homography(&plane, &image).unwrap();
        assert!((h[(0, 0)] - 3.0).abs() < 1e-9);
        assert!((h[(1, 1)] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn maps_general_quad() {
        let plane = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(2.0, 0.0),
            Pt2::new(2.0, 1.0),
            Pt2::new(0.0, 1.0),
            Pt2::new(1.0, 0.5),
        ];
        let image = vec![
            Pt2::new(100.0, 120.0),
            Pt2::new(300.0, 110.0),
            Pt2::new(310.0, 220.0),
            Pt2::new(95.0, 230.0),
            Pt2::new(201.0, 170.0),
        ];

        let h = dlt_homography(&plane, &image).unwrap();
        for (pw, pi) in plane.iter().zip(image.iter()) {
            let mapped = from_homogeneous(&(h * to_homogeneous(pw)));
            assert!(
                (mapped - pi).norm() < 5.0,
                "mapped {:?} far from {:?}",
                mapped,
                pi
            );
        }
    }

    #[test]
    fn too_few_points_is_error() {
        let pts = vec![Pt2::new(0.0, 0.0), Pt2::new(1.0, 0.0), Pt2::new(1.0, 1.0)];
        assert!(matches!(
            dlt_homography(&pts, &pts),
            Err(HomographyError::NotEnoughPoints(3))
        ));
    }
}
