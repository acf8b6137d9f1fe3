//! Serializable per-camera parameter records.
//!
//! [`CameraParams`] is the on-disk unit the pipeline reads and writes for
//! each rig camera: intrinsics, distortion, and the world pose stored as a
//! rotation vector plus translation.

use nalgebra::{Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::{BrownConrady5, CameraIntrinsics, PinholeCamera, RigCamera};
use crate::math::{Iso3, Real};

/// World-to-camera pose as a Rodrigues rotation vector and translation.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CameraExtrinsics {
    pub rvec: [Real; 3],
    pub tvec: [Real; 3],
}

impl CameraExtrinsics {
    pub fn from_isometry(pose: &Iso3) -> Self {
        let rvec = pose.rotation.scaled_axis();
        let tvec = pose.translation.vector;
        Self {
            rvec: [rvec.x, rvec.y, rvec.z],
            tvec: [tvec.x, tvec.y, tvec.z],
        }
    }

    pub fn to_isometry(&self) -> Iso3 {
        let rot = Rotation3::from_scaled_axis(Vector3::new(
            self.rvec[0],
            self.rvec[1],
            self.rvec[2],
        ));
        Iso3::from_parts(
            Translation3::new(self.tvec[0], self.tvec[1], self.tvec[2]),
            UnitQuaternion::from_rotation_matrix(&rot),
        )
    }
}

/// Complete calibration record for one camera of the rig.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraParams {
    pub image_width: u32,
    pub image_height: u32,
    pub intrinsics: CameraIntrinsics,
    pub distortion: BrownConrady5,
    pub extrinsics: CameraExtrinsics,
}

impl CameraParams {
    /// Build the projecting camera this record describes.
    pub fn to_rig_camera(&self) -> RigCamera {
        RigCamera::new(
            PinholeCamera::new(self.intrinsics, self.distortion),
            self.extrinsics.to_isometry(),
            self.image_width,
            self.image_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrinsics_isometry_roundtrip() {
        let rot = Rotation3::from_euler_angles(0.2, -0.4, 0.1);
        let pose = Iso3::from_parts(
            Translation3::new(1.0, -2.0, 3.0),
            UnitQuaternion::from_rotation_matrix(&rot),
        );

        let ext = CameraExtrinsics::from_isometry(&pose);
        let back = ext.to_isometry();

        assert!((back.translation.vector - pose.translation.vector).norm() < 1e-12);
        assert!(back.rotation.angle_to(&pose.rotation) < 1e-12);
    }

    #[test]
    fn params_json_roundtrip() {
        let params = CameraParams {
            image_width: 644,
            image_height: 486,
            intrinsics: CameraIntrinsics {
                fx: 488.0,
                fy: 488.5,
                cx: 322.0,
                cy: 243.0,
                skew: 0.0,
            },
            distortion: BrownConrady5 {
                k1: -0.3,
                k2: 0.1,
                k3: 0.0,
                p1: 0.001,
                p2: -0.002,
                iters: 8,
            },
            extrinsics: CameraExtrinsics {
                rvec: [0.1, 0.2, 0.3],
                tvec: [10.0, 20.0, 1500.0],
            },
        };

        let json = serde_json::to_string_pretty(&params).unwrap();
        let de: CameraParams = serde_json::from_str(&json).unwrap();

        assert_eq!(de.image_width, params.image_width);
        assert!((de.intrinsics.fx - params.intrinsics.fx).abs() < 1e-12);
        assert!((de.distortion.k1 - params.distortion.k1).abs() < 1e-12);
        assert!((de.extrinsics.tvec[2] - params.extrinsics.tvec[2]).abs() < 1e-12);
    }

    #[test]
    fn rig_camera_from_params_projects() {
        let params = CameraParams {
            image_width: 640,
            image_height: 480,
            intrinsics: CameraIntrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                skew: 0.0,
            },
            distortion: BrownConrady5::default(),
            extrinsics: CameraExtrinsics {
                rvec: [0.0; 3],
                tvec: [0.0, 0.0, 4.0],
            },
        };

        let rig = params.to_rig_camera();
        let px = rig.project_world(&crate::math::Pt3::new(0.0, 0.0, 0.0)).unwrap();
        assert!((px.x - 320.0).abs() < 1e-9);
        assert!((px.y - 240.0).abs() < 1e-9);
    }
}
