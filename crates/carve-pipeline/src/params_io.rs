//! Camera parameter files.
//!
//! Each calibrated camera is written as a `camera_properties.xml` next to
//! its data (the rig's established format: flat scalar fields for
//! intrinsics, distortion, and the Rodrigues pose), with a JSON variant for
//! tooling that prefers it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use carve_core::{BrownConrady5, CameraExtrinsics, CameraIntrinsics, CameraParams};
use serde::{Deserialize, Serialize};

/// Flat serialization schema of [`CameraParams`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraProperties {
    pub image_width: u32,
    pub image_height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub p1: f64,
    pub p2: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

impl From<&CameraParams> for CameraProperties {
    fn from(p: &CameraParams) -> Self {
        Self {
            image_width: p.image_width,
            image_height: p.image_height,
            fx: p.intrinsics.fx,
            fy: p.intrinsics.fy,
            cx: p.intrinsics.cx,
            cy: p.intrinsics.cy,
            skew: p.intrinsics.skew,
            k1: p.distortion.k1,
            k2: p.distortion.k2,
            k3: p.distortion.k3,
            p1: p.distortion.p1,
            p2: p.distortion.p2,
            rx: p.extrinsics.rvec[0],
            ry: p.extrinsics.rvec[1],
            rz: p.extrinsics.rvec[2],
            tx: p.extrinsics.tvec[0],
            ty: p.extrinsics.tvec[1],
            tz: p.extrinsics.tvec[2],
        }
    }
}

impl CameraProperties {
    pub fn to_params(&self) -> CameraParams {
        CameraParams {
            image_width: self.image_width,
            image_height: self.image_height,
            intrinsics: CameraIntrinsics {
                fx: self.fx,
                fy: self.fy,
                cx: self.cx,
                cy: self.cy,
                skew: self.skew,
            },
            distortion: BrownConrady5 {
                k1: self.k1,
                k2: self.k2,
                k3: self.k3,
                p1: self.p1,
                p2: self.p2,
                iters: 8,
            },
            extrinsics: CameraExtrinsics {
                rvec: [self.rx, self.ry, self.rz],
                tvec: [self.tx, self.ty, self.tz],
            },
        }
    }
}

/// Write a camera's `camera_properties.xml`.
pub fn save_camera_xml(path: &Path, params: &CameraParams) -> Result<()> {
    let props = CameraProperties::from(params);
    let xml = quick_xml::se::to_string(&props).context("failed to serialize camera XML")?;
    fs::write(path, xml).with_context(|| format!("failed to write {}", path.display()))
}

/// Read a `camera_properties.xml` back.
pub fn load_camera_xml(path: &Path) -> Result<CameraParams> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let props: CameraProperties =
        quick_xml::de::from_str(&data).context("failed to parse camera XML")?;
    Ok(props.to_params())
}

/// JSON variant of the same record.
pub fn save_camera_json(path: &Path, params: &CameraParams) -> Result<()> {
    let json = serde_json::to_string_pretty(&CameraProperties::from(params))?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_camera_json(path: &Path) -> Result<CameraParams> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let props: CameraProperties = serde_json::from_str(&data)?;
    Ok(props.to_params())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> CameraParams {
        CameraParams {
            image_width: 644,
            image_height: 486,
            intrinsics: CameraIntrinsics {
                fx: 487.0,
                fy: 488.5,
                cx: 321.0,
                cy: 242.0,
                skew: 0.0,
            },
            distortion: BrownConrady5 {
                k1: -0.32,
                k2: 0.12,
                k3: 0.0,
                p1: 0.0008,
                p2: -0.0011,
                iters: 8,
            },
            extrinsics: CameraExtrinsics {
                rvec: [1.1, -0.2, 0.05],
                tvec: [-120.0, 80.0, 2600.0],
            },
        }
    }

    #[test]
    fn xml_roundtrip_preserves_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera_properties.xml");

        let params = sample_params();
        save_camera_xml(&path, &params).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<fx>487</fx>") || text.contains("<fx>487.0</fx>"));

        let loaded = load_camera_xml(&path).unwrap();
        assert_eq!(loaded.image_width, 644);
        assert!((loaded.intrinsics.fy - 488.5).abs() < 1e-12);
        assert!((loaded.distortion.k1 + 0.32).abs() < 1e-12);
        assert!((loaded.extrinsics.tvec[2] - 2600.0).abs() < 1e-12);
    }

    #[test]
    fn json_roundtrip_preserves_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera_properties.json");

        let params = sample_params();
        save_camera_json(&path, &params).unwrap();
        let loaded = load_camera_json(&path).unwrap();

        assert!((loaded.extrinsics.rvec[0] - 1.1).abs() < 1e-12);
        assert!((loaded.intrinsics.cx - 321.0).abs() < 1e-12);
    }

    #[test]
    fn poses_survive_the_flat_schema() {
        let params = sample_params();
        let props = CameraProperties::from(&params);
        let back = props.to_params();

        let pose_a = params.extrinsics.to_isometry();
        let pose_b = back.extrinsics.to_isometry();
        assert!(pose_a.rotation.angle_to(&pose_b.rotation) < 1e-12);
        assert!((pose_a.translation.vector - pose_b.translation.vector).norm() < 1e-12);
    }
}
