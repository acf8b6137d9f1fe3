//! The rig camera model.
//!
//! A [`PinholeCamera`] maps camera-frame points to pixels through the chain
//! `K ∘ distort ∘ perspective-divide`; a [`RigCamera`] additionally carries
//! the world pose and image bounds so the voxel stage can project world
//! points and test them against a silhouette in one call.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::math::{Iso3, Mat3, Pt3, Real, Vec2, Vec3};

/// Pinhole intrinsics mapping normalized image coordinates to pixels.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
    /// Skew term (typically 0).
    pub skew: Real,
}

impl CameraIntrinsics {
    /// Return the 3×3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, self.skew, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0,
        )
    }

    /// Normalized image coordinates into pixel coordinates.
    pub fn to_pixel(&self, n: &Vec2) -> Vec2 {
        Vec2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    /// Pixel coordinates into normalized image coordinates.
    pub fn from_pixel(&self, px: &Vec2) -> Vec2 {
        let ny = (px.y - self.cy) / self.fy;
        let nx = (px.x - self.cx - self.skew * ny) / self.fx;
        Vec2::new(nx, ny)
    }
}

/// Brown-Conrady distortion with three radial and two tangential terms.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub k3: Real,
    pub p1: Real,
    pub p2: Real,
    /// Fixed-point iterations used by [`undistort`](Self::undistort).
    pub iters: u32,
}

impl BrownConrady5 {
    fn apply(&self, x: Real, y: Real) -> (Real, Real) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Distort normalized undistorted coordinates.
    pub fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let (xd, yd) = self.apply(n_undist.x, n_undist.y);
        Vec2::new(xd, yd)
    }

    /// Invert the distortion via fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        let iters = if self.iters == 0 { 8 } else { self.iters };
        for _ in 0..iters {
            let (xd, yd) = self.apply(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vec2::new(x, y)
    }
}

/// A ray through the camera center, direction in the camera frame.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub dir: Vec3,
}

/// Intrinsic camera model: pinhole projection with lens distortion.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub k: CameraIntrinsics,
    pub dist: BrownConrady5,
}

impl PinholeCamera {
    pub fn new(k: CameraIntrinsics, dist: BrownConrady5) -> Self {
        Self { k, dist }
    }

    /// Project a camera-frame direction to a pixel.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project_dir(&self, dir: &Vec3) -> Option<Vec2> {
        if dir.z <= 0.0 {
            return None;
        }
        let n_undist = Vec2::new(dir.x / dir.z, dir.y / dir.z);
        let n_dist = self.dist.distort(&n_undist);
        Some(self.k.to_pixel(&n_dist))
    }

    /// Project a camera-frame point to a pixel.
    pub fn project_point(&self, p_c: &Pt3) -> Option<Vec2> {
        self.project_dir(&p_c.coords)
    }

    /// Back-project a pixel to a unit ray in the camera frame.
    pub fn backproject_pixel(&self, px: &Vec2) -> Ray {
        let n_dist = self.k.from_pixel(px);
        let n_undist = self.dist.undistort(&n_dist);
        let dir = Vec3::new(n_undist.x, n_undist.y, 1.0);
        Ray {
            dir: dir / dir.norm(),
        }
    }
}

/// A calibrated camera of the rig: intrinsic model, world pose, image bounds.
///
/// `pose` maps world coordinates into the camera frame.
#[derive(Clone, Debug)]
pub struct RigCamera {
    pub camera: PinholeCamera,
    pub pose: Iso3,
    pub width: u32,
    pub height: u32,
}

impl RigCamera {
    pub fn new(camera: PinholeCamera, pose: Iso3, width: u32, height: u32) -> Self {
        Self {
            camera,
            pose,
            width,
            height,
        }
    }

    /// Project a world point to continuous pixel coordinates.
    pub fn project_world(&self, p_w: &Pt3) -> Option<Vec2> {
        let p_c = self.pose.transform_point(p_w);
        self.camera.project_point(&p_c)
    }

    /// Project a world point to an integer pixel inside the image, or `None`
    /// when the point is behind the camera or falls outside the bounds.
    pub fn project_to_pixel(&self, p_w: &Pt3) -> Option<(u32, u32)> {
        let px = self.project_world(p_w)?;
        let u = px.x.floor();
        let v = px.y.floor();
        if u < 0.0 || v < 0.0 || u >= self.width as Real || v >= self.height as Real {
            return None;
        }
        Some((u as u32, v as u32))
    }

    /// Camera center in world coordinates.
    pub fn center(&self) -> Pt3 {
        self.pose.inverse_transform_point(&Point3::origin())
    }
}
