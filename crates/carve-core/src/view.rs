//! Correspondence containers.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::math::{Pt2, Pt3};

/// 3D target points paired with their observed 2D pixel positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrespondenceView {
    pub points_3d: Vec<Pt3>,
    pub points_2d: Vec<Pt2>,
}

impl CorrespondenceView {
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "mismatched correspondence counts ({} vs {})",
            points_3d.len(),
            points_2d.len()
        );
        ensure!(
            points_3d.len() >= 4,
            "need at least 4 correspondences, got {}",
            points_3d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }

    /// The target points flattened onto their own plane (drops Z).
    ///
    /// Valid for planar targets observed in the Z=0 convention.
    pub fn board_points_2d(&self) -> Vec<Pt2> {
        self.points_3d.iter().map(|p| Pt2::new(p.x, p.y)).collect()
    }
}
