//! Chessboard geometry.

use carve_core::{Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// Physical description of a chessboard target.
///
/// `rows` × `cols` counts *inner* corners, not squares; `square_size` is the
/// square edge length in world units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoardSpec {
    pub rows: u32,
    pub cols: u32,
    pub square_size: Real,
}

impl Default for BoardSpec {
    fn default() -> Self {
        // The rig's target: 6x8 inner corners.
        Self {
            rows: 6,
            cols: 8,
            square_size: 115.0,
        }
    }
}

impl BoardSpec {
    pub fn num_corners(&self) -> usize {
        (self.rows * self.cols) as usize
    }

    /// Inner corners in the board frame (Z = 0), row-major.
    pub fn object_points(&self) -> Vec<Pt3> {
        let mut pts = Vec::with_capacity(self.num_corners());
        for j in 0..self.rows {
            for i in 0..self.cols {
                pts.push(Pt3::new(
                    i as Real * self.square_size,
                    j as Real * self.square_size,
                    0.0,
                ));
            }
        }
        pts
    }

    /// Inner corners on the board plane, row-major.
    pub fn plane_points(&self) -> Vec<Pt2> {
        self.object_points()
            .into_iter()
            .map(|p| Pt2::new(p.x, p.y))
            .collect()
    }
}
