//! Chessboard inner-corner detection on grayscale frames.
//!
//! The detector is a Harris corner pass tuned for the X-shaped junctions of
//! a chessboard: smooth, Sobel gradients, structure-tensor response,
//! greedy non-maximum suppression, then a grid-ordering step that labels the
//! strongest `rows × cols` responses row-major along the board's principal
//! axes. It expects the near-frontal board views of fixed rig footage and
//! returns `None` on frames where no complete grid is found.

use carve_core::{CorrespondenceView, Pt2, Real};
use image::GrayImage;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::board::BoardSpec;

/// Tuning knobs for the Harris pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Harris sensitivity constant.
    pub harris_k: f32,
    /// Candidate threshold as a fraction of the maximum response.
    pub response_threshold: f32,
    /// Minimum pixel distance between accepted corners.
    pub min_distance: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            harris_k: 0.04,
            response_threshold: 0.05,
            min_distance: 8,
        }
    }
}

/// A complete detected board: inner corners in row-major grid order.
#[derive(Debug, Clone)]
pub struct DetectedBoard {
    pub corners: Vec<Pt2>,
}

impl DetectedBoard {
    /// Pair the detected corners with the board's object points.
    pub fn correspondences(&self, spec: &BoardSpec) -> anyhow::Result<CorrespondenceView> {
        CorrespondenceView::new(spec.object_points(), self.corners.clone())
    }
}

/// Detect a full chessboard grid in a grayscale frame.
pub fn detect_board(
    img: &GrayImage,
    spec: &BoardSpec,
    cfg: &DetectorConfig,
) -> Option<DetectedBoard> {
    let needed = spec.num_corners();
    let candidates = harris_candidates(img, cfg);
    if candidates.len() < needed {
        return None;
    }

    // Strongest grid-sized subset.
    let picked: Vec<Pt2> = candidates.into_iter().take(needed).map(|c| c.pos).collect();
    let ordered = order_grid(&picked, spec)?;
    Some(DetectedBoard { corners: ordered })
}

struct Candidate {
    pos: Pt2,
    response: f32,
}

fn harris_candidates(img: &GrayImage, cfg: &DetectorConfig) -> Vec<Candidate> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    if w < 7 || h < 7 {
        return Vec::new();
    }

    // 3x3 box smoothing to spread single-pixel edges into the window.
    let mut gray = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut sum = 0.0f32;
            for dy in 0..3 {
                for dx in 0..3 {
                    sum += img.get_pixel((x + dx - 1) as u32, (y + dy - 1) as u32)[0] as f32;
                }
            }
            gray[y * w + x] = sum / 9.0;
        }
    }

    // Sobel gradients.
    let mut gx = vec![0.0f32; w * h];
    let mut gy = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: isize, dy: isize| {
                gray[(y as isize + dy) as usize * w + (x as isize + dx) as usize]
            };
            gx[y * w + x] = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1))
                - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            gy[y * w + x] = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1))
                - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
        }
    }

    // Structure tensor over a 5x5 window, Harris response.
    let mut response = vec![0.0f32; w * h];
    let mut max_response = 0.0f32;
    for y in 3..h - 3 {
        for x in 3..w - 3 {
            let mut sxx = 0.0f32;
            let mut sxy = 0.0f32;
            let mut syy = 0.0f32;
            for dy in 0..5 {
                for dx in 0..5 {
                    let idx = (y + dy - 2) * w + (x + dx - 2);
                    sxx += gx[idx] * gx[idx];
                    sxy += gx[idx] * gy[idx];
                    syy += gy[idx] * gy[idx];
                }
            }
            let det = sxx * syy - sxy * sxy;
            let trace = sxx + syy;
            let r = det - cfg.harris_k * trace * trace;
            response[y * w + x] = r;
            max_response = max_response.max(r);
        }
    }

    if max_response <= 0.0 {
        return Vec::new();
    }

    // Threshold, then greedy suppression strongest-first.
    let threshold = cfg.response_threshold * max_response;
    let mut above: Vec<Candidate> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let r = response[y * w + x];
            if r > threshold {
                above.push(Candidate {
                    pos: Pt2::new(x as Real, y as Real),
                    response: r,
                });
            }
        }
    }
    above.sort_by(|a, b| b.response.total_cmp(&a.response));

    let min_d2 = (cfg.min_distance as Real).powi(2);
    let mut accepted: Vec<Candidate> = Vec::new();
    for cand in above {
        if accepted
            .iter()
            .all(|a| (a.pos - cand.pos).norm_squared() > min_d2)
        {
            accepted.push(cand);
        }
    }
    accepted
}

/// Order an unlabeled corner set into a row-major grid along the board's
/// principal axes. Returns `None` when the points do not form `rows` rows of
/// `cols` corners.
fn order_grid(points: &[Pt2], spec: &BoardSpec) -> Option<Vec<Pt2>> {
    let (rows, cols) = (spec.rows as usize, spec.cols as usize);
    if points.len() != rows * cols {
        return None;
    }

    let n = points.len() as Real;
    let centroid = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / n;

    let mut cov = Matrix2::<Real>::zeros();
    for p in points {
        let d = p.coords - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = cov.symmetric_eigen();
    // Major axis spans the wider board dimension.
    let major_idx = if eig.eigenvalues[0] >= eig.eigenvalues[1] {
        0
    } else {
        1
    };
    let mut axis_major: Vector2<Real> = eig.eigenvectors.column(major_idx).into_owned();

    // Deterministic orientation: major axis points right-ish, minor derived
    // as its positive-y perpendicular.
    if axis_major.x < 0.0 {
        axis_major = -axis_major;
    }
    let mut axis_minor = Vector2::new(-axis_major.y, axis_major.x);
    if axis_minor.y < 0.0 {
        axis_minor = -axis_minor;
    }

    // When the board is taller than wide the roles swap.
    let (along_cols, along_rows) = if cols >= rows {
        (axis_major, axis_minor)
    } else {
        (axis_minor, axis_major)
    };

    let mut projected: Vec<(Real, Real, Pt2)> = points
        .iter()
        .map(|p| {
            let d = p.coords - centroid;
            (d.dot(&along_rows), d.dot(&along_cols), *p)
        })
        .collect();

    // Split into rows by the row-axis coordinate, then sort each row.
    projected.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut ordered = Vec::with_capacity(points.len());
    for row in projected.chunks_mut(cols) {
        row.sort_by(|a, b| a.1.total_cmp(&b.1));
        ordered.extend(row.iter().map(|(_, _, p)| *p));
    }
    Some(ordered)
}
