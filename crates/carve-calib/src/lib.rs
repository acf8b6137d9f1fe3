//! Linear calibration solvers for the four-camera rig.
//!
//! The calibration route is fully linear: plane-to-image homographies (DLT),
//! Zhang's closed-form intrinsics, a least-squares distortion fit from
//! homography residuals, and an alternating refinement loop that ties the
//! three together. Per-camera world poses come from decomposing the
//! homography of a board lying in the world reference plane.

pub mod distortion;
pub mod extrinsics;
pub mod homography;
pub mod intrinsics;
pub mod iterative;
pub mod planar_pose;

pub use distortion::{
    estimate_distortion_from_homographies, DistortionFitError, DistortionFitOptions,
    DistortionObservations,
};
pub use extrinsics::{estimate_rig_extrinsics, ExtrinsicsError};
pub use homography::{dlt_homography, HomographyError};
pub use intrinsics::{estimate_intrinsics_from_homographies, IntrinsicsInitError};
pub use iterative::{
    estimate_intrinsics_iterative, CalibrationView, IterativeError, IterativeOptions,
    IterativeResult,
};
pub use planar_pose::{pose_from_homography, PlanarPoseError};
