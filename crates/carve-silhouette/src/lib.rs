//! Background modeling and silhouette extraction.
//!
//! Each camera gets a per-pixel Gaussian mixture trained on a
//! background-only clip; scene frames are then classified against the
//! model's background estimate in HSV space and cleaned up with morphology
//! and a connected-component area filter. The output masks are the
//! silhouettes the voxel stage intersects.

pub mod components;
pub mod equalize;
pub mod gmm;
pub mod hsv;
pub mod morphology;
pub mod subtract;

pub use components::{label_components, remove_small_components};
pub use equalize::equalize_foreground_colors;
pub use gmm::{BackgroundModel, GmmConfig};
pub use hsv::rgb_to_hsv;
pub use morphology::{close, dilate, erode, open};
pub use subtract::{extract_silhouette, subtract, SubtractionConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SilhouetteError {
    #[error("no frames provided")]
    NoFrames,
    #[error("frame {index} is {found_w}x{found_h}, expected {want_w}x{want_h}")]
    FrameSizeMismatch {
        index: usize,
        found_w: u32,
        found_h: u32,
        want_w: u32,
        want_h: u32,
    },
}
