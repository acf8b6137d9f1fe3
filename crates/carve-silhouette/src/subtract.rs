//! HSV background subtraction.

use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::hsv::{hue_distance, rgb_to_hsv};
use crate::morphology;
use crate::components::remove_small_components;
use crate::SilhouetteError;

const FG: u8 = 255;

/// Classification thresholds and cleanup settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubtractionConfig {
    /// Hue distance threshold in degrees.
    pub hue_threshold: f32,
    /// Saturation difference threshold.
    pub sat_threshold: f32,
    /// Value (brightness) difference threshold.
    pub val_threshold: f32,
    /// How many of the three channel tests must fire for a foreground call.
    pub min_channel_votes: u8,
    /// Apply morphological opening then closing after thresholding.
    pub morphological_cleanup: bool,
    /// Drop connected components smaller than this area (pixels).
    pub min_component_area: usize,
}

impl Default for SubtractionConfig {
    fn default() -> Self {
        Self {
            hue_threshold: 20.0,
            sat_threshold: 0.12,
            val_threshold: 0.15,
            min_channel_votes: 2,
            morphological_cleanup: true,
            min_component_area: 32,
        }
    }
}

/// Classify each pixel of `frame` against the background estimate.
///
/// A pixel is foreground when at least `min_channel_votes` of the H, S, V
/// channel differences exceed their thresholds. The raw mask is returned
/// without cleanup; use [`extract_silhouette`] for the full stage.
pub fn subtract(
    frame: &RgbImage,
    background: &RgbImage,
    cfg: &SubtractionConfig,
) -> Result<GrayImage, SilhouetteError> {
    let (w, h) = frame.dimensions();
    if background.dimensions() != (w, h) {
        let (bw, bh) = background.dimensions();
        return Err(SilhouetteError::FrameSizeMismatch {
            index: 0,
            found_w: bw,
            found_h: bh,
            want_w: w,
            want_h: h,
        });
    }

    let mut mask = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let f = rgb_to_hsv(frame.get_pixel(x, y).0);
            let b = rgb_to_hsv(background.get_pixel(x, y).0);

            let mut votes = 0u8;
            if hue_distance(f[0], b[0]) > cfg.hue_threshold {
                votes += 1;
            }
            if (f[1] - b[1]).abs() > cfg.sat_threshold {
                votes += 1;
            }
            if (f[2] - b[2]).abs() > cfg.val_threshold {
                votes += 1;
            }

            if votes >= cfg.min_channel_votes {
                mask.put_pixel(x, y, Luma([FG]));
            }
        }
    }
    Ok(mask)
}

/// Full silhouette stage: threshold, morphological cleanup, component
/// filtering.
pub fn extract_silhouette(
    frame: &RgbImage,
    background: &RgbImage,
    cfg: &SubtractionConfig,
) -> Result<GrayImage, SilhouetteError> {
    let mut mask = subtract(frame, background, cfg)?;

    if cfg.morphological_cleanup {
        mask = morphology::close(&morphology::open(&mask));
    }
    if cfg.min_component_area > 0 {
        mask = remove_small_components(&mask, cfg.min_component_area);
    }

    let coverage = mask.pixels().filter(|p| p[0] == FG).count();
    log::debug!(
        "silhouette coverage: {}/{} pixels",
        coverage,
        (frame.width() * frame.height())
    );

    Ok(mask)
}
