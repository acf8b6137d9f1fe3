//! Cross-camera foreground color equalization.
//!
//! The rig cameras are not photometrically matched; the same subject renders
//! with different gains in each view, which skews the averaged voxel colors.
//! This pass scales each camera's foreground pixels so the per-channel means
//! agree with the rig-wide mean.

use image::{GrayImage, RgbImage};

const FG: u8 = 255;

fn foreground_channel_means(image: &RgbImage, mask: &GrayImage) -> Option<[f32; 3]> {
    let mut sums = [0.0f64; 3];
    let mut count = 0u64;
    for (x, y, px) in image.enumerate_pixels() {
        if mask.get_pixel(x, y)[0] == FG {
            for ch in 0..3 {
                sums[ch] += px[ch] as f64;
            }
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some([
        (sums[0] / count as f64) as f32,
        (sums[1] / count as f64) as f32,
        (sums[2] / count as f64) as f32,
    ])
}

/// Scale the foreground of every camera image toward the rig-wide mean
/// color. Images without any foreground are left untouched.
pub fn equalize_foreground_colors(images: &mut [RgbImage], masks: &[GrayImage]) {
    let per_camera: Vec<Option<[f32; 3]>> = images
        .iter()
        .zip(masks)
        .map(|(img, mask)| foreground_channel_means(img, mask))
        .collect();

    let present: Vec<&[f32; 3]> = per_camera.iter().flatten().collect();
    if present.is_empty() {
        return;
    }

    let mut target = [0.0f32; 3];
    for m in &present {
        for ch in 0..3 {
            target[ch] += m[ch];
        }
    }
    for t in &mut target {
        *t /= present.len() as f32;
    }

    for ((image, mask), means) in images.iter_mut().zip(masks).zip(&per_camera) {
        let Some(means) = means else { continue };
        let mut gains = [1.0f32; 3];
        for ch in 0..3 {
            if means[ch] > 1.0 {
                gains[ch] = target[ch] / means[ch];
            }
        }

        for (x, y, px) in image.enumerate_pixels_mut() {
            if mask.get_pixel(x, y)[0] == FG {
                for ch in 0..3 {
                    px[ch] = (px[ch] as f32 * gains[ch]).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}
