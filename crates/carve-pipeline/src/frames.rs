//! Frame-sequence directories.
//!
//! Rig clips are stored as numbered image frames
//! (`frame_0001.png`, ...); ordering follows the numeric suffix of the file
//! stem so `frame_10` sorts after `frame_2`.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use image::RgbImage;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

fn numeric_suffix(stem: &str) -> Option<u64> {
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// List the image frames of a clip directory in playback order.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read frame directory {}", dir.display()))?;

    let mut frames: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    frames.sort_by_cached_key(|p| {
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        (numeric_suffix(stem), stem.to_string())
    });

    ensure!(
        !frames.is_empty(),
        "no image frames found in {}",
        dir.display()
    );
    Ok(frames)
}

/// Load one frame as RGB.
pub fn load_frame(path: &Path) -> Result<RgbImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(img.to_rgb8())
}

/// Load every frame of a clip directory in order.
pub fn load_frames(dir: &Path) -> Result<Vec<RgbImage>> {
    list_frames(dir)?.iter().map(|p| load_frame(p)).collect()
}
