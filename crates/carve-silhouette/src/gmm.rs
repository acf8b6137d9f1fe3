//! Per-pixel Gaussian mixture background model.
//!
//! Every pixel maintains a small bank of weighted spherical Gaussians over
//! RGB. Each background frame either reinforces the component it matches
//! (within `match_sigma` standard deviations) or replaces the weakest
//! component with a fresh one centered on the sample. After training, the
//! background estimate at a pixel is the mean of its most probable
//! component, the one with the highest weight-to-spread ratio.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::SilhouetteError;

/// Training parameters for the mixture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GmmConfig {
    /// Components per pixel.
    pub components: usize,
    /// Learning rate for weight and mean updates.
    pub learning_rate: f32,
    /// Match radius in standard deviations.
    pub match_sigma: f32,
    /// Variance assigned to newly created components.
    pub initial_variance: f32,
    /// Variance floor, keeps matches possible on noise-free footage.
    pub min_variance: f32,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            components: 3,
            learning_rate: 0.02,
            match_sigma: 2.5,
            initial_variance: 225.0,
            min_variance: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Component {
    weight: f32,
    mean: [f32; 3],
    variance: f32,
}

impl Component {
    fn fresh(sample: [f32; 3], cfg: &GmmConfig) -> Self {
        Self {
            weight: cfg.learning_rate,
            mean: sample,
            variance: cfg.initial_variance,
        }
    }

    fn distance_sq(&self, sample: [f32; 3]) -> f32 {
        let dr = sample[0] - self.mean[0];
        let dg = sample[1] - self.mean[1];
        let db = sample[2] - self.mean[2];
        dr * dr + dg * dg + db * db
    }

    /// Ranking key: heavily observed, tight components first.
    fn fitness(&self) -> f32 {
        self.weight / self.variance.sqrt()
    }
}

#[derive(Debug, Clone)]
struct PixelMixture {
    components: Vec<Component>,
}

impl PixelMixture {
    fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    fn update(&mut self, sample: [f32; 3], cfg: &GmmConfig) {
        let matched = self
            .components
            .iter_mut()
            .enumerate()
            .find(|(_, c)| c.distance_sq(sample) < (cfg.match_sigma * cfg.match_sigma) * c.variance)
            .map(|(i, _)| i);

        // Decay all weights, then reinforce or replace.
        for c in &mut self.components {
            c.weight *= 1.0 - cfg.learning_rate;
        }

        match matched {
            Some(i) => {
                let c = &mut self.components[i];
                c.weight += cfg.learning_rate;
                let rho = cfg.learning_rate;
                let mut d2 = 0.0;
                for ch in 0..3 {
                    c.mean[ch] += rho * (sample[ch] - c.mean[ch]);
                    let d = sample[ch] - c.mean[ch];
                    d2 += d * d;
                }
                c.variance = ((1.0 - rho) * c.variance + rho * d2).max(cfg.min_variance);
            }
            None => {
                if self.components.len() < cfg.components {
                    self.components.push(Component::fresh(sample, cfg));
                } else {
                    // Replace the least-fit component.
                    let weakest = self
                        .components
                        .iter()
                        .enumerate()
                        .min_by(|a, b| a.1.fitness().total_cmp(&b.1.fitness()))
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.components[weakest] = Component::fresh(sample, cfg);
                }
            }
        }
    }

    fn background_mean(&self) -> [f32; 3] {
        self.components
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .map(|c| c.mean)
            .unwrap_or([0.0; 3])
    }
}

/// A trained background model for one camera.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    width: u32,
    height: u32,
    pixels: Vec<PixelMixture>,
}

impl BackgroundModel {
    /// Train a model on a background-only clip.
    pub fn train(frames: &[RgbImage], cfg: &GmmConfig) -> Result<Self, SilhouetteError> {
        let first = frames.first().ok_or(SilhouetteError::NoFrames)?;
        let (width, height) = first.dimensions();

        let mut pixels = vec![PixelMixture::new(); (width * height) as usize];

        for (index, frame) in frames.iter().enumerate() {
            let (fw, fh) = frame.dimensions();
            if (fw, fh) != (width, height) {
                return Err(SilhouetteError::FrameSizeMismatch {
                    index,
                    found_w: fw,
                    found_h: fh,
                    want_w: width,
                    want_h: height,
                });
            }

            for (i, px) in frame.pixels().enumerate() {
                let sample = [px[0] as f32, px[1] as f32, px[2] as f32];
                pixels[i].update(sample, cfg);
            }
        }

        log::debug!(
            "trained background model: {}x{}, {} frames",
            width,
            height,
            frames.len()
        );

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render the most probable background as an RGB image.
    pub fn background_image(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for (i, px) in img.pixels_mut().enumerate() {
            let mean = self.pixels[i].background_mean();
            px.0 = [
                mean[0].round().clamp(0.0, 255.0) as u8,
                mean[1].round().clamp(0.0, 255.0) as u8,
                mean[2].round().clamp(0.0, 255.0) as u8,
            ];
        }
        img
    }
}
