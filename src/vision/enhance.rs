//! Automatic image enhancement ahead of recognition
//!
//! Content-agnostic auto-contrast and auto-exposure. Both steps are folded
//! into one 256-entry lookup table applied to the RGB channels.

use image::RgbaImage;
use tracing::debug;

/// Enhancement settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceSettings {
    /// Master switch
    pub enabled: bool,
    /// Fraction of pixels clipped at each end of the luminance histogram
    pub clip_fraction: f32,
    /// Target mean luminance (0.0 - 1.0) for underexposed images
    pub exposure_target: f32,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            clip_fraction: 0.005,
            exposure_target: 0.45,
        }
    }
}

const MIN_GAMMA: f64 = 0.6;
const MAX_GAMMA: f64 = 1.0;

/// Applies auto-contrast and auto-exposure to corrected badge images
#[derive(Debug, Clone, Default)]
pub struct ImageEnhancer {
    settings: EnhanceSettings,
}

impl ImageEnhancer {
    pub fn new(settings: EnhanceSettings) -> Self {
        Self { settings }
    }

    /// Enhance an image. Falls back to the input when enhancement is
    /// disabled or produces nothing usable.
    pub fn enhance(&self, image: &RgbaImage) -> RgbaImage {
        if !self.settings.enabled {
            debug!("Enhancement disabled");
            return image.clone();
        }

        match self.try_enhance(image) {
            Some(enhanced) => enhanced,
            None => {
                debug!("Enhancement skipped; using input image");
                image.clone()
            }
        }
    }

    fn try_enhance(&self, image: &RgbaImage) -> Option<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let histogram = luminance_histogram(image);
        let total: u64 = histogram.iter().sum();
        let (low, high) = clip_bounds(&histogram, total, self.settings.clip_fraction);

        let stretch = stretch_lut(low, high);
        let mean = mean_through(&histogram, total, &stretch);
        let gamma = exposure_gamma(mean, self.settings.exposure_target as f64)?;

        debug!(
            "Enhancing {}x{}: stretch {}..{} -> 0..255, mean {:.3}, gamma {:.3}",
            image.width(),
            image.height(),
            low,
            high,
            mean,
            gamma
        );

        let mut lut = [0u8; 256];
        for (value, out) in lut.iter_mut().enumerate() {
            let stretched = stretch[value] as f64 / 255.0;
            *out = (stretched.powf(gamma) * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        let mut result = image.clone();
        for pixel in result.pixels_mut() {
            for channel in pixel.0.iter_mut().take(3) {
                *channel = lut[*channel as usize];
            }
            // Alpha unchanged
        }

        Some(result)
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round().clamp(0.0, 255.0) as u8
}

fn luminance_histogram(image: &RgbaImage) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        histogram[luminance(r, g, b) as usize] += 1;
    }
    histogram
}

/// Darkest and brightest levels left after clipping `fraction` of the pixels at each tail
fn clip_bounds(histogram: &[u64; 256], total: u64, fraction: f32) -> (u8, u8) {
    let clip = (total as f64 * fraction.clamp(0.0, 0.5) as f64).floor() as u64;

    let mut low = 0u8;
    let mut seen = 0u64;
    for (level, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            low = level as u8;
            break;
        }
    }

    let mut high = 255u8;
    let mut seen = 0u64;
    for (level, count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > clip {
            high = level as u8;
            break;
        }
    }

    (low, high)
}

/// Linear stretch of `low..=high` onto the full range; identity when flat
fn stretch_lut(low: u8, high: u8) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if high <= low {
        for (value, out) in lut.iter_mut().enumerate() {
            *out = value as u8;
        }
        return lut;
    }

    let span = (high - low) as f64;
    for (value, out) in lut.iter_mut().enumerate() {
        let scaled = (value as f64 - low as f64) * 255.0 / span;
        *out = scaled.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn mean_through(histogram: &[u64; 256], total: u64, lut: &[u8; 256]) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| lut[level] as f64 * *count as f64)
        .sum();
    sum / total as f64 / 255.0
}

/// Gamma that lifts `mean` toward `target`. 1.0 unless underexposed.
fn exposure_gamma(mean: f64, target: f64) -> Option<f64> {
    if !mean.is_finite() || !target.is_finite() {
        return None;
    }
    if mean <= 0.0 || target <= 0.0 || target >= 1.0 || mean >= target {
        return Some(1.0);
    }

    let gamma = target.ln() / mean.ln();
    if !gamma.is_finite() {
        return None;
    }
    Some(gamma.clamp(MIN_GAMMA, MAX_GAMMA))
}
