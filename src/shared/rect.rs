//! Normalized rectangles for badge regions

use serde::{Deserialize, Serialize};

/// A rectangle expressed relative to an image's full extent.
///
/// All four values live in `[0, 1]` with the origin at the top-left corner.
/// Width or height may be zero, which marks a degenerate region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel bounds of a crop inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl NormalizedRect {
    pub const ZERO: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Create a rectangle, clamping every component into `[0, 1]`
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }.clamped()
    }

    /// Copy of this rectangle with every component clamped into `[0, 1]`.
    ///
    /// NaN components collapse to 0.
    pub fn clamped(&self) -> Self {
        Self {
            x: clamp_unit(self.x),
            y: clamp_unit(self.y),
            width: clamp_unit(self.width),
            height: clamp_unit(self.height),
        }
    }

    /// True when the rectangle covers no area
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Convert to integer pixel bounds inside an image of the given size.
    ///
    /// The rectangle is clamped first. Width and height are floored at one
    /// pixel, then the rect is snapped outward (origin floored, far edge
    /// ceiled) so fractional pixels never drop content. The result always lies
    /// inside the image and is at least 1x1. Returns `None` only for an empty
    /// image.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> Option<PixelRect> {
        if image_width == 0 || image_height == 0 {
            return None;
        }

        let rect = self.clamped();
        let (x, width) = snap_axis(rect.x, rect.width, image_width);
        let (y, height) = snap_axis(rect.y, rect.height, image_height);

        Some(PixelRect { x, y, width, height })
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Snap one axis of a normalized span to pixels: `(origin, length)`
fn snap_axis(origin: f64, length: f64, extent: u32) -> (u32, u32) {
    let extent_f = extent as f64;
    let start = origin * extent_f;
    let span = (length * extent_f).max(1.0);

    let lo = (start.floor() as u32).min(extent - 1);
    let hi = ((start + span).ceil() as u32).clamp(lo + 1, extent);

    (lo, hi - lo)
}
