//! Captured badge image with orientation metadata

use image::{DynamicImage, RgbaImage};
use std::time::Instant;

/// Display orientation of stored pixels, following the EXIF convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    /// Map an EXIF orientation tag value (1-8). Unknown values are treated as upright.
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Orientation::UpMirrored,
            3 => Orientation::Down,
            4 => Orientation::DownMirrored,
            5 => Orientation::LeftMirrored,
            6 => Orientation::Right,
            7 => Orientation::RightMirrored,
            8 => Orientation::Left,
            _ => Orientation::Up,
        }
    }

    pub fn is_upright(self) -> bool {
        self == Orientation::Up
    }

    /// Re-render `image` so stored pixel order matches display order
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Up => image,
            Orientation::UpMirrored => image.fliph(),
            Orientation::Down => image.rotate180(),
            Orientation::DownMirrored => image.flipv(),
            Orientation::LeftMirrored => image.rotate90().fliph(),
            Orientation::Right => image.rotate90(),
            Orientation::RightMirrored => image.rotate270().fliph(),
            Orientation::Left => image.rotate270(),
        }
    }
}

/// A raw badge capture
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Decoded pixels in storage order
    pub image: DynamicImage,
    /// How the pixels must be turned to appear upright
    pub orientation: Orientation,
    /// When the capture was taken or loaded
    pub timestamp: Instant,
}

impl CapturedImage {
    pub fn new(image: DynamicImage, orientation: Orientation) -> Self {
        Self {
            image,
            orientation,
            timestamp: Instant::now(),
        }
    }

    /// Wrap an already-upright RGBA buffer
    pub fn upright(image: RgbaImage) -> Self {
        Self::new(DynamicImage::ImageRgba8(image), Orientation::Up)
    }

    /// Stored dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Pixels in display orientation
    pub fn normalized(&self) -> RgbaImage {
        self.orientation.apply(self.image.clone()).to_rgba8()
    }
}
