//! Capture Boundary
//!
//! Turns encoded badge photos into [`CapturedImage`] values: decoded pixels
//! plus the EXIF orientation the camera recorded. The camera surface itself
//! lives in the host application.

pub mod frame;

pub use frame::{CapturedImage, Orientation};

use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading a capture
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode an encoded image (JPEG, PNG, ...) and its EXIF orientation
pub fn decode_image(bytes: &[u8]) -> Result<CapturedImage, CaptureError> {
    let image = image::load_from_memory(bytes)?;
    let orientation = read_exif_orientation(bytes);

    debug!(
        "Decoded {}x{} capture (orientation {:?})",
        image.width(),
        image.height(),
        orientation
    );

    Ok(CapturedImage::new(image, orientation))
}

/// Load and decode an image file
pub fn load_image(path: &Path) -> Result<CapturedImage, CaptureError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

/// Read the EXIF orientation tag. Missing or unreadable metadata means upright.
pub fn read_exif_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return Orientation::Up;
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from_exif)
        .unwrap_or_default()
}
