//! Vision Layer
//!
//! Turns a captured badge into recognized text:
//! - Geometry correction (orientation, downscale, perspective)
//! - Automatic enhancement
//! - Region-based or whole-image text recognition
//!
//! Text recognition itself is a capability supplied by the platform
//! (Windows OCR API) or by the caller through [`TextRecognizer`].

pub mod detection;
pub mod enhance;
pub mod geometry;
pub mod ocr;
pub mod regions;
#[cfg(windows)]
pub mod windows_ocr;

use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub use detection::{HoughQuadDetector, QuadDetector, QuadRequest, Quadrilateral};
pub use enhance::{EnhanceSettings, ImageEnhancer};
pub use geometry::{GeometryCorrector, GeometrySettings};
pub use ocr::{
    recognize_text, ConfidenceLevel, LineBounds, OcrError, RecognitionLevel, RecognitionOptions,
    RecognitionResult, RecognizedLine, TextRecognizer,
};
pub use regions::{crop_region, RegionRecognizer, WHOLE_IMAGE_KEY};

/// Errors raised by quadrilateral detectors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// The platform's text recognizer, if this platform has one
#[cfg(windows)]
pub fn platform_recognizer(options: &RecognitionOptions) -> Option<Arc<dyn TextRecognizer>> {
    match windows_ocr::WindowsOcr::new(&options.language) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            warn!("Windows OCR unavailable: {}", e);
            None
        }
    }
}

/// The platform's text recognizer, if this platform has one
#[cfg(not(windows))]
pub fn platform_recognizer(_options: &RecognitionOptions) -> Option<Arc<dyn TextRecognizer>> {
    warn!("No built-in text recognizer on this platform");
    None
}
