//! Geometry correction
//!
//! Orientation normalization, bounded downscale and perspective correction
//! of a captured badge. Every failure degrades to the best image available
//! so far; nothing here returns an error.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::detection::{shoelace_area, HoughQuadDetector, QuadDetector, QuadRequest, Quadrilateral};
use crate::capture::CapturedImage;

/// Default bound on the longer side of the corrected image
pub const DEFAULT_MAX_DIMENSION: u32 = 2200;

/// Geometry correction settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySettings {
    /// Longer side limit in pixels; larger images are scaled down
    pub max_dimension: u32,
    /// Run quadrilateral detection and dewarp the badge
    pub perspective_correction: bool,
    /// Acceptance limits for detected quadrilaterals
    pub request: QuadRequest,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            perspective_correction: true,
            request: QuadRequest::default(),
        }
    }
}

/// Corrects raw captures into upright, bounded, dewarped images
#[derive(Clone)]
pub struct GeometryCorrector {
    settings: GeometrySettings,
    detector: Arc<dyn QuadDetector>,
}

impl Default for GeometryCorrector {
    fn default() -> Self {
        Self::new(GeometrySettings::default(), Arc::new(HoughQuadDetector::default()))
    }
}

impl GeometryCorrector {
    pub fn new(settings: GeometrySettings, detector: Arc<dyn QuadDetector>) -> Self {
        Self { settings, detector }
    }

    /// Correct a capture, returning the best available image
    pub fn correct(&self, captured: &CapturedImage) -> RgbaImage {
        self.correct_detailed(captured).0
    }

    /// Correct a capture and report whether the perspective warp was applied
    pub fn correct_detailed(&self, captured: &CapturedImage) -> (RgbaImage, bool) {
        let upright = captured.normalized();
        if !captured.orientation.is_upright() {
            debug!("Applied {:?} orientation", captured.orientation);
        }

        let scaled = downscale(upright, self.settings.max_dimension);

        if !self.settings.perspective_correction {
            debug!("Perspective correction disabled");
            return (scaled, false);
        }

        let Some(quad) = self.find_quad(&scaled) else {
            info!("No badge outline found; using scaled image");
            return (scaled, false);
        };

        match warp_quad(&scaled, &quad) {
            Some(warped) => {
                info!(
                    "Perspective correction applied: {}x{} -> {}x{}",
                    scaled.width(),
                    scaled.height(),
                    warped.width(),
                    warped.height()
                );
                (warped, true)
            }
            None => {
                warn!("Perspective warp failed; using scaled image");
                (scaled, false)
            }
        }
    }

    fn find_quad(&self, image: &RgbaImage) -> Option<Quadrilateral> {
        let request = &self.settings.request;
        let observations = match self.detector.detect(image, request) {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Quadrilateral detection failed: {}", e);
                return None;
            }
        };

        let (width, height) = image.dimensions();
        let quad = observations
            .into_iter()
            .take(request.max_observations)
            .find(|quad| request.accepts(quad, width, height))?;

        debug!("Badge outline found with confidence {:.2}", quad.confidence);
        Some(quad)
    }
}

/// Scale down so the longer side fits `max_dimension`; never upscales
pub fn downscale(image: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        return image;
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);

    debug!(
        "Downscaling {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// Warp a quadrilateral to an upright rectangle.
///
/// The corners stay in the detector's bottom-left convention, so the warp runs
/// on a vertically flipped copy and its output is flipped back upright.
fn warp_quad(image: &RgbaImage, quad: &Quadrilateral) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    let source = quad.pixel_corners(width, height);
    if shoelace_area(&source) < 1.0 {
        debug!("Quadrilateral encloses no pixels");
        return None;
    }

    let (out_w, out_h) = quad.rectified_size(width, height);
    let (w, h) = (out_w as f32, out_h as f32);

    // top-left, top-right, bottom-right, bottom-left with y pointing up
    let target = [(0.0, h), (w, h), (w, 0.0), (0.0, 0.0)];

    let projection = Projection::from_control_points(source, target)?;

    let flipped = imageops::flip_vertical(image);
    let mut output = RgbaImage::new(out_w, out_h);
    warp_into(
        &flipped,
        &projection,
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
        &mut output,
    );

    Some(imageops::flip_vertical(&output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Orientation;
    use crate::vision::VisionError;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed set of observations and counts calls
    struct StubDetector {
        observations: Vec<Quadrilateral>,
        calls: AtomicUsize,
    }

    impl StubDetector {
        fn new(observations: Vec<Quadrilateral>) -> Arc<Self> {
            Arc::new(Self { observations, calls: AtomicUsize::new(0) })
        }
    }

    impl QuadDetector for StubDetector {
        fn detect(&self, _: &RgbaImage, _: &QuadRequest) -> Result<Vec<Quadrilateral>, VisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.observations.clone())
        }
    }

    struct FailingDetector;

    impl QuadDetector for FailingDetector {
        fn detect(&self, _: &RgbaImage, _: &QuadRequest) -> Result<Vec<Quadrilateral>, VisionError> {
            Err(VisionError::Detection("no edges".into()))
        }
    }

    fn full_frame(confidence: f32) -> Quadrilateral {
        Quadrilateral {
            top_left: (0.0, 1.0),
            top_right: (1.0, 1.0),
            bottom_right: (1.0, 0.0),
            bottom_left: (0.0, 0.0),
            confidence,
        }
    }

    /// Dark top half, light bottom half
    fn two_tone(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |_, y| {
            if y < height / 2 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([230, 230, 230, 255])
            }
        })
    }

    fn corrector(detector: Arc<dyn QuadDetector>) -> GeometryCorrector {
        GeometryCorrector::new(GeometrySettings::default(), detector)
    }

    #[test]
    fn test_no_quad_returns_scaled_image() {
        let image = two_tone(60, 40);
        let (corrected, warped) =
            corrector(StubDetector::new(vec![])).correct_detailed(&CapturedImage::upright(image.clone()));
        assert!(!warped);
        assert_eq!(corrected, image);
    }

    #[test]
    fn test_upright_correction_is_idempotent() {
        let corrector = corrector(StubDetector::new(vec![]));
        let once = corrector.correct(&CapturedImage::upright(two_tone(30, 20)));
        let twice = corrector.correct(&CapturedImage::upright(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_orientation_applied_before_scaling() {
        let captured = CapturedImage::new(DynamicImage::ImageRgba8(two_tone(40, 20)), Orientation::Right);
        let corrected = corrector(StubDetector::new(vec![])).correct(&captured);
        assert_eq!(corrected.dimensions(), (20, 40));
    }

    #[test]
    fn test_downscale_bounds_longer_side() {
        let scaled = downscale(RgbaImage::new(4400, 1000), 2200);
        assert_eq!(scaled.dimensions(), (2200, 500));

        let small = downscale(RgbaImage::new(300, 200), 2200);
        assert_eq!(small.dimensions(), (300, 200));
    }

    #[test]
    fn test_disabled_perspective_skips_detection() {
        let detector = StubDetector::new(vec![full_frame(1.0)]);
        let settings = GeometrySettings { perspective_correction: false, ..Default::default() };
        let corrector = GeometryCorrector::new(settings, detector.clone());

        let (_, warped) = corrector.correct_detailed(&CapturedImage::upright(two_tone(10, 10)));
        assert!(!warped);
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detector_error_falls_back() {
        let image = two_tone(16, 12);
        let (corrected, warped) =
            corrector(Arc::new(FailingDetector)).correct_detailed(&CapturedImage::upright(image.clone()));
        assert!(!warped);
        assert_eq!(corrected, image);
    }

    #[test]
    fn test_low_confidence_quad_is_ignored() {
        let image = two_tone(16, 12);
        let (corrected, warped) =
            corrector(StubDetector::new(vec![full_frame(0.3)])).correct_detailed(&CapturedImage::upright(image.clone()));
        assert!(!warped);
        assert_eq!(corrected, image);
    }

    #[test]
    fn test_full_frame_warp_stays_upright() {
        let image = two_tone(40, 30);
        let (corrected, warped) =
            corrector(StubDetector::new(vec![full_frame(0.9)])).correct_detailed(&CapturedImage::upright(image));

        assert!(warped);
        assert_eq!(corrected.dimensions(), (40, 30));
        assert!(corrected.get_pixel(20, 2).0[0] < 60, "top should stay dark");
        assert!(corrected.get_pixel(20, 27).0[0] > 180, "bottom should stay light");
    }

    #[test]
    fn test_degenerate_quad_falls_back() {
        let point = (0.5, 0.5);
        let quad = Quadrilateral {
            top_left: point,
            top_right: point,
            bottom_right: point,
            bottom_left: point,
            confidence: 1.0,
        };
        let image = two_tone(20, 20);
        let (corrected, warped) =
            corrector(StubDetector::new(vec![quad])).correct_detailed(&CapturedImage::upright(image.clone()));
        assert!(!warped);
        assert_eq!(corrected, image);
    }
}
