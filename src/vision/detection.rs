//! Quadrilateral detection
//!
//! Finds the badge outline in a photo. Observations use the detector
//! convention: corners normalized to `[0, 1]` with a bottom-left origin.
//! The built-in detector works from straight edges (Canny + Hough lines).

use image::{GrayImage, RgbaImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::debug;

use super::VisionError;

/// Limits applied to quadrilateral observations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadRequest {
    /// Maximum number of observations to return
    pub max_observations: usize,
    /// Minimum observation confidence (0.0 - 1.0)
    pub min_confidence: f32,
    /// Minimum short-side / long-side ratio
    pub min_aspect_ratio: f32,
}

impl Default for QuadRequest {
    fn default() -> Self {
        Self {
            max_observations: 1,
            min_confidence: 0.6,
            min_aspect_ratio: 0.3,
        }
    }
}

impl QuadRequest {
    /// Whether an observation satisfies this request for an image of the given size
    pub fn accepts(&self, quad: &Quadrilateral, width: u32, height: u32) -> bool {
        quad.confidence >= self.min_confidence
            && quad.aspect_ratio(width, height) >= self.min_aspect_ratio
    }
}

/// A detected quadrilateral with normalized, bottom-left-origin corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub top_left: (f32, f32),
    pub top_right: (f32, f32),
    pub bottom_right: (f32, f32),
    pub bottom_left: (f32, f32),
    pub confidence: f32,
}

impl Quadrilateral {
    /// Corners scaled to pixels in the same bottom-left convention.
    ///
    /// No Y-flip is applied. Order: top-left, top-right, bottom-right, bottom-left.
    pub fn pixel_corners(&self, width: u32, height: u32) -> [(f32, f32); 4] {
        let (w, h) = (width as f32, height as f32);
        let scale = |(x, y): (f32, f32)| (x * w, y * h);
        [
            scale(self.top_left),
            scale(self.top_right),
            scale(self.bottom_right),
            scale(self.bottom_left),
        ]
    }

    /// Output size of an upright rectangle covering this quad: (width, height)
    pub fn rectified_size(&self, width: u32, height: u32) -> (u32, u32) {
        let [tl, tr, br, bl] = self.pixel_corners(width, height);
        let out_w = distance(tl, tr).max(distance(bl, br));
        let out_h = distance(tl, bl).max(distance(tr, br));
        ((out_w.round() as u32).max(1), (out_h.round() as u32).max(1))
    }

    /// Short side over long side of the rectified quad
    pub fn aspect_ratio(&self, width: u32, height: u32) -> f32 {
        let (w, h) = self.rectified_size(width, height);
        w.min(h) as f32 / w.max(h) as f32
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Rectangle detection capability
pub trait QuadDetector: Send + Sync {
    fn detect(&self, image: &RgbaImage, request: &QuadRequest) -> Result<Vec<Quadrilateral>, VisionError>;
}

/// Edge-based detector: blur, Canny, Hough lines, then the outermost
/// horizontal and vertical lines bound the badge.
#[derive(Debug, Clone)]
pub struct HoughQuadDetector {
    /// Gaussian blur sigma applied before edge detection
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds (low, high)
    pub canny_thresholds: (f32, f32),
    /// Minimum quad area as a fraction of the image area
    pub min_area_fraction: f32,
}

impl Default for HoughQuadDetector {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_thresholds: (50.0, 150.0),
            min_area_fraction: 0.10,
        }
    }
}

impl QuadDetector for HoughQuadDetector {
    fn detect(&self, image: &RgbaImage, request: &QuadRequest) -> Result<Vec<Quadrilateral>, VisionError> {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return Err(VisionError::InvalidImage(format!("{}x{} is too small", width, height)));
        }
        if request.max_observations == 0 {
            return Ok(vec![]);
        }

        let gray = image::DynamicImage::ImageRgba8(image.clone()).to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_thresholds.0, self.canny_thresholds.1);

        // Vote threshold scales with resolution
        let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
        let options = LineDetectionOptions {
            vote_threshold: (diagonal * 0.25).max(80.0) as u32,
            suppression_radius: 8,
        };
        let lines = detect_lines(&edges, options);
        debug!("Hough transform found {} lines", lines.len());

        let Some(corners) = outline_corners(&lines, width, height) else {
            return Ok(vec![]);
        };

        if shoelace_area(&corners) < width as f32 * height as f32 * self.min_area_fraction {
            debug!("Quadrilateral candidate too small; discarding");
            return Ok(vec![]);
        }

        let confidence = edge_support(&edges, &corners);
        let [tl, tr, br, bl] = corners.map(|corner| to_normalized(corner, width, height));
        let quad = Quadrilateral {
            top_left: tl,
            top_right: tr,
            bottom_right: br,
            bottom_left: bl,
            confidence,
        };

        debug!("Quadrilateral candidate {:?}", quad);

        if request.accepts(&quad, width, height) {
            Ok(vec![quad])
        } else {
            Ok(vec![])
        }
    }
}

/// Corners (raster coordinates, top-left origin) of the box bounded by the
/// outermost horizontal and vertical lines: [top-left, top-right, bottom-right, bottom-left]
fn outline_corners(lines: &[PolarLine], width: u32, height: u32) -> Option<[(f32, f32); 4]> {
    let (horizontal, vertical): (Vec<PolarLine>, Vec<PolarLine>) = lines
        .iter()
        .filter(|line| is_horizontal(line) || is_vertical(line))
        .partition(|line| is_horizontal(line));

    if horizontal.len() < 2 || vertical.len() < 2 {
        debug!(
            "Not enough edges for a quadrilateral ({} horizontal, {} vertical)",
            horizontal.len(),
            vertical.len()
        );
        return None;
    }

    let mid_x = width as f32 / 2.0;
    let mid_y = height as f32 / 2.0;
    let row_at_mid = |line: &PolarLine| y_at(line, mid_x);
    let col_at_mid = |line: &PolarLine| x_at(line, mid_y);

    let top = extreme(&horizontal, row_at_mid, false)?;
    let bottom = extreme(&horizontal, row_at_mid, true)?;
    let left = extreme(&vertical, col_at_mid, false)?;
    let right = extreme(&vertical, col_at_mid, true)?;

    let clamp = |(x, y): (f32, f32)| (x.clamp(0.0, width as f32), y.clamp(0.0, height as f32));
    Some([
        clamp(intersect(&top, &left)?),
        clamp(intersect(&top, &right)?),
        clamp(intersect(&bottom, &right)?),
        clamp(intersect(&bottom, &left)?),
    ])
}

// The angle is that of the line's normal: ~90 degrees means a horizontal line.
fn is_horizontal(line: &PolarLine) -> bool {
    (60..=120).contains(&line.angle_in_degrees)
}

fn is_vertical(line: &PolarLine) -> bool {
    line.angle_in_degrees <= 30 || line.angle_in_degrees >= 150
}

fn y_at(line: &PolarLine, x: f32) -> f32 {
    let theta = (line.angle_in_degrees as f32).to_radians();
    (line.r - x * theta.cos()) / theta.sin()
}

fn x_at(line: &PolarLine, y: f32) -> f32 {
    let theta = (line.angle_in_degrees as f32).to_radians();
    (line.r - y * theta.sin()) / theta.cos()
}

fn extreme(lines: &[PolarLine], position: impl Fn(&PolarLine) -> f32, largest: bool) -> Option<PolarLine> {
    let cmp = |a: &&PolarLine, b: &&PolarLine| {
        position(a)
            .partial_cmp(&position(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    };
    let found = if largest {
        lines.iter().max_by(cmp)
    } else {
        lines.iter().min_by(cmp)
    };
    found.copied()
}

/// Intersection of two lines `x cos(t) + y sin(t) = r`; `None` when parallel
fn intersect(a: &PolarLine, b: &PolarLine) -> Option<(f32, f32)> {
    let ta = (a.angle_in_degrees as f64).to_radians();
    let tb = (b.angle_in_degrees as f64).to_radians();
    let (ca, sa, cb, sb) = (ta.cos(), ta.sin(), tb.cos(), tb.sin());

    let denom = ca * sb - sa * cb;
    if denom.abs() < 1e-6 {
        return None;
    }

    let (ra, rb) = (a.r as f64, b.r as f64);
    let x = (ra * sb - rb * sa) / denom;
    let y = (rb * ca - ra * cb) / denom;
    Some((x as f32, y as f32))
}

/// Area enclosed by four corners, in squared input units
pub(crate) fn shoelace_area(corners: &[(f32, f32); 4]) -> f32 {
    let mut area = 0.0f32;
    for i in 0..corners.len() {
        let j = (i + 1) % corners.len();
        area += corners[i].0 * corners[j].1 - corners[j].0 * corners[i].1;
    }
    area.abs() / 2.0
}

/// Fraction of points along the quad perimeter that have an edge pixel
/// within two pixels
fn edge_support(edges: &GrayImage, corners: &[(f32, f32); 4]) -> f32 {
    const SAMPLES_PER_SIDE: usize = 50;
    const RADIUS: i64 = 2;

    let (w, h) = (edges.width() as i64, edges.height() as i64);
    let near_edge = |x: f32, y: f32| {
        let (cx, cy) = (x.round() as i64, y.round() as i64);
        (-RADIUS..=RADIUS).any(|dy| {
            (-RADIUS..=RADIUS).any(|dx| {
                let (px, py) = (cx + dx, cy + dy);
                px >= 0 && py >= 0 && px < w && py < h && edges.get_pixel(px as u32, py as u32).0[0] > 0
            })
        })
    };

    let mut hits = 0usize;
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        for s in 0..SAMPLES_PER_SIDE {
            let t = (s as f32 + 0.5) / SAMPLES_PER_SIDE as f32;
            if near_edge(a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t) {
                hits += 1;
            }
        }
    }

    hits as f32 / (SAMPLES_PER_SIDE * corners.len()) as f32
}

/// Raster point (top-left origin) to normalized detector space (bottom-left origin)
fn to_normalized((x, y): (f32, f32), width: u32, height: u32) -> (f32, f32) {
    (x / width as f32, 1.0 - y / height as f32)
}
