//! Scan Coordinator
//!
//! Wires the pipeline together: geometry correction, enhancement, region or
//! whole-image recognition, then parsing or merging of the recognized text.

use image::RgbaImage;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::analysis::{find_existing, map_by_field, merge_region_text, parse};
use crate::capture::CapturedImage;
use crate::config::ScannerConfig;
use crate::shared::{AttendeeRecord, AttendeeType, BadgeField, ParsedAttendee};
use crate::storage::BadgeTemplate;
use crate::vision::{
    GeometryCorrector, HoughQuadDetector, ImageEnhancer, OcrError, QuadDetector, RecognitionResult,
    RegionRecognizer, TextRecognizer,
};

/// Text extracted from one badge scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ScanExtraction {
    /// No regions configured: the whole image was recognized and parsed
    WholeImage {
        raw_text: String,
        confidence: f64,
        parsed: ParsedAttendee,
    },
    /// Template regions were recognized individually
    Regions {
        /// Region texts merged in field order, or the whole-image text
        raw_text: String,
        /// Recognition result per region key
        results: HashMap<String, RecognitionResult>,
        /// Non-empty region text per selected field
        by_field: HashMap<BadgeField, String>,
    },
}

impl ScanExtraction {
    pub fn raw_text(&self) -> &str {
        match self {
            ScanExtraction::WholeImage { raw_text, .. } => raw_text,
            ScanExtraction::Regions { raw_text, .. } => raw_text,
        }
    }

    /// Attendee fields for autofill.
    ///
    /// On the region path, name, title (or role) and company come only from
    /// their regions, since line positions in the merged text follow the
    /// field order rather than the badge layout. Phone, website and LinkedIn
    /// come from parsing the merged text, as does the email when no email
    /// region produced one.
    pub fn attendee_fields(&self) -> ParsedAttendee {
        match self {
            ScanExtraction::WholeImage { parsed, .. } => parsed.clone(),
            ScanExtraction::Regions { raw_text, by_field, .. } => {
                let ParsedAttendee {
                    email,
                    phone,
                    website,
                    linkedin_url,
                    ..
                } = parse(raw_text);
                let field = |f: BadgeField| by_field.get(&f).cloned();

                ParsedAttendee {
                    full_name: field(BadgeField::Name),
                    title: field(BadgeField::Title).or_else(|| field(BadgeField::Role)),
                    company: field(BadgeField::Company),
                    email: field(BadgeField::Email).or(email),
                    phone,
                    website,
                    linkedin_url,
                }
            }
        }
    }

    /// Attendee type read from its badge region, if one was configured
    pub fn attendee_type(&self) -> Option<AttendeeType> {
        match self {
            ScanExtraction::Regions { by_field, .. } => by_field
                .get(&BadgeField::AttendeeType)
                .and_then(|text| AttendeeType::from_text(text)),
            ScanExtraction::WholeImage { .. } => None,
        }
    }
}

/// Badge scanning pipeline
pub struct BadgeScanner {
    config: ScannerConfig,
    corrector: GeometryCorrector,
    enhancer: ImageEnhancer,
    recognizer: RegionRecognizer,
}

impl BadgeScanner {
    /// Create a scanner using the built-in badge outline detector
    pub fn new(config: ScannerConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self::with_detector(config, recognizer, Arc::new(HoughQuadDetector::default()))
    }

    /// Create a scanner with a custom badge outline detector
    pub fn with_detector(
        config: ScannerConfig,
        recognizer: Arc<dyn TextRecognizer>,
        detector: Arc<dyn QuadDetector>,
    ) -> Self {
        let config = config.sanitized();
        let corrector = GeometryCorrector::new(config.geometry_settings(), detector);
        let enhancer = ImageEnhancer::new(config.enhance_settings());
        let recognizer = RegionRecognizer::new(recognizer, config.recognition_options());

        Self {
            config,
            corrector,
            enhancer,
            recognizer,
        }
    }

    /// Correct and enhance a capture. CPU-bound; blocks the calling thread.
    pub fn preprocess(&self, captured: &CapturedImage) -> RgbaImage {
        preprocess_with(&self.corrector, &self.enhancer, captured)
    }

    /// Scan a badge.
    ///
    /// Without a template (or with one that has no usable regions) the whole
    /// image is recognized and parsed, and recognition errors are returned.
    /// Otherwise every region and the whole image are recognized
    /// concurrently; region failures leave that region empty.
    pub async fn scan(
        &self,
        captured: &CapturedImage,
        template: Option<&BadgeTemplate>,
    ) -> Result<ScanExtraction, OcrError> {
        let start = Instant::now();

        let corrector = self.corrector.clone();
        let enhancer = self.enhancer.clone();
        let capture = captured.clone();
        let image = tokio::task::spawn_blocking(move || preprocess_with(&corrector, &enhancer, &capture))
            .await
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        let image = Arc::new(image);

        let regions = template.map(BadgeTemplate::regions_by_key).unwrap_or_default();

        let extraction = if regions.is_empty() {
            let whole = self.recognizer.recognize_whole(image).await?;
            let parsed = parse(&whole.text);
            ScanExtraction::WholeImage {
                raw_text: whole.text,
                confidence: whole.confidence,
                parsed,
            }
        } else {
            let selected = template
                .map(BadgeTemplate::selected_fields)
                .filter(|fields| !fields.is_empty())
                .unwrap_or_else(|| self.config.selected_fields());

            info!("Recognizing {} badge regions", regions.len());
            let (results, whole) = tokio::join!(
                self.recognizer.recognize(image.clone(), &regions),
                self.recognizer.recognize_whole(image.clone()),
            );

            let fallback = whole.map(|result| result.text).unwrap_or_else(|e| {
                warn!("Whole-image recognition failed: {}", e);
                String::new()
            });

            let ordered_keys: Vec<&str> = selected.iter().map(|field| field.key()).collect();
            let raw_text = merge_region_text(&results, &fallback, &ordered_keys);
            let by_field = map_by_field(&results, &selected);

            ScanExtraction::Regions {
                raw_text,
                results,
                by_field,
            }
        };

        info!("Badge scanned in {:?}", start.elapsed());
        Ok(extraction)
    }

    /// Look up an existing attendee matching the scan's email or phone
    pub fn find_existing<'a, R>(&self, extraction: &ScanExtraction, candidates: &'a [R]) -> Option<&'a R>
    where
        R: AttendeeRecord,
    {
        let fields = extraction.attendee_fields();
        find_existing(fields.email.as_deref(), fields.phone.as_deref(), candidates)
    }
}

fn preprocess_with(corrector: &GeometryCorrector, enhancer: &ImageEnhancer, captured: &CapturedImage) -> RgbaImage {
    let corrected = corrector.correct(captured);
    let enhanced = enhancer.enhance(&corrected);
    debug!("Preprocessed capture to {}x{}", enhanced.width(), enhanced.height());
    enhanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Attendee, NormalizedRect};
    use crate::vision::{QuadRequest, Quadrilateral, RecognitionOptions, RecognizedLine, VisionError};
    use image::Rgba;

    /// Returns text keyed by the crop's top-left red value
    struct ColorRecognizer {
        texts: HashMap<u8, &'static str>,
        whole: &'static str,
    }

    impl TextRecognizer for ColorRecognizer {
        fn recognize(&self, image: &RgbaImage, _: &RecognitionOptions) -> Result<Vec<RecognizedLine>, OcrError> {
            if image.width() > 50 {
                return Ok(self.whole.lines().map(|line| RecognizedLine::new(line, 0.9)).collect());
            }
            let red = image.get_pixel(0, 0).0[0];
            let text = self.texts.get(&red).copied().unwrap_or("");
            Ok(text.lines().map(|line| RecognizedLine::new(line, 0.8)).collect())
        }
    }

    struct BrokenRecognizer;

    impl TextRecognizer for BrokenRecognizer {
        fn recognize(&self, _: &RgbaImage, _: &RecognitionOptions) -> Result<Vec<RecognizedLine>, OcrError> {
            Err(OcrError::Engine("offline".into()))
        }
    }

    struct NoQuad;

    impl QuadDetector for NoQuad {
        fn detect(&self, _: &RgbaImage, _: &QuadRequest) -> Result<Vec<Quadrilateral>, VisionError> {
            Ok(vec![])
        }
    }

    fn raw_config() -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.preprocessing.enhance = false;
        config
    }

    fn scanner(recognizer: Arc<dyn TextRecognizer>) -> BadgeScanner {
        BadgeScanner::with_detector(raw_config(), recognizer, Arc::new(NoQuad))
    }

    /// 100x40 badge: top half red=10, bottom half red=20
    fn badge() -> CapturedImage {
        CapturedImage::upright(RgbaImage::from_fn(100, 40, |_, y| {
            if y < 20 {
                Rgba([10, 0, 0, 255])
            } else {
                Rgba([20, 0, 0, 255])
            }
        }))
    }

    fn template() -> BadgeTemplate {
        let mut template = BadgeTemplate::new("Expo");
        template.field_keys = vec!["name".into(), "company".into()];
        template.set_region("name", NormalizedRect::new(0.0, 0.0, 0.5, 0.5));
        template.set_region("company", NormalizedRect::new(0.0, 0.5, 0.5, 0.5));
        template
    }

    #[tokio::test]
    async fn test_whole_image_scan_parses_text() {
        let recognizer = ColorRecognizer {
            texts: HashMap::new(),
            whole: "Taylor Appleseed\nSoftware Engineer\nFruit Co.\ntaylor@fruit.example",
        };
        let extraction = scanner(Arc::new(recognizer)).scan(&badge(), None).await.unwrap();

        let ScanExtraction::WholeImage { parsed, confidence, .. } = &extraction else {
            panic!("expected whole-image extraction");
        };
        assert_eq!(parsed.full_name.as_deref(), Some("Taylor Appleseed"));
        assert_eq!(parsed.company.as_deref(), Some("Fruit Co."));
        assert!((confidence - 0.9).abs() < 1e-6);
        assert_eq!(extraction.attendee_fields(), parsed.clone());
    }

    #[tokio::test]
    async fn test_region_scan_merges_in_field_order() {
        let recognizer = ColorRecognizer {
            texts: HashMap::from([(10, "Jane Doe"), (20, "Acme")]),
            whole: "whole image text",
        };
        let extraction = scanner(Arc::new(recognizer)).scan(&badge(), Some(&template())).await.unwrap();

        assert_eq!(extraction.raw_text(), "Jane Doe\nAcme");
        let fields = extraction.attendee_fields();
        assert_eq!(fields.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.company.as_deref(), Some("Acme"));
        assert_eq!(fields.title, None);

        let ScanExtraction::Regions { results, by_field, .. } = extraction else {
            panic!("expected region extraction");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(by_field[&BadgeField::Name], "Jane Doe");
    }

    #[tokio::test]
    async fn test_unknown_template_keys_use_configured_order() {
        let recognizer = ColorRecognizer {
            texts: HashMap::from([(10, "Jane Doe"), (20, "Acme")]),
            whole: "whole image text",
        };
        let mut config = raw_config();
        config.fields.selected = vec!["company".into(), "name".into()];
        let scanner = BadgeScanner::with_detector(config, Arc::new(recognizer), Arc::new(NoQuad));

        let mut template = template();
        template.field_keys = vec!["badgeColour".into()];
        let extraction = scanner.scan(&badge(), Some(&template)).await.unwrap();

        assert_eq!(extraction.raw_text(), "Acme\nJane Doe");
    }

    #[test]
    fn test_region_fields_ignore_merged_line_positions() {
        let extraction = ScanExtraction::Regions {
            raw_text: "Jane Doe\nAcme\n+1 (555) 123-4567 jane@acme.io".into(),
            results: HashMap::new(),
            by_field: HashMap::from([
                (BadgeField::Name, "Jane Doe".to_string()),
                (BadgeField::Company, "Acme".to_string()),
            ]),
        };

        let fields = extraction.attendee_fields();
        assert_eq!(fields.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.company.as_deref(), Some("Acme"));
        assert_eq!(fields.title, None);
        assert_eq!(fields.email.as_deref(), Some("jane@acme.io"));
        assert_eq!(fields.phone.as_deref(), Some("+1 (555) 123-4567"));
    }

    #[test]
    fn test_role_region_fills_title() {
        let extraction = ScanExtraction::Regions {
            raw_text: "Jane Doe\nKeynote".into(),
            results: HashMap::new(),
            by_field: HashMap::from([
                (BadgeField::Name, "Jane Doe".to_string()),
                (BadgeField::Role, "Keynote".to_string()),
            ]),
        };
        assert_eq!(extraction.attendee_fields().title.as_deref(), Some("Keynote"));
    }

    #[tokio::test]
    async fn test_empty_regions_fall_back_to_whole_text() {
        let recognizer = ColorRecognizer {
            texts: HashMap::new(),
            whole: "Raw OCR Text",
        };
        let extraction = scanner(Arc::new(recognizer)).scan(&badge(), Some(&template())).await.unwrap();

        assert_eq!(extraction.raw_text(), "Raw OCR Text");
        let ScanExtraction::Regions { by_field, .. } = extraction else {
            panic!("expected region extraction");
        };
        assert!(by_field.is_empty());
    }

    #[tokio::test]
    async fn test_template_without_regions_uses_whole_image() {
        let recognizer = ColorRecognizer {
            texts: HashMap::new(),
            whole: "Jane Doe",
        };
        let template = BadgeTemplate::new("Empty");
        let extraction = scanner(Arc::new(recognizer)).scan(&badge(), Some(&template)).await.unwrap();
        assert!(matches!(extraction, ScanExtraction::WholeImage { .. }));
    }

    #[tokio::test]
    async fn test_whole_image_errors_propagate() {
        let result = scanner(Arc::new(BrokenRecognizer)).scan(&badge(), None).await;
        assert!(matches!(result, Err(OcrError::Engine(_))));
    }

    #[tokio::test]
    async fn test_region_errors_degrade_to_empty() {
        let extraction = scanner(Arc::new(BrokenRecognizer))
            .scan(&badge(), Some(&template()))
            .await
            .unwrap();
        assert_eq!(extraction.raw_text(), "");
    }

    #[test]
    fn test_preprocess_keeps_upright_image() {
        let scanner = scanner(Arc::new(BrokenRecognizer));
        let image = scanner.preprocess(&badge());
        assert_eq!(image.dimensions(), (100, 40));
        assert_eq!(image.get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn test_find_existing_uses_extraction_email() {
        let extraction = ScanExtraction::WholeImage {
            raw_text: String::new(),
            confidence: 0.0,
            parsed: ParsedAttendee {
                email: Some("A@X.com".into()),
                ..Default::default()
            },
        };
        let candidates = vec![Attendee {
            email: Some("a@x.com".into()),
            ..Default::default()
        }];

        let scanner = scanner(Arc::new(BrokenRecognizer));
        assert!(scanner.find_existing(&extraction, &candidates).is_some());
    }

    #[test]
    fn test_attendee_type_from_region() {
        let extraction = ScanExtraction::Regions {
            raw_text: "SPEAKER".into(),
            results: HashMap::new(),
            by_field: HashMap::from([(BadgeField::AttendeeType, "Speaker".to_string())]),
        };
        assert_eq!(extraction.attendee_type(), Some(AttendeeType::Speaker));
    }
}
