//! Region-based text recognition
//!
//! Fans out one blocking recognition task per badge region and joins them
//! all before the result map is handed back. Tasks write into a single
//! pre-allocated map guarded by one mutex.

use futures_util::future::join_all;
use image::{imageops, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::ocr::{recognize_text, OcrError, RecognitionOptions, RecognitionResult, TextRecognizer};
use crate::shared::NormalizedRect;

/// Key used when a batch has no regions and the whole image is recognized
pub const WHOLE_IMAGE_KEY: &str = "__image__";

/// Crop a normalized region out of an image.
///
/// Out-of-range rectangles are clamped; the crop is always at least 1x1.
pub fn crop_region(image: &RgbaImage, region: &NormalizedRect) -> Result<RgbaImage, OcrError> {
    let bounds = region
        .to_pixel_rect(image.width(), image.height())
        .ok_or_else(|| {
            OcrError::InvalidImage(format!(
                "cannot crop {}x{} image",
                image.width(),
                image.height()
            ))
        })?;

    Ok(imageops::crop_imm(image, bounds.x, bounds.y, bounds.width, bounds.height).to_image())
}

/// Recognizes text in keyed badge regions concurrently
#[derive(Clone)]
pub struct RegionRecognizer {
    recognizer: Arc<dyn TextRecognizer>,
    options: RecognitionOptions,
}

impl RegionRecognizer {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, options: RecognitionOptions) -> Self {
        Self { recognizer, options }
    }

    /// Recognize the whole image, propagating backend errors
    pub async fn recognize_whole(&self, image: Arc<RgbaImage>) -> Result<RecognitionResult, OcrError> {
        let recognizer = self.recognizer.clone();
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || recognize_text(recognizer.as_ref(), &image, &options))
            .await
            .map_err(|e| OcrError::Engine(e.to_string()))?
    }

    /// Recognize every region and return results keyed like the input.
    ///
    /// An empty region map recognizes the whole image under
    /// [`WHOLE_IMAGE_KEY`]. A region whose crop or recognition fails yields an
    /// empty result instead of failing the batch. The map is only returned
    /// once every region task has finished.
    pub async fn recognize(
        &self,
        image: Arc<RgbaImage>,
        regions: &HashMap<String, NormalizedRect>,
    ) -> HashMap<String, RecognitionResult> {
        let mut jobs: Vec<(String, Option<NormalizedRect>)> = regions
            .iter()
            .map(|(key, rect)| (key.clone(), Some(*rect)))
            .collect();
        if jobs.is_empty() {
            jobs.push((WHOLE_IMAGE_KEY.to_string(), None));
        }

        let start = Instant::now();
        let results = Arc::new(Mutex::new(HashMap::with_capacity(jobs.len())));

        let mut keys = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());
        for (key, rect) in jobs {
            let image = image.clone();
            let recognizer = self.recognizer.clone();
            let options = self.options.clone();
            let results = results.clone();
            let task_key = key.clone();

            keys.push(key);
            handles.push(tokio::task::spawn_blocking(move || {
                let result = recognize_one(recognizer.as_ref(), &image, rect.as_ref(), &options)
                    .unwrap_or_else(|e| {
                        warn!("Recognition failed for region '{}': {}", task_key, e);
                        RecognitionResult::empty()
                    });
                results.lock().insert(task_key, result);
            }));
        }

        let outcomes = join_all(handles).await;

        let mut results = std::mem::take(&mut *results.lock());
        for (key, outcome) in keys.into_iter().zip(outcomes) {
            if let Err(e) = outcome {
                warn!("Recognition task for region '{}' did not complete: {}", key, e);
                results.entry(key).or_insert_with(RecognitionResult::empty);
            }
        }

        info!(
            "Recognized {} regions in {:?}",
            results.len(),
            start.elapsed()
        );

        results
    }

    /// Text-only variant of [`RegionRecognizer::recognize`]
    pub async fn recognize_text(
        &self,
        image: Arc<RgbaImage>,
        regions: &HashMap<String, NormalizedRect>,
    ) -> HashMap<String, String> {
        self.recognize(image, regions)
            .await
            .into_iter()
            .map(|(key, result)| (key, result.text))
            .collect()
    }
}

fn recognize_one(
    recognizer: &dyn TextRecognizer,
    image: &RgbaImage,
    region: Option<&NormalizedRect>,
    options: &RecognitionOptions,
) -> Result<RecognitionResult, OcrError> {
    match region {
        Some(rect) => {
            let crop = crop_region(image, rect)?;
            debug!(
                "Cropped region ({:.3}, {:.3}, {:.3}, {:.3}) to {}x{}",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                crop.width(),
                crop.height()
            );
            recognize_text(recognizer, &crop, options)
        }
        None => recognize_text(recognizer, image, options),
    }
}
