//! Text recognition capability
//!
//! The OCR engine is an external collaborator: given pixels it returns text
//! lines with per-line confidence. This module defines that boundary and the
//! whole-image recognition call built on it.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors reported by a text recognition backend
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("engine error: {0}")]
    Engine(String),
    #[error("text recognition is not supported on this platform")]
    Unsupported,
}

/// Accuracy/speed trade-off requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionLevel {
    Fast,
    #[default]
    Accurate,
}

/// Options passed with every recognition request
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    /// Recognition accuracy mode
    pub level: RecognitionLevel,
    /// Enable language-model correction of recognized words
    pub uses_language_correction: bool,
    /// Ignore text shorter than this fraction of the image height
    pub minimum_text_height: f32,
    /// BCP-47 language tag hint (e.g. "en-US")
    pub language: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            uses_language_correction: true,
            minimum_text_height: 0.02,
            language: "en-US".to_string(),
        }
    }
}

impl RecognitionOptions {
    /// Whether a line is tall enough to keep. Lines without bounds are kept.
    pub fn admits(&self, line: &RecognizedLine, image_height: u32) -> bool {
        match line.bounds {
            Some(bounds) if image_height > 0 => {
                bounds.height as f32 / image_height as f32 >= self.minimum_text_height
            }
            _ => true,
        }
    }
}

/// Pixel bounds of a recognized line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One line observation returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    /// Top candidate text
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Line bounds inside the recognized image, when the backend reports them
    pub bounds: Option<LineBounds>,
}

impl RecognizedLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounds: None,
        }
    }
}

/// A text recognition backend.
///
/// Implementations return lines in reading order (top to bottom) and are
/// called from blocking worker threads, so they may block.
pub trait TextRecognizer: Send + Sync {
    fn recognize(
        &self,
        image: &RgbaImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognizedLine>, OcrError>;
}

/// Recognized text of one region or whole image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecognitionResult {
    /// Lines joined with `\n`, top to bottom
    pub text: String,
    /// Length-weighted mean line confidence in `[0, 1]`; 0 when no lines
    pub confidence: f64,
}

impl RecognitionResult {
    /// Result for a region that produced nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Join lines and compute the length-weighted confidence
    /// `sum(confidence_i * len_i) / sum(len_i)`.
    pub fn from_lines(lines: &[RecognizedLine]) -> Self {
        let text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut weighted = 0.0f64;
        let mut total_len = 0.0f64;
        for line in lines {
            let len = line.text.chars().count() as f64;
            weighted += line.confidence as f64 * len;
            total_len += len;
        }

        let confidence = if total_len > 0.0 {
            let mean = weighted / total_len;
            if mean.is_nan() {
                0.0
            } else {
                mean.clamp(0.0, 1.0)
            }
        } else {
            0.0
        };

        Self { text, confidence }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Confidence band for display
    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }

    /// Confidence as a rounded percentage label, e.g. "83%"
    pub fn percent_label(&self) -> String {
        format!("{}%", (self.confidence * 100.0).round() as i64)
    }
}

impl AsRef<str> for RecognitionResult {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Coarse confidence band shown next to autofilled values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.5 {
            ConfidenceLevel::Low
        } else if score < 0.75 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }
}

/// Recognize the whole image.
///
/// Backend errors propagate to the caller; lines below the minimum text
/// height are dropped.
pub fn recognize_text(
    recognizer: &dyn TextRecognizer,
    image: &RgbaImage,
    options: &RecognitionOptions,
) -> Result<RecognitionResult, OcrError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OcrError::InvalidImage(format!(
            "empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let mut lines = recognizer.recognize(image, options)?;
    let before = lines.len();
    lines.retain(|line| options.admits(line, image.height()));

    debug!(
        "Recognized {} lines ({} below minimum height) in {}x{} image",
        lines.len(),
        before - lines.len(),
        image.width(),
        image.height()
    );

    Ok(RecognitionResult::from_lines(&lines))
}
