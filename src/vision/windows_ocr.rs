//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr). The engine has no accuracy or
//! language-correction switches and reports no confidence, so every line
//! is returned with confidence 1.0.

use image::RgbaImage;
use tracing::{debug, info, warn};
use windows::{
    core::HSTRING,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrLine, OcrResult as WinOcrResult},
    Storage::Streams::{DataReader, DataWriter, InMemoryRandomAccessStream},
};

use super::ocr::{LineBounds, OcrError, RecognitionOptions, RecognizedLine, TextRecognizer};

fn engine_error(what: &str) -> impl FnOnce(windows::core::Error) -> OcrError + '_ {
    move |e| OcrError::Engine(format!("{}: {}", what, e))
}

/// Windows OCR engine wrapper
pub struct WindowsOcr {
    engine: WinOcrEngine,
    language: String,
}

impl WindowsOcr {
    /// Create an engine for `language_tag`, falling back to the user profile languages
    pub fn new(language_tag: &str) -> Result<Self, OcrError> {
        info!("Initializing Windows OCR engine with language: {}", language_tag);

        let language = Language::CreateLanguage(&HSTRING::from(language_tag))
            .map_err(engine_error("Failed to create language"))?;

        if !WinOcrEngine::IsLanguageSupported(&language)
            .map_err(engine_error("Failed to check language support"))?
        {
            warn!("Language '{}' not supported, falling back to system default", language_tag);
            let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
                .map_err(engine_error("Failed to create OCR engine from user profile"))?;

            let lang_tag = engine
                .RecognizerLanguage()
                .and_then(|lang| lang.LanguageTag())
                .map_err(engine_error("Failed to get recognizer language"))?
                .to_string();

            info!("Windows OCR initialized with language: {}", lang_tag);
            return Ok(Self { engine, language: lang_tag });
        }

        let engine = WinOcrEngine::TryCreateFromLanguage(&language)
            .map_err(engine_error("Failed to create OCR engine for language"))?;

        Ok(Self {
            engine,
            language: language_tag.to_string(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// OCR languages installed on this system
    pub fn available_languages() -> Result<Vec<String>, OcrError> {
        let languages = WinOcrEngine::AvailableRecognizerLanguages()
            .map_err(engine_error("Failed to get available languages"))?;

        let mut result = Vec::new();
        for lang in languages {
            if let Ok(tag) = lang.LanguageTag() {
                result.push(tag.to_string());
            }
        }

        Ok(result)
    }
}

impl TextRecognizer for WindowsOcr {
    fn recognize(&self, image: &RgbaImage, _options: &RecognitionOptions) -> Result<Vec<RecognizedLine>, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("empty image ({}x{})", width, height)));
        }

        debug!("Windows OCR: Processing {}x{} image", width, height);

        let bgra = rgba_to_bgra(image.as_raw());
        let bitmap = create_software_bitmap(&bgra, width, height)?;

        let result: WinOcrResult = self
            .engine
            .RecognizeAsync(&bitmap)
            .map_err(engine_error("Failed to start OCR recognition"))?
            .get()
            .map_err(engine_error("OCR recognition failed"))?;

        let lines = extract_lines(&result)?;
        debug!("Windows OCR: Found {} lines", lines.len());
        Ok(lines)
    }
}

/// Convert RGBA to BGRA (Windows expects BGRA)
fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    let mut bgra = rgba.to_vec();
    for chunk in bgra.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }
    bgra
}

fn create_software_bitmap(bgra: &[u8], width: u32, height: u32) -> Result<SoftwareBitmap, OcrError> {
    let stream = InMemoryRandomAccessStream::new().map_err(engine_error("Failed to create in-memory stream"))?;
    let writer = DataWriter::CreateDataWriter(&stream).map_err(engine_error("Failed to create data writer"))?;

    writer.WriteBytes(bgra).map_err(engine_error("Failed to write pixel data"))?;
    writer
        .StoreAsync()
        .and_then(|op| op.get())
        .map_err(engine_error("Failed to store pixel data"))?;
    writer
        .FlushAsync()
        .and_then(|op| op.get())
        .map_err(engine_error("Failed to flush pixel data"))?;

    let bitmap = SoftwareBitmap::Create(BitmapPixelFormat::Bgra8, width as i32, height as i32)
        .map_err(engine_error("Failed to create SoftwareBitmap"))?;

    let input = stream.GetInputStreamAt(0).map_err(engine_error("Failed to get input stream"))?;
    let reader = DataReader::CreateDataReader(&input).map_err(engine_error("Failed to create data reader"))?;
    reader
        .LoadAsync(bgra.len() as u32)
        .and_then(|op| op.get())
        .map_err(engine_error("Failed to load pixel data"))?;

    let buffer = reader
        .ReadBuffer(bgra.len() as u32)
        .map_err(engine_error("Failed to read buffer"))?;
    bitmap
        .CopyFromBuffer(&buffer)
        .map_err(engine_error("Failed to copy buffer to bitmap"))?;

    Ok(bitmap)
}

/// One line per OCR line, bounded by the union of its word rectangles
fn extract_lines(result: &WinOcrResult) -> Result<Vec<RecognizedLine>, OcrError> {
    let lines = result.Lines().map_err(engine_error("Failed to get OCR lines"))?;

    let mut recognized = Vec::new();
    for line in lines {
        let text = line
            .Text()
            .map_err(engine_error("Failed to get line text"))?
            .to_string();

        recognized.push(RecognizedLine {
            text,
            confidence: 1.0,
            bounds: line_bounds(&line),
        });
    }

    Ok(recognized)
}

fn line_bounds(line: &OcrLine) -> Option<LineBounds> {
    let words = line.Words().ok()?;

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for word in words {
        let Ok(rect) = word.BoundingRect() else { continue };
        min_x = min_x.min(rect.X);
        min_y = min_y.min(rect.Y);
        max_x = max_x.max(rect.X + rect.Width);
        max_y = max_y.max(rect.Y + rect.Height);
    }

    if !min_x.is_finite() || !max_x.is_finite() {
        return None;
    }

    Some(LineBounds {
        x: min_x.max(0.0) as u32,
        y: min_y.max(0.0) as u32,
        width: (max_x - min_x).max(0.0) as u32,
        height: (max_y - min_y).max(0.0) as u32,
    })
}
