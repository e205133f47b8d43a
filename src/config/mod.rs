//! Scanner Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::shared::BadgeField;
use crate::vision::{EnhanceSettings, GeometrySettings, QuadRequest, RecognitionLevel, RecognitionOptions};

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Scanner settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Geometry correction and enhancement settings
    pub preprocessing: PreprocessingConfig,
    /// Text recognition settings
    pub recognition: RecognitionConfig,
    /// Badge fields shown on the capture form
    pub fields: FieldsConfig,
}

/// Image preparation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Longer side limit in pixels
    pub max_dimension: u32,
    /// Detect and dewarp the badge outline
    pub perspective_correction: bool,
    /// Minimum badge outline confidence (0.0 - 1.0)
    pub min_quad_confidence: f32,
    /// Minimum badge outline short/long side ratio
    pub min_quad_aspect_ratio: f32,
    /// Apply auto-contrast and auto-exposure
    pub enhance: bool,
    /// Histogram fraction clipped at each end by auto-contrast
    pub enhance_clip_fraction: f32,
    /// Target mean luminance for underexposed images (0.0 - 1.0)
    pub exposure_target: f32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2200,
            perspective_correction: true,
            min_quad_confidence: 0.6,
            min_quad_aspect_ratio: 0.3,
            enhance: true,
            enhance_clip_fraction: 0.005,
            exposure_target: 0.45,
        }
    }
}

/// Text recognition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Recognition accuracy mode
    pub level: RecognitionLevel,
    /// Enable language-model correction
    pub language_correction: bool,
    /// Ignore text shorter than this fraction of the image height
    pub minimum_text_height: f32,
    /// Recognition language (e.g., "en-US")
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            level: RecognitionLevel::Accurate,
            language_correction: true,
            minimum_text_height: 0.02,
            language: "en-US".to_string(),
        }
    }
}

/// Capture form settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Ordered badge field keys (e.g., "name", "company")
    pub selected: Vec<String>,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            selected: BadgeField::default_keys(),
        }
    }
}

impl ScannerConfig {
    /// Copy with out-of-range values clamped
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();

        let pre = &mut config.preprocessing;
        pre.max_dimension = pre.max_dimension.max(1);
        pre.min_quad_confidence = clamp_unit(pre.min_quad_confidence);
        pre.min_quad_aspect_ratio = clamp_unit(pre.min_quad_aspect_ratio);
        pre.enhance_clip_fraction = pre.enhance_clip_fraction.clamp(0.0, 0.5);
        if pre.enhance_clip_fraction.is_nan() {
            pre.enhance_clip_fraction = 0.0;
        }
        pre.exposure_target = clamp_unit(pre.exposure_target);

        let rec = &mut config.recognition;
        rec.minimum_text_height = clamp_unit(rec.minimum_text_height);
        if rec.language.trim().is_empty() {
            rec.language = RecognitionConfig::default().language;
        }

        config
    }

    pub fn geometry_settings(&self) -> GeometrySettings {
        GeometrySettings {
            max_dimension: self.preprocessing.max_dimension,
            perspective_correction: self.preprocessing.perspective_correction,
            request: QuadRequest {
                max_observations: 1,
                min_confidence: self.preprocessing.min_quad_confidence,
                min_aspect_ratio: self.preprocessing.min_quad_aspect_ratio,
            },
        }
    }

    pub fn enhance_settings(&self) -> EnhanceSettings {
        EnhanceSettings {
            enabled: self.preprocessing.enhance,
            clip_fraction: self.preprocessing.enhance_clip_fraction,
            exposure_target: self.preprocessing.exposure_target,
        }
    }

    pub fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions {
            level: self.recognition.level,
            uses_language_correction: self.recognition.language_correction,
            minimum_text_height: self.recognition.minimum_text_height,
            language: self.recognition.language.clone(),
        }
    }

    /// Known fields from `fields.selected`, in order, or the default selection
    pub fn selected_fields(&self) -> Vec<BadgeField> {
        let fields: Vec<BadgeField> = self
            .fields
            .selected
            .iter()
            .filter_map(|key| BadgeField::from_key(key))
            .collect();

        if fields.is_empty() {
            BadgeField::default_selection()
        } else {
            fields
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Default config file location
pub fn default_config_path() -> Result<PathBuf> {
    Ok(crate::storage::get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<ScannerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ScannerConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config.sanitized())
}

/// Load configuration, using defaults when the file does not exist
pub fn load_or_default(path: &Path) -> Result<ScannerConfig> {
    if !path.exists() {
        debug!("No config at {}; using defaults", path.display());
        return Ok(ScannerConfig::default());
    }

    let config = load_config(path)?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ScannerConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}
