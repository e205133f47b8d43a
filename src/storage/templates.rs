//! Badge template storage and loading
//!
//! A template records which fields an event's badges carry and where each
//! one is printed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::shared::{BadgeField, NormalizedRect};

/// Where one field is printed on the badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRegion {
    /// Badge field key (e.g., "name")
    pub field_key: String,
    /// Region bounds relative to the corrected badge image
    #[serde(flatten)]
    pub rect: NormalizedRect,
}

impl BadgeRegion {
    pub fn new(field_key: impl Into<String>, rect: NormalizedRect) -> Self {
        Self {
            field_key: field_key.into(),
            rect: rect.clamped(),
        }
    }
}

/// Badge layout for an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BadgeTemplate {
    /// Display name
    pub name: String,
    /// Ordered badge field keys shown on the capture form
    pub field_keys: Vec<String>,
    /// Configured field regions
    pub regions: Vec<BadgeRegion>,
}

impl BadgeTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_keys: BadgeField::default_keys(),
            regions: Vec::new(),
        }
    }

    /// Known fields from `field_keys`, in order. Empty when none are known.
    pub fn selected_fields(&self) -> Vec<BadgeField> {
        self.field_keys
            .iter()
            .filter_map(|key| BadgeField::from_key(key))
            .collect()
    }

    /// Usable regions keyed by field key.
    ///
    /// Zero-area regions are skipped. A later region for the same key
    /// replaces an earlier one.
    pub fn regions_by_key(&self) -> HashMap<String, NormalizedRect> {
        let mut map = HashMap::new();
        for region in &self.regions {
            let rect = region.rect.clamped();
            if rect.is_empty() {
                continue;
            }
            map.insert(region.field_key.clone(), rect);
        }
        map
    }

    pub fn has_regions(&self) -> bool {
        !self.regions_by_key().is_empty()
    }

    /// Set the region for `field_key`, replacing any existing one
    pub fn set_region(&mut self, field_key: &str, rect: NormalizedRect) {
        self.regions.retain(|region| region.field_key != field_key);
        self.regions.push(BadgeRegion::new(field_key, rect));
    }

    /// Remove the region for `field_key`. Returns whether one existed.
    pub fn clear_region(&mut self, field_key: &str) -> bool {
        let before = self.regions.len();
        self.regions.retain(|region| region.field_key != field_key);
        self.regions.len() != before
    }
}

/// Load a badge template from file
pub fn load_template(path: &Path) -> Result<BadgeTemplate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {}", path.display()))?;
    let template: BadgeTemplate = serde_json::from_str(&content)
        .with_context(|| format!("Invalid template {}", path.display()))?;
    Ok(template)
}

/// Save a badge template to file
pub fn save_template(template: &BadgeTemplate, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(template)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write template {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_regions_by_key_skips_degenerate() {
        let mut template = BadgeTemplate::new("Expo");
        template.regions.push(BadgeRegion::new("name", NormalizedRect::new(0.1, 0.1, 0.8, 0.2)));
        template.regions.push(BadgeRegion::new("title", NormalizedRect::ZERO));
        template.regions.push(BadgeRegion::new("company", NormalizedRect::new(0.1, 0.5, 0.8, 0.0)));

        let map = template.regions_by_key();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("name"));
        assert!(template.has_regions());
    }

    #[test]
    fn test_later_region_replaces_earlier() {
        let mut template = BadgeTemplate::new("Expo");
        template.regions.push(BadgeRegion::new("name", NormalizedRect::new(0.0, 0.0, 0.5, 0.5)));
        template.regions.push(BadgeRegion::new("name", NormalizedRect::new(0.5, 0.5, 0.5, 0.5)));

        assert_eq!(template.regions_by_key()["name"].x, 0.5);
    }

    #[test]
    fn test_set_and_clear_region() {
        let mut template = BadgeTemplate::new("Expo");
        template.set_region("name", NormalizedRect { x: -1.0, y: 0.2, width: 2.0, height: 0.3 });
        template.set_region("name", NormalizedRect::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(template.regions.len(), 1);
        assert_eq!(template.regions[0].rect, NormalizedRect::new(0.1, 0.2, 0.3, 0.4));

        assert!(template.clear_region("name"));
        assert!(!template.clear_region("name"));
        assert!(!template.has_regions());
    }

    #[test]
    fn test_set_region_clamps() {
        let mut template = BadgeTemplate::default();
        template.set_region("email", NormalizedRect { x: -1.0, y: 0.2, width: 2.0, height: 0.3 });
        let rect = template.regions[0].rect;
        assert_eq!((rect.x, rect.width), (0.0, 1.0));
    }

    #[test]
    fn test_selected_fields_known_keys_only() {
        let mut template = BadgeTemplate::default();
        assert!(template.selected_fields().is_empty());
        assert_eq!(BadgeTemplate::new("Expo").selected_fields(), BadgeField::default_selection());

        template.field_keys = vec!["badgeColour".into()];
        assert!(template.selected_fields().is_empty());

        template.field_keys = vec!["title".into(), "name".into()];
        assert_eq!(template.selected_fields(), vec![BadgeField::Title, BadgeField::Name]);
    }

    #[test]
    fn test_template_json_format() {
        let json = r#"{
            "name": "DevConf",
            "fieldKeys": ["name", "company"],
            "regions": [{"fieldKey": "name", "x": 0.1, "y": 0.2, "width": 0.5, "height": 0.1}]
        }"#;
        let template: BadgeTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.name, "DevConf");
        assert_eq!(template.regions[0].field_key, "name");
        assert_eq!(template.regions[0].rect.width, 0.5);
    }

    #[test]
    fn test_save_and_load_template() {
        let mut template = BadgeTemplate::new("Expo");
        template.set_region("company", NormalizedRect::new(0.0, 0.6, 1.0, 0.2));

        let temp_file = NamedTempFile::new().unwrap();
        save_template(&template, temp_file.path()).unwrap();

        assert_eq!(load_template(temp_file.path()).unwrap(), template);
    }

    #[test]
    fn test_save_template_to_missing_dir() {
        let err = save_template(&BadgeTemplate::new("Expo"), Path::new("/nonexistent/dir/template.json"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to write template"));
    }

    #[test]
    fn test_load_template_not_found() {
        assert!(load_template(Path::new("/nonexistent/template.json")).is_err());
    }
}
