//! Merge of per-region recognition text

use std::collections::HashMap;

use crate::shared::BadgeField;

/// Join region texts in `ordered_keys` order, one trimmed value per line.
///
/// Keys missing from `per_region` and blank values are skipped. When no
/// line remains, `fallback` is returned verbatim.
pub fn merge_region_text<V, K>(per_region: &HashMap<String, V>, fallback: &str, ordered_keys: &[K]) -> String
where
    V: AsRef<str>,
    K: AsRef<str>,
{
    let lines: Vec<&str> = ordered_keys
        .iter()
        .filter_map(|key| per_region.get(key.as_ref()))
        .map(|text| text.as_ref().trim())
        .filter(|text| !text.is_empty())
        .collect();

    if lines.is_empty() {
        fallback.to_string()
    } else {
        lines.join("\n")
    }
}

/// Trimmed, non-empty region text for each selected field
pub fn map_by_field<V: AsRef<str>>(
    per_region: &HashMap<String, V>,
    selected: &[BadgeField],
) -> HashMap<BadgeField, String> {
    selected
        .iter()
        .filter_map(|field| {
            let text = per_region.get(field.key())?.as_ref().trim();
            (!text.is_empty()).then(|| (*field, text.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_all_empty_regions_use_fallback() {
        let regions = texts(&[("name", ""), ("company", "  \n")]);
        assert_eq!(merge_region_text(&regions, "Raw OCR Text", &["name", "company"]), "Raw OCR Text");
    }

    #[test]
    fn test_no_regions_use_fallback() {
        let regions: HashMap<String, String> = HashMap::new();
        assert_eq!(merge_region_text(&regions, "whole\nimage", &["name"]), "whole\nimage");
        let no_keys: [&str; 0] = [];
        assert_eq!(merge_region_text(&regions, "", &no_keys), "");
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let regions = texts(&[("name", "Jane Doe"), ("company", "")]);
        assert_eq!(merge_region_text(&regions, "fallback", &["name", "company"]), "Jane Doe");
    }

    #[test]
    fn test_follows_key_order() {
        let regions = texts(&[("name", " Jane Doe "), ("company", "Acme"), ("title", "CTO")]);
        let merged = merge_region_text(&regions, "", &["company", "missing", "name"]);
        assert_eq!(merged, "Acme\nJane Doe");
    }

    #[test]
    fn test_map_by_field() {
        let regions = texts(&[("name", " Jane Doe\n"), ("company", " "), ("email", "jane@acme.io")]);
        let mapped = map_by_field(&regions, &[BadgeField::Name, BadgeField::Company, BadgeField::Title]);

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[&BadgeField::Name], "Jane Doe");
    }
}
