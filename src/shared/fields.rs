//! Badge field and attendee type enumerations

use serde::{Deserialize, Serialize};

/// Attendee attribute that can be captured from a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BadgeField {
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "role")]
    Role,
    #[serde(rename = "company")]
    Company,
    #[serde(rename = "department")]
    Department,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "attendeeType")]
    AttendeeType,
    #[serde(rename = "other")]
    Other,
}

impl BadgeField {
    /// Every field, in canonical display order
    pub const ALL: [BadgeField; 8] = [
        BadgeField::Title,
        BadgeField::Name,
        BadgeField::Role,
        BadgeField::Company,
        BadgeField::Department,
        BadgeField::Email,
        BadgeField::AttendeeType,
        BadgeField::Other,
    ];

    /// Stable key used for persistence and region maps
    pub fn key(self) -> &'static str {
        match self {
            BadgeField::Title => "title",
            BadgeField::Name => "name",
            BadgeField::Role => "role",
            BadgeField::Company => "company",
            BadgeField::Department => "department",
            BadgeField::Email => "email",
            BadgeField::AttendeeType => "attendeeType",
            BadgeField::Other => "other",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            BadgeField::Title => "Title",
            BadgeField::Name => "Name",
            BadgeField::Role => "Role",
            BadgeField::Company => "Company",
            BadgeField::Department => "Department",
            BadgeField::Email => "Email",
            BadgeField::AttendeeType => "Attendee Type",
            BadgeField::Other => "Other",
        }
    }

    /// Look up a field by its persistence key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Fields on the out-of-the-box capture form
    pub fn default_selection() -> Vec<BadgeField> {
        vec![BadgeField::Name, BadgeField::Company]
    }

    pub fn default_keys() -> Vec<String> {
        Self::default_selection()
            .into_iter()
            .map(|field| field.key().to_string())
            .collect()
    }
}

impl std::fmt::Display for BadgeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of attendee printed on a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttendeeType {
    Speaker,
    #[default]
    Attendee,
    Vendor,
    Organiser,
    Other,
}

impl AttendeeType {
    pub const ALL: [AttendeeType; 5] = [
        AttendeeType::Speaker,
        AttendeeType::Attendee,
        AttendeeType::Vendor,
        AttendeeType::Organiser,
        AttendeeType::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            AttendeeType::Speaker => "Speaker",
            AttendeeType::Attendee => "Attendee",
            AttendeeType::Vendor => "Vendor",
            AttendeeType::Organiser => "Organiser",
            AttendeeType::Other => "Other",
        }
    }

    /// Parse recognized badge text into an attendee type.
    ///
    /// Matching is case-insensitive on the trimmed text and accepts the
    /// American spelling "organizer". Returns `None` for blank or unknown text.
    pub fn from_text(text: &str) -> Option<Self> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        if needle == "organizer" {
            return Some(AttendeeType::Organiser);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.display_name().to_lowercase() == needle)
    }
}
