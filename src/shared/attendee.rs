//! Attendee records and parsed badge output

use serde::{Deserialize, Serialize};

use super::fields::AttendeeType;

/// Attendee fields guessed from unstructured badge text.
///
/// `None` means the field was not detected. Parsing never produces an empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAttendee {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
}

impl ParsedAttendee {
    /// True when nothing was detected
    pub fn is_empty(&self) -> bool {
        *self == ParsedAttendee::default()
    }
}

/// A stored attendee that can be matched against a fresh scan
pub trait AttendeeRecord {
    fn email(&self) -> Option<&str>;
    fn phone(&self) -> Option<&str>;
}

/// Attendee entity as persisted by the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attendee {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub attendee_type: Option<AttendeeType>,
}

impl Attendee {
    /// Fill fields that are still blank from parsed badge text.
    ///
    /// Fields the user already typed are kept.
    pub fn apply_parsed(&mut self, parsed: &ParsedAttendee) {
        fill(&mut self.full_name, &parsed.full_name);
        fill(&mut self.title, &parsed.title);
        fill(&mut self.company, &parsed.company);
        fill(&mut self.email, &parsed.email);
        fill(&mut self.phone, &parsed.phone);
        fill(&mut self.website, &parsed.website);
        fill(&mut self.linkedin_url, &parsed.linkedin_url);
    }
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    let blank = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if blank {
        if let Some(value) = value {
            *slot = Some(value.clone());
        }
    }
}

impl AttendeeRecord for Attendee {
    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_parsed_keeps_user_input() {
        let mut attendee = Attendee {
            full_name: Some("Jane Doe".to_string()),
            company: Some("  ".to_string()),
            ..Default::default()
        };
        let parsed = ParsedAttendee {
            full_name: Some("J. Doe".to_string()),
            company: Some("Acme".to_string()),
            email: Some("jane@acme.example".to_string()),
            ..Default::default()
        };

        attendee.apply_parsed(&parsed);

        assert_eq!(attendee.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(attendee.company.as_deref(), Some("Acme"));
        assert_eq!(attendee.email.as_deref(), Some("jane@acme.example"));
        assert!(attendee.title.is_none());
    }

    #[test]
    fn test_parsed_default_is_empty() {
        assert!(ParsedAttendee::default().is_empty());
    }

    #[test]
    fn test_attendee_deserializes_partial_json() {
        let attendee: Attendee = serde_json::from_str(r#"{"email":"a@x.com","attendee_type":"Speaker"}"#).unwrap();
        assert_eq!(attendee.email(), Some("a@x.com"));
        assert_eq!(attendee.phone(), None);
        assert_eq!(attendee.attendee_type, Some(AttendeeType::Speaker));
    }
}
