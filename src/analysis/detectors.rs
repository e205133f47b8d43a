//! Link and phone number detection in free text
//!
//! One combined pattern is scanned left to right so matches never overlap
//! and come back in the order they appear in the text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Top-level domains accepted for bare `example.com` style links
const BARE_DOMAIN_TLDS: &str = "com|org|net|io|co|dev|ai|app|edu|gov|info|biz|me|tv|us|uk|ca|au|de|fr|nl|es|it|ch|se|eu|in|jp";

static DETECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r#"(?xi)
        (?P<mailto>mailto:[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{{2,}})
        | (?P<email>[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{{2,}})
        | (?P<url>(?:https?|ftp)://[^\s<>"]+)
        | (?P<www>www\.[a-z0-9\-]+(?:\.[a-z0-9\-]+)+(?:/[^\s<>"]*)?)
        | (?P<domain>\b[a-z0-9\-]+(?:\.[a-z0-9\-]+)*\.(?:{tlds})\b(?:/[^\s<>"]*)?)
        | (?P<phone>\+?\(?\d(?:[\ \t().\-]*\d){{6,14}})
        "#,
        tlds = BARE_DOMAIN_TLDS
    );
    Regex::new(&pattern).expect("detector pattern is valid")
});

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// A structured item found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// A link in absolute form (`https://...`, `mailto:...`)
    Link(Link),
    /// A phone number exactly as written
    Phone(String),
}

/// A detected link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    url: String,
}

impl Link {
    fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Absolute string form
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Lowercase scheme without the colon
    pub fn scheme(&self) -> String {
        self.url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn is_http(&self) -> bool {
        self.scheme().starts_with("http")
    }

    pub fn is_mailto(&self) -> bool {
        self.scheme() == "mailto"
    }

    pub fn mentions_linkedin(&self) -> bool {
        self.url.to_lowercase().contains("linkedin")
    }
}

/// Detect links and phone numbers in `text`, in order of appearance
pub fn detect(text: &str) -> Vec<Detection> {
    DETECTOR_RE
        .captures_iter(text)
        .filter_map(|caps| classify(text, &caps))
        .collect()
}

fn classify(text: &str, caps: &Captures<'_>) -> Option<Detection> {
    if let Some(m) = caps.name("mailto") {
        let address = &m.as_str()["mailto:".len()..];
        return Some(Detection::Link(Link::new(format!("mailto:{}", address))));
    }
    if let Some(m) = caps.name("email") {
        return Some(Detection::Link(Link::new(format!("mailto:{}", m.as_str()))));
    }
    if let Some(m) = caps.name("url") {
        return Some(Detection::Link(Link::new(trim_link(m.as_str()))));
    }
    if let Some(m) = caps.name("www").or_else(|| caps.name("domain")) {
        return Some(Detection::Link(Link::new(format!("http://{}", trim_link(m.as_str())))));
    }
    if let Some(m) = caps.name("phone") {
        // Digits glued to a word are codes or room numbers
        if text[..m.start()].chars().next_back().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
        if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
            return Some(Detection::Phone(m.as_str().to_string()));
        }
    }
    None
}

// Sentence punctuation that followed the link in the text
fn trim_link(link: &str) -> &str {
    link.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '\'' | '"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(text: &str) -> Vec<String> {
        detect(text)
            .into_iter()
            .filter_map(|d| match d {
                Detection::Link(link) => Some(link.as_str().to_string()),
                Detection::Phone(_) => None,
            })
            .collect()
    }

    fn phones(text: &str) -> Vec<String> {
        detect(text)
            .into_iter()
            .filter_map(|d| match d {
                Detection::Phone(phone) => Some(phone),
                Detection::Link(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_detects_emails_as_mailto() {
        assert_eq!(links("reach me at jane.doe@acme.io today"), vec!["mailto:jane.doe@acme.io"]);
        assert_eq!(links("MAILTO:Jane@Acme.io"), vec!["mailto:Jane@Acme.io"]);
    }

    #[test]
    fn test_detects_urls_in_order() {
        let found = links("see https://acme.io/about, then www.example.org and fruit.co");
        assert_eq!(
            found,
            vec!["https://acme.io/about", "http://www.example.org", "http://fruit.co"]
        );
    }

    #[test]
    fn test_bare_domain_needs_known_tld() {
        assert!(links("Fruit Co.").is_empty());
        assert!(links("version 1.2.3").is_empty());
        assert!(links("fruit.company").is_empty());
    }

    #[test]
    fn test_link_classification() {
        let link = Link::new("HTTPS://LinkedIn.com/in/jane");
        assert_eq!(link.scheme(), "https");
        assert!(link.is_http());
        assert!(link.mentions_linkedin());
        assert!(Link::new("mailto:a@b.co").is_mailto());
        assert!(!Link::new("ftp://files.acme.io").is_http());
    }

    #[test]
    fn test_detects_phone_numbers() {
        assert_eq!(phones("Tel: +1 (555) 123-4567"), vec!["+1 (555) 123-4567"]);
        assert_eq!(phones("0412 345 678\n020 7946 0958"), vec!["0412 345 678", "020 7946 0958"]);
    }

    #[test]
    fn test_digits_attached_to_words_are_not_phones() {
        assert!(phones("Room A1234567").is_empty());
        assert!(phones("ref_5551234567").is_empty());
        assert_eq!(phones("Room A1 tel 555-123-4567"), vec!["555-123-4567"]);
        assert_eq!(phones("Tel:5551234567"), vec!["5551234567"]);
    }

    #[test]
    fn test_short_numbers_are_not_phones() {
        assert!(phones("Booth 42, Hall 2024").is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert!(detect("").is_empty());
    }
}
