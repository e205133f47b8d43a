//! Heuristic badge text parser
//!
//! Turns unstructured recognized text into attendee fields. The passes run
//! in a fixed order over the same input, each filling part of the result:
//!
//! 1. name: first line without `@` that has at least two words
//! 2. links and phones over the whole text (last phone wins, first
//!    website wins, a LinkedIn link always replaces the previous one)
//! 3. email fallback: first `@` token when no mailto link was found
//! 4. title and company: the two lines following the name line

use tracing::debug;

use super::detectors::{detect, Detection};
use crate::shared::ParsedAttendee;

/// Mis-decoded renderings of the UTF-8 bullet `•`
const GARBLED_BULLETS: [&str; 2] = ["\u{e2}\u{20ac}\u{a2}", "\u{e2}\u{80}\u{a2}"];

/// Parse raw badge text into attendee fields
pub fn parse(raw: &str) -> ParsedAttendee {
    let mut result = ParsedAttendee::default();
    let lines = split_lines(raw);

    let name_index = lines.iter().position(|line| is_name_candidate(line));
    if let Some(index) = name_index {
        result.full_name = Some(lines[index].clone());
    }

    for detection in detect(raw) {
        match detection {
            Detection::Link(link) => {
                if link.mentions_linkedin() {
                    result.linkedin_url = Some(link.as_str().to_string());
                } else if link.is_http() {
                    if result.website.is_none() {
                        result.website = Some(link.as_str().to_string());
                    }
                } else if link.is_mailto() {
                    result.email = Some(link.as_str().replace("mailto:", ""));
                }
            }
            Detection::Phone(number) => result.phone = Some(number),
        }
    }

    if result.email.is_none() {
        result.email = fallback_email(raw);
    }

    if let Some(index) = name_index {
        let mut after = lines.iter().skip(index + 1);
        result.title = after.next().cloned();
        result.company = after.next().cloned();
    }

    debug!(
        "Parsed {} lines: name={} email={} phone={}",
        lines.len(),
        result.full_name.is_some(),
        result.email.is_some(),
        result.phone.is_some()
    );

    result
}

/// Non-empty trimmed lines, with garbled bullets replaced by spaces
pub fn split_lines(raw: &str) -> Vec<String> {
    let mut cleaned = raw.to_string();
    for bullet in GARBLED_BULLETS {
        cleaned = cleaned.replace(bullet, " ");
    }

    cleaned
        .split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_name_candidate(line: &str) -> bool {
    !line.contains('@') && line.split_whitespace().nth(1).is_some()
}

/// First whitespace-delimited token containing `@`, without surrounding punctuation
fn fallback_email(raw: &str) -> Option<String> {
    raw.split_whitespace()
        .find(|token| token.contains('@'))
        .map(|token| {
            token
                .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>'))
                .to_string()
        })
}
