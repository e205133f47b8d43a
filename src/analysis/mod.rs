//! Analysis Layer
//!
//! Turns recognized badge text into attendee fields and reconciles the
//! result with existing attendees.

pub mod dedupe;
pub mod detectors;
pub mod merge;
pub mod parser;

pub use dedupe::find_existing;
pub use merge::{map_by_field, merge_region_text};
pub use parser::parse;
