//! Badge Scanner - conference badge text extraction
//!
//! Corrects and enhances a badge photo, recognizes its text (per template
//! region or for the whole image), parses attendee fields out of it and
//! matches the result against existing attendees.

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod shared;
pub mod storage;
pub mod vision;

pub use app::{BadgeScanner, ScanExtraction};
