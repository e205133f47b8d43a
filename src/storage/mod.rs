//! Storage Layer
//!
//! Handles persistence of badge templates and attendee lists as JSON files,
//! plus the per-user config directory.

pub mod attendees;
pub mod templates;

pub use attendees::{load_attendees, save_attendees};
pub use templates::{load_template, save_template, BadgeRegion, BadgeTemplate};

use anyhow::Result;
use std::path::PathBuf;

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "badgescanner", "BadgeScanner")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}
