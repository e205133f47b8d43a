//! Attendee list storage
//!
//! The attendee list is a JSON array ordered by the caller (most recent
//! first). Dedupe matches against it in that order.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::shared::Attendee;

/// Load an attendee list from file
pub fn load_attendees(path: &Path) -> Result<Vec<Attendee>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read attendees {}", path.display()))?;
    let attendees: Vec<Attendee> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid attendee list {}", path.display()))?;

    debug!("Loaded {} attendees from {}", attendees.len(), path.display());
    Ok(attendees)
}

/// Save an attendee list to file
pub fn save_attendees(attendees: &[Attendee], path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(attendees)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write attendees {}", path.display()))?;
    Ok(())
}
