//! Shared badge data model
//!
//! Value types passed between the capture, vision and analysis layers.
//! All of them are transient: created per scan and dropped once the caller
//! has mapped them into its own persisted entities.

pub mod attendee;
pub mod fields;
pub mod rect;

pub use attendee::{Attendee, AttendeeRecord, ParsedAttendee};
pub use fields::{AttendeeType, BadgeField};
pub use rect::{NormalizedRect, PixelRect};
