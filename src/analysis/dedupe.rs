//! Matching a scan against existing attendees

use tracing::debug;

use crate::shared::AttendeeRecord;

/// Find the first candidate that matches by email, then by phone.
///
/// Email compares case-insensitively; phone compares exactly. Blank keys
/// are ignored, and with no usable key the candidates are not scanned.
/// Iteration order decides between several matches.
pub fn find_existing<'a, R, I>(email: Option<&str>, phone: Option<&str>, candidates: I) -> Option<&'a R>
where
    R: AttendeeRecord + 'a,
    I: IntoIterator<Item = &'a R>,
    I::IntoIter: Clone,
{
    let email = email.filter(|e| !e.is_empty());
    let phone = phone.filter(|p| !p.is_empty());
    if email.is_none() && phone.is_none() {
        return None;
    }

    let candidates = candidates.into_iter();

    if let Some(email) = email {
        let wanted = email.to_lowercase();
        let found = candidates
            .clone()
            .find(|candidate| candidate.email().unwrap_or("").to_lowercase() == wanted);
        if found.is_some() {
            debug!("Existing attendee matched by email");
            return found;
        }
    }

    if let Some(phone) = phone {
        let found = candidates.clone().find(|candidate| candidate.phone().unwrap_or("") == phone);
        if found.is_some() {
            debug!("Existing attendee matched by phone");
            return found;
        }
    }

    debug!("No existing attendee matched");
    None
}
