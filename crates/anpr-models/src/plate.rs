//! Plate text normalization.

/// Sentinel plate text for crops the recognizer could not read.
pub const UNREAD_PLATE: &str = "UNREAD";

/// Normalize plate text: uppercase, then strip everything outside `[A-Z0-9]`.
///
/// Matching and deduplication always operate on the normalized form; the raw
/// text as read off the plate is preserved separately on the event.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
