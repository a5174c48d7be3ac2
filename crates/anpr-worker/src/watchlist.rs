//! Watchlist matching.
//!
//! Matches a normalized plate against the watch patterns that are live right
//! now. Pure and idempotent: the same plate against the same pattern set
//! always yields the same matches.

use chrono::{DateTime, Utc};

use anpr_models::WatchPattern;

/// Patterns that match `normalized_plate` at `now`, in input order.
///
/// Inactive and expired patterns never match, regardless of their text.
pub fn matching_patterns<'a>(
    normalized_plate: &str,
    patterns: &'a [WatchPattern],
    now: DateTime<Utc>,
) -> Vec<&'a WatchPattern> {
    patterns
        .iter()
        .filter(|p| p.is_live(now))
        .filter(|p| p.matches(normalized_plate))
        .collect()
}
