//! Watch patterns and watch matches.
//!
//! Patterns are owned by the BOLO admin surface; the pipeline only reads the
//! active set and records matches at event-creation time. A pattern added or
//! deactivated later has no retroactive effect on existing events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `watch_patterns` table: one plate-matching rule.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WatchPattern {
    pub id: Uuid,
    /// Literal characters plus `*` as a multi-character wildcard.
    pub plate_pattern: String,
    pub description: Option<String>,
    pub active: bool,
    /// Patterns past their expiry are skipped even while still flagged active.
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional webhook notified when the pattern matches a new event.
    pub notification_webhook: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WatchPattern {
    /// Check whether the pattern is eligible for matching at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.expires_at {
            Some(expiry) => expiry > now,
            None => true,
        }
    }

    /// Match this pattern against a normalized plate.
    pub fn matches(&self, normalized_plate: &str) -> bool {
        pattern_matches(&self.plate_pattern, normalized_plate)
    }
}

/// A row from the `watch_matches` table: a pattern that matched an event
/// when the event was created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WatchMatch {
    pub id: Uuid,
    pub pattern_id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Anchored glob match of `pattern` against `text`, case-insensitive.
///
/// `*` matches zero or more characters; every other character matches
/// literally. The whole text must be consumed — `ABC*` does not match
/// `XABC123`.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.to_uppercase().chars().collect();
    let txt: Vec<char> = text.to_uppercase().chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;

    while t < txt.len() {
        if p < pat.len() && pat[p] == '*' {
            star = Some(p);
            mark = t;
            p += 1;
        } else if p < pat.len() && pat[p] == txt[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            // Backtrack: let the last star swallow one more character.
            p = s + 1;
            mark += 1;
            t = mark;
        } else {
            return false;
        }
    }

    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str, active: bool, expires_at: Option<DateTime<Utc>>) -> WatchPattern {
        WatchPattern {
            id: Uuid::new_v4(),
            plate_pattern: text.to_string(),
            description: None,
            active,
            expires_at,
            notification_webhook: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_literal_match() {
        assert!(pattern_matches("ABC123", "ABC123"));
        assert!(!pattern_matches("ABC123", "ABC124"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(pattern_matches("abc123", "ABC123"));
        assert!(pattern_matches("ABC*", "abc999"));
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(pattern_matches("ABC*", "ABC123"));
        assert!(!pattern_matches("XYZ*", "ABC123"));
    }

    #[test]
    fn test_wildcard_matches_zero_characters() {
        // Both interpretations of "*": zero characters...
        assert!(pattern_matches("ABC*", "ABC"));
        assert!(pattern_matches("*ABC", "ABC"));
        // ...and many.
        assert!(pattern_matches("A*C", "ABBBBC"));
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(!pattern_matches("ABC*", "XABC123"));
        assert!(!pattern_matches("*ABC", "ABCX"));
        assert!(!pattern_matches("BC1", "ABC123"));
    }

    #[test]
    fn test_multiple_wildcards() {
        assert!(pattern_matches("A*1*3", "ABC123"));
        assert!(pattern_matches("*", "ANYTHING"));
        assert!(pattern_matches("*", ""));
        assert!(!pattern_matches("A*X*3", "ABC123"));
    }

    #[test]
    fn test_backtracking() {
        // The first star must not greedily consume past a later literal run.
        assert!(pattern_matches("*23", "ABC123"));
        assert!(pattern_matches("A*23", "A2323"));
    }

    #[test]
    fn test_is_live() {
        let now = Utc::now();
        assert!(pattern("ABC*", true, None).is_live(now));
        assert!(!pattern("ABC*", false, None).is_live(now));
        assert!(pattern("ABC*", true, Some(now + chrono::Duration::hours(1))).is_live(now));
        assert!(!pattern("ABC*", true, Some(now - chrono::Duration::hours(1))).is_live(now));
    }
}
