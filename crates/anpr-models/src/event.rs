//! Durable event records for accepted detections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::bbox::BBox;

/// Human review state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ReviewState {
    #[default]
    Unreviewed,
    Confirmed,
    Rejected,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Unreviewed => "unreviewed",
            ReviewState::Confirmed => "confirmed",
            ReviewState::Rejected => "rejected",
        }
    }
}

/// A row from the `events` table: one accepted plate detection.
///
/// An event is only ever created after its crop has been durably stored, so
/// `crop_path` is non-null by construction. Events are never deleted by the
/// pipeline; review fields are mutated later by the admin surface.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub camera_id: Uuid,
    /// Plate text as read off the crop (may be the UNREAD sentinel).
    pub plate: String,
    /// Uppercase alphanumeric form used for matching.
    pub normalized_plate: String,
    /// Detection-stage confidence in [0, 1].
    pub confidence: f64,
    pub bbox: Json<BBox>,
    /// Global frame index within the source video.
    pub frame_no: i64,
    /// Object-storage key of the stored crop.
    pub crop_path: String,
    pub captured_at: DateTime<Utc>,
    pub review_state: ReviewState,
    /// Plate text corrected by a human reviewer, when present.
    pub corrected_plate: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub upload_id: Uuid,
    pub camera_id: Uuid,
    pub plate: String,
    pub normalized_plate: String,
    pub confidence: f64,
    pub bbox: BBox,
    pub frame_no: i64,
    pub crop_path: String,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_state_default() {
        assert_eq!(ReviewState::default(), ReviewState::Unreviewed);
    }

    #[test]
    fn test_review_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReviewState::Unreviewed).unwrap(),
            "\"unreviewed\""
        );
    }
}
