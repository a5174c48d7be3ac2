//! Upload jobs and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::skip::SkipSummary;

/// Processing status of an uploaded video.
///
/// QUEUED → PROCESSING → DONE | FAILED. The QUEUED → PROCESSING transition is
/// the claim and must be atomic across workers; DONE and FAILED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Waiting for a worker.
    #[default]
    Queued,
    /// Claimed by exactly one worker.
    Processing,
    /// Completed; counters are populated.
    Done,
    /// Terminated with an error; `error_message` is populated.
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Processing => "processing",
            UploadStatus::Done => "done",
            UploadStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Done | UploadStatus::Failed)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row from the `uploads` table: one video awaiting (or done) processing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UploadJob {
    pub id: Uuid,
    /// Camera that produced the video.
    pub camera_id: Uuid,
    /// Object-storage key of the source video.
    pub storage_path: String,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    /// Total raw detections yielded by the backend; populated at completion.
    pub detections_total: Option<i32>,
    /// Detections persisted as events; populated at completion.
    pub events_created: Option<i32>,
    /// Per-reason skip counters as JSON; populated at completion.
    pub skipped_by_reason: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Set when a worker claims the job.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the job reaches a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counters accumulated while a job is processed, written back at completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCounters {
    pub detections_total: u32,
    pub events_created: u32,
    pub skipped: SkipSummary,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw detection yielded by the backend.
    pub fn record_detection(&mut self) {
        self.detections_total += 1;
    }

    /// Record a persisted event.
    pub fn record_event(&mut self) {
        self.events_created += 1;
    }

    /// Skip counters as a JSON object for the `skipped_by_reason` column.
    pub fn skipped_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.skipped).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skip::SkipReason;

    #[test]
    fn test_status_terminal() {
        assert!(!UploadStatus::Queued.is_terminal());
        assert!(!UploadStatus::Processing.is_terminal());
        assert!(UploadStatus::Done.is_terminal());
        assert!(UploadStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&UploadStatus::Processing).unwrap(),
            "\"processing\""
        );
    }

    #[test]
    fn test_counters_accumulate() {
        let mut counters = JobCounters::new();
        for _ in 0..18 {
            counters.record_detection();
        }
        for _ in 0..10 {
            counters.record_event();
        }
        for _ in 0..5 {
            counters.skipped.record(SkipReason::TooSmall);
        }
        for _ in 0..3 {
            counters.skipped.record(SkipReason::SolidColor);
        }

        assert_eq!(counters.detections_total, 18);
        assert_eq!(counters.events_created, 10);
        assert_eq!(counters.skipped.total(), 8);

        let json = counters.skipped_json();
        assert_eq!(json["too_small"], 5);
        assert_eq!(json["solid_color"], 3);
    }
}
