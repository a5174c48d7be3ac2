//! Repository for the `uploads` table.
//!
//! The claim is the one point of cross-worker mutual exclusion in the whole
//! pipeline: it is a conditional UPDATE that only succeeds while the row is
//! still QUEUED, so exactly one worker can move a job into PROCESSING.

use sqlx::PgPool;
use uuid::Uuid;

use anpr_models::{JobCounters, UploadJob, UploadStatus};

/// Column list for `uploads` queries.
const COLUMNS: &str = "\
    id, camera_id, storage_path, status, error_message, \
    detections_total, events_created, skipped_by_reason, \
    created_at, started_at, completed_at";

/// Provides lifecycle operations for upload jobs.
pub struct JobRepo;

impl JobRepo {
    /// Atomically claim a QUEUED job, transitioning it to PROCESSING.
    ///
    /// Returns `None` when the job does not exist or was already claimed by
    /// another worker; the caller must then drop the queue message without
    /// processing.
    pub async fn claim(pool: &PgPool, job_id: Uuid) -> Result<Option<UploadJob>, sqlx::Error> {
        let query = format!(
            "UPDATE uploads \
             SET status = $2, started_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UploadJob>(&query)
            .bind(job_id)
            .bind(UploadStatus::Processing)
            .bind(UploadStatus::Queued)
            .fetch_optional(pool)
            .await
    }

    /// Transition a PROCESSING job to DONE, recording completion counters.
    pub async fn mark_done(
        pool: &PgPool,
        job_id: Uuid,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE uploads \
             SET status = $2, completed_at = NOW(), \
                 detections_total = $3, events_created = $4, skipped_by_reason = $5 \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(UploadStatus::Done)
        .bind(counters.detections_total as i32)
        .bind(counters.events_created as i32)
        .bind(counters.skipped_json())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition a PROCESSING job to FAILED with the causal error message.
    pub async fn mark_failed(
        pool: &PgPool,
        job_id: Uuid,
        error_message: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE uploads \
             SET status = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(UploadStatus::Failed)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(())
    }
}
