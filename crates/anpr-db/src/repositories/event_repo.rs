//! Repository for the `events` table.

use sqlx::types::Json;
use sqlx::PgPool;

use anpr_models::{Event, NewEvent, ReviewState};

/// Column list for `events` queries.
const COLUMNS: &str = "\
    id, upload_id, camera_id, plate, normalized_plate, confidence, \
    bbox, frame_no, crop_path, captured_at, review_state, corrected_plate, \
    created_at";

/// Insert-only access to events. Review mutation belongs to the admin
/// surface, not the pipeline.
pub struct EventRepo;

impl EventRepo {
    /// Persist an accepted detection. The crop must already be stored; the
    /// crop key is non-null by construction.
    pub async fn insert(pool: &PgPool, event: &NewEvent) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events \
             (upload_id, camera_id, plate, normalized_plate, confidence, \
              bbox, frame_no, crop_path, captured_at, review_state) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(event.upload_id)
            .bind(event.camera_id)
            .bind(&event.plate)
            .bind(&event.normalized_plate)
            .bind(event.confidence)
            .bind(Json(event.bbox))
            .bind(event.frame_no)
            .bind(&event.crop_path)
            .bind(event.captured_at)
            .bind(ReviewState::Unreviewed)
            .fetch_one(pool)
            .await
    }
}
