//! Repository for watch patterns and watch matches.

use sqlx::PgPool;
use uuid::Uuid;

use anpr_models::{WatchMatch, WatchPattern};

/// Column list for `watch_patterns` queries.
const PATTERN_COLUMNS: &str = "\
    id, plate_pattern, description, active, expires_at, notification_webhook, \
    created_at";

/// Read-side access to patterns plus match inserts.
pub struct WatchRepo;

impl WatchRepo {
    /// All patterns currently flagged active.
    ///
    /// Expiry is evaluated by the matcher at match time, so a pattern that
    /// expires mid-job stops matching without a DB round trip.
    pub async fn active_patterns(pool: &PgPool) -> Result<Vec<WatchPattern>, sqlx::Error> {
        let query = format!(
            "SELECT {PATTERN_COLUMNS} FROM watch_patterns WHERE active = TRUE"
        );
        sqlx::query_as::<_, WatchPattern>(&query)
            .fetch_all(pool)
            .await
    }

    /// Link an event to a pattern that matched it at creation time.
    pub async fn insert_match(
        pool: &PgPool,
        pattern_id: Uuid,
        event_id: Uuid,
    ) -> Result<WatchMatch, sqlx::Error> {
        sqlx::query_as::<_, WatchMatch>(
            "INSERT INTO watch_matches (pattern_id, event_id) \
             VALUES ($1, $2) \
             RETURNING id, pattern_id, event_id, created_at",
        )
        .bind(pattern_id)
        .bind(event_id)
        .fetch_one(pool)
        .await
    }
}
