//! Watch-match webhook notification.
//!
//! Delivery is best-effort: a webhook that is down must never fail the job
//! or block event creation, so failures are logged and swallowed.

use std::time::Duration;

use serde_json::json;
use tracing::{error, info};

use anpr_models::{Event, WatchPattern};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// POST a match notification to the pattern's webhook, when configured.
pub async fn send_watch_notification(
    http: &reqwest::Client,
    pattern: &WatchPattern,
    event: &Event,
) {
    let Some(webhook) = &pattern.notification_webhook else {
        return;
    };

    let payload = json!({
        "pattern_id": pattern.id,
        "event_id": event.id,
        "plate": event.plate,
        "confidence": event.confidence,
        "captured_at": event.captured_at,
    });

    match http
        .post(webhook)
        .json(&payload)
        .timeout(WEBHOOK_TIMEOUT)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            info!(pattern_id = %pattern.id, event_id = %event.id, "Watch webhook sent");
        }
        Ok(response) => {
            error!(
                pattern_id = %pattern.id,
                status = response.status().as_u16(),
                "Watch webhook rejected"
            );
        }
        Err(e) => {
            error!(pattern_id = %pattern.id, error = %e, "Failed to send watch webhook");
        }
    }
}
