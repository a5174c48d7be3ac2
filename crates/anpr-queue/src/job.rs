//! Queue job payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job to process one uploaded video.
///
/// The payload carries everything the worker needs to start without a DB
/// read; the upload row remains the source of truth for lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessUploadJob {
    /// Upload row ID; doubles as the job identity.
    pub upload_id: Uuid,
    /// Camera that produced the video.
    pub camera_id: Uuid,
    /// Object-storage key of the source video.
    pub storage_path: String,
}

impl ProcessUploadJob {
    pub fn new(upload_id: Uuid, camera_id: Uuid, storage_path: impl Into<String>) -> Self {
        Self {
            upload_id,
            camera_id,
            storage_path: storage_path.into(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("process:{}", self.upload_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let job = ProcessUploadJob::new(Uuid::new_v4(), Uuid::new_v4(), "videos/a.mp4");
        let json = serde_json::to_string(&job).unwrap();
        let back: ProcessUploadJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.upload_id, job.upload_id);
        assert_eq!(back.storage_path, "videos/a.mp4");
    }

    #[test]
    fn test_idempotency_key_is_stable() {
        let job = ProcessUploadJob::new(Uuid::new_v4(), Uuid::new_v4(), "videos/a.mp4");
        assert_eq!(job.idempotency_key(), job.idempotency_key());
        assert!(job.idempotency_key().contains(&job.upload_id.to_string()));
    }
}
