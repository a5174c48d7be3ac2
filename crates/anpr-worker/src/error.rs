//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Detector error: {0}")]
    Detector(#[from] anpr_detector::DetectorError),

    #[error("Storage error: {0}")]
    Storage(#[from] anpr_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] anpr_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] anpr_queue::QueueError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
