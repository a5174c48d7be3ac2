//! Detector error types.
//!
//! Every failure class the remote service can produce is a distinct variant
//! so logs and metrics can tell them apart. All of them are fatal to the
//! current job; none may be downgraded to "zero detections".

use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector configuration invalid: {0}")]
    Config(String),

    #[error("Health probe timed out after {timeout_secs}s: {url}")]
    HealthTimeout { url: String, timeout_secs: u64 },

    #[error("Health probe returned status {status}: {url}")]
    HealthStatus { url: String, status: u16 },

    #[error("Health probe failed: {url}: {message}")]
    HealthUnreachable { url: String, message: String },

    #[error("Batch {batch_index} timed out after {elapsed_ms}ms")]
    BatchTimeout { batch_index: usize, elapsed_ms: u64 },

    #[error("Batch {batch_index} failed with status {status}: {body}")]
    BatchHttp {
        batch_index: usize,
        status: u16,
        body: String,
    },

    #[error("Batch {batch_index} request failed: {message}")]
    BatchNetwork { batch_index: usize, message: String },

    #[error("Batch {batch_index} response invalid: {message}")]
    InvalidResponse { batch_index: usize, message: String },

    #[error("Batch {batch_index} protocol violation: {message}")]
    Protocol { batch_index: usize, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Media error: {0}")]
    Media(#[from] anpr_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Stable class label for logs and metrics.
    pub fn class(&self) -> &'static str {
        match self {
            DetectorError::Config(_) => "config",
            DetectorError::HealthTimeout { .. } => "health_timeout",
            DetectorError::HealthStatus { .. } => "health_status",
            DetectorError::HealthUnreachable { .. } => "health_unreachable",
            DetectorError::BatchTimeout { .. } => "batch_timeout",
            DetectorError::BatchHttp { .. } => "batch_http",
            DetectorError::BatchNetwork { .. } => "batch_network",
            DetectorError::InvalidResponse { .. } => "invalid_response",
            DetectorError::Protocol { .. } => "protocol",
            DetectorError::Model(_) => "model",
            DetectorError::Media(_) => "media",
            DetectorError::Io(_) => "io",
        }
    }
}
