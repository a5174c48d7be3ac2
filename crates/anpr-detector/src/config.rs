//! Detector configuration.

use std::time::Duration;

use crate::error::{DetectorError, DetectorResult};

/// Which backend variant to run.
///
/// Selected once at startup; there is no runtime re-selection and no
/// fallback between variants. An unknown name is a configuration error, not
/// an implicit stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Seeded pseudo-random detections; development and pipeline tests.
    Stub,
    /// In-process ONNX detection + recognition.
    Local,
    /// External inference microservice over HTTP.
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Stub => "stub",
            BackendKind::Local => "local",
            BackendKind::Remote => "remote",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(DetectorError::config(format!(
                "unknown detector backend '{}' (expected stub|local|remote)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for detector construction.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Backend variant
    pub backend: BackendKind,
    /// Frame extraction rate
    pub fps: u32,
    /// Detections below this confidence are dropped by the adapter
    pub confidence_threshold: f64,
    /// Fixed seed for the stub backend (deterministic runs)
    pub stub_seed: Option<u64>,
    /// Path to the plate detection ONNX model (local backend)
    pub finder_model_path: String,
    /// Path to the plate recognition ONNX model (local backend)
    pub reader_model_path: String,
    /// Base URL of the remote inference service
    pub remote_url: Option<String>,
    /// Optional bearer token for the remote service
    pub remote_auth_token: Option<String>,
    /// Frames per batch request
    pub batch_size: usize,
    /// Health probe deadline
    pub health_timeout: Duration,
    /// Per-batch connect deadline; connection failure should surface fast
    pub connect_timeout: Duration,
    /// Per-batch read deadline; batch inference time is effectively unbounded
    pub read_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Stub,
            fps: 1,
            confidence_threshold: 0.30,
            stub_seed: None,
            finder_model_path: "models/plate_detect.onnx".to_string(),
            reader_model_path: "models/plate_read.onnx".to_string(),
            remote_url: None,
            remote_auth_token: None,
            batch_size: 8,
            health_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(90),
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DetectorResult<Self> {
        let backend = std::env::var("DETECTOR_BACKEND")
            .unwrap_or_else(|_| "stub".to_string())
            .parse::<BackendKind>()?;

        Ok(Self {
            backend,
            fps: std::env::var("FRAME_EXTRACTION_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            confidence_threshold: std::env::var("DETECT_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.30),
            stub_seed: std::env::var("STUB_SEED").ok().and_then(|s| s.parse().ok()),
            finder_model_path: std::env::var("PLATE_DETECT_MODEL")
                .unwrap_or_else(|_| "models/plate_detect.onnx".to_string()),
            reader_model_path: std::env::var("PLATE_READ_MODEL")
                .unwrap_or_else(|_| "models/plate_read.onnx".to_string()),
            remote_url: std::env::var("REMOTE_INFERENCE_URL").ok(),
            remote_auth_token: std::env::var("REMOTE_INFERENCE_TOKEN").ok(),
            batch_size: std::env::var("REMOTE_FRAME_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            health_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(
                std::env::var("REMOTE_CONNECT_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            read_timeout: Duration::from_secs(
                std::env::var("REMOTE_FRAME_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(90),
            ),
        })
    }
}
