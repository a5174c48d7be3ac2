//! The closed set of detector backends.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{BackendKind, DetectorConfig};
use crate::detection::DetectionRun;
use crate::error::DetectorResult;
use crate::local::LocalModelDetector;
use crate::onnx::{OnnxFinderConfig, OnnxPlateFinder, OnnxPlateReader, OnnxReaderConfig};
use crate::remote::RemoteDetector;
use crate::stub::StubDetector;

/// One detection backend, selected once at startup.
///
/// Construction failures propagate; a worker that cannot build its backend
/// must not start consuming jobs. There is deliberately no fallback from one
/// variant to another.
pub enum DetectorBackend {
    Stub(StubDetector),
    Local(LocalModelDetector),
    Remote(RemoteDetector),
}

impl DetectorBackend {
    /// Build the configured backend.
    pub async fn from_config(config: &DetectorConfig) -> DetectorResult<Self> {
        info!(backend = %config.backend, fps = config.fps, "Initializing detector backend");

        let backend = match config.backend {
            BackendKind::Stub => {
                DetectorBackend::Stub(StubDetector::new(config.stub_seed, config.fps))
            }
            BackendKind::Local => {
                let finder = OnnxPlateFinder::new(OnnxFinderConfig {
                    model_path: config.finder_model_path.clone(),
                    ..Default::default()
                })?;
                let reader = OnnxPlateReader::new(OnnxReaderConfig {
                    model_path: config.reader_model_path.clone(),
                    ..Default::default()
                })?;
                DetectorBackend::Local(LocalModelDetector::new(
                    config.fps,
                    Arc::new(finder),
                    Arc::new(reader),
                ))
            }
            BackendKind::Remote => DetectorBackend::Remote(RemoteDetector::connect(config).await?),
        };

        Ok(backend)
    }

    /// Variant name for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectorBackend::Stub(_) => "stub",
            DetectorBackend::Local(_) => "local",
            DetectorBackend::Remote(_) => "remote",
        }
    }

    /// Run detection over a video, applying the adapter-level confidence
    /// threshold so downstream code is variant-agnostic.
    pub async fn process(
        &self,
        video: &Path,
        camera_id: &str,
        confidence_threshold: f64,
    ) -> DetectorResult<DetectionRun> {
        let mut run = match self {
            DetectorBackend::Stub(stub) => stub.process()?,
            DetectorBackend::Local(local) => local.process(video).await?,
            DetectorBackend::Remote(remote) => remote.process(video, camera_id).await?,
        };

        let before = run.detections.len();
        run.detections
            .retain(|d| d.confidence >= confidence_threshold);
        if run.detections.len() < before {
            debug!(
                dropped = before - run.detections.len(),
                threshold = confidence_threshold,
                "Dropped low-confidence detections"
            );
        }

        Ok(run)
    }
}
