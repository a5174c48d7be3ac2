//! Remote inference backend.
//!
//! Delegates detection to an external HTTP microservice. Frames are
//! extracted locally, grouped into fixed-size batches and sent one batch at
//! a time — batches are never pipelined, so the peak load on the service is
//! bounded by one request. Each batch call carries a short connect timeout
//! and a long read timeout: connection failure should surface fast while
//! batch inference time is effectively unbounded.
//!
//! Every failure class is a distinct [`DetectorError`] variant and fails the
//! job; an empty batch response is success, a malformed one never is.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{error, info, warn};

use anpr_media::{encode_jpeg, Frame, FrameExtractor, FrameSet};
use anpr_models::{normalize_plate, BBox};

use crate::config::DetectorConfig;
use crate::detection::{DetectionRun, RawDetection};
use crate::error::{DetectorError, DetectorResult};

/// Crop JPEG quality for frames shipped to the service.
const FRAME_JPEG_QUALITY: u8 = 90;

/// Response body of `POST /infer/frames`.
///
/// The mapping key is the batch-local frame index as a string integer.
/// Absence of the mapping is a contract violation, distinct from an empty
/// mapping (zero detections).
#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    detections_by_frame: Option<HashMap<String, Vec<WireDetection>>>,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    bbox: WireBBox,
    confidence: f64,
    #[serde(default)]
    plate: Option<String>,
    #[serde(default)]
    normalized_plate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl WireBBox {
    fn to_bbox(&self) -> BBox {
        BBox::new(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        )
    }
}

/// HTTP client for the remote inference service.
pub struct RemoteDetector {
    base_url: String,
    auth_token: Option<String>,
    batch_size: usize,
    extractor: FrameExtractor,
    http: reqwest::Client,
}

impl RemoteDetector {
    /// Construct the backend, verifying the service is alive first.
    ///
    /// The health probe runs under its own short deadline and construction
    /// fails hard when it does not pass — a worker must never enter its job
    /// loop against a dead dependency, and there is no fallback backend.
    pub async fn connect(config: &DetectorConfig) -> DetectorResult<Self> {
        let base_url = config
            .remote_url
            .as_deref()
            .ok_or_else(|| {
                DetectorError::config("REMOTE_INFERENCE_URL must be set for the remote backend")
            })?
            .trim_end_matches('/')
            .to_string();

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| DetectorError::config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            url = %base_url,
            auth_configured = config.remote_auth_token.is_some(),
            batch_size = config.batch_size,
            read_timeout_s = config.read_timeout.as_secs(),
            "Remote detector initializing"
        );

        verify_health(&base_url, config.health_timeout).await?;

        Ok(Self {
            base_url,
            auth_token: config.remote_auth_token.clone(),
            batch_size: config.batch_size.max(1),
            extractor: FrameExtractor::new(config.fps),
            http,
        })
    }

    /// Process a video: extract frames locally, then infer batch by batch.
    pub async fn process(&self, video: &Path, camera_id: &str) -> DetectorResult<DetectionRun> {
        let frames = self.extractor.extract(video).await?;
        if frames.is_empty() {
            warn!(video = %video.display(), "No frames extracted, nothing to infer");
            return Ok(DetectionRun::new(Vec::new(), frames));
        }
        self.process_frames(frames, camera_id).await
    }

    /// Infer over already-extracted frames.
    ///
    /// Split out from [`RemoteDetector::process`] so the batching and index
    /// mapping can be exercised without a video file.
    pub async fn process_frames(
        &self,
        frames: FrameSet,
        camera_id: &str,
    ) -> DetectorResult<DetectionRun> {
        let overall_start = Instant::now();
        let mut detections = Vec::new();
        let mut batch_count = 0usize;

        for (batch_index, batch) in frames.chunks(self.batch_size).enumerate() {
            // The global index of the batch's first frame anchors the whole
            // batch; response keys are offsets from it.
            let batch_offset = batch[0].index;

            let response = self.send_batch(batch, batch_index, camera_id).await?;

            let by_frame = response.detections_by_frame.ok_or_else(|| {
                error!(
                    batch_index,
                    "Response missing 'detections_by_frame' field"
                );
                DetectorError::InvalidResponse {
                    batch_index,
                    message: "response missing 'detections_by_frame' field".to_string(),
                }
            })?;

            let mut batch_detections = Vec::new();
            for (frame_key, frame_detections) in &by_frame {
                let local_index: usize =
                    frame_key.parse().map_err(|_| DetectorError::Protocol {
                        batch_index,
                        message: format!("non-integer frame key '{}'", frame_key),
                    })?;

                // A key at or past the batch size cannot belong to this
                // batch; dropping it silently would corrupt index mapping.
                if local_index >= batch.len() {
                    return Err(DetectorError::Protocol {
                        batch_index,
                        message: format!(
                            "frame key {} outside batch of {} frames",
                            local_index,
                            batch.len()
                        ),
                    });
                }

                let frame_no = batch_offset + local_index as u64;

                for wire in frame_detections {
                    let plate = wire.plate.clone().unwrap_or_default();
                    let normalized_plate = wire
                        .normalized_plate
                        .clone()
                        .unwrap_or_else(|| normalize_plate(&plate));

                    batch_detections.push(RawDetection {
                        plate,
                        normalized_plate,
                        confidence: wire.confidence,
                        bbox: wire.bbox.to_bbox(),
                        frame_no,
                        captured_at: Utc::now(),
                        crop: None,
                    });
                }
            }

            // The wire mapping is unordered; restore frame order per batch so
            // downstream yield order is non-decreasing in global index.
            batch_detections.sort_by_key(|d| d.frame_no);
            detections.extend(batch_detections);
            batch_count += 1;
        }

        info!(
            total_detections = detections.len(),
            total_frames = frames.len(),
            total_batches = batch_count,
            elapsed_ms = overall_start.elapsed().as_millis() as u64,
            "Remote inference complete"
        );

        Ok(DetectionRun::new(detections, frames))
    }

    /// Send one batch of frames as a multipart request.
    async fn send_batch(
        &self,
        batch: &[Frame],
        batch_index: usize,
        camera_id: &str,
    ) -> DetectorResult<InferResponse> {
        let endpoint = format!("{}/infer/frames", self.base_url);
        let started = Instant::now();

        let mut form = Form::new().text("camera_id", camera_id.to_string());
        for frame in batch {
            let jpeg = encode_jpeg(&frame.image, FRAME_JPEG_QUALITY)?;
            let part = Part::bytes(jpeg)
                .file_name(format!("frame_{:06}.jpg", frame.index))
                .mime_str("image/jpeg")
                .map_err(|e| DetectorError::BatchNetwork {
                    batch_index,
                    message: e.to_string(),
                })?;
            form = form.part("files", part);
        }

        let mut request = self.http.post(&endpoint).multipart(form);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                return Err(if e.is_timeout() {
                    error!(batch_index, elapsed_ms, "Batch inference timed out");
                    DetectorError::BatchTimeout {
                        batch_index,
                        elapsed_ms,
                    }
                } else {
                    error!(batch_index, error = %e, "Batch request failed");
                    DetectorError::BatchNetwork {
                        batch_index,
                        message: e.to_string(),
                    }
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            error!(
                batch_index,
                status = status.as_u16(),
                body = %body,
                "Batch inference returned an error status"
            );
            return Err(DetectorError::BatchHttp {
                batch_index,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InferResponse =
            response
                .json()
                .await
                .map_err(|e| DetectorError::InvalidResponse {
                    batch_index,
                    message: format!("failed to parse response body: {}", e),
                })?;

        info!(
            batch_index,
            batch_frames = batch.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch inference done"
        );

        Ok(parsed)
    }
}

/// Probe `GET /health` under a hard deadline.
async fn verify_health(base_url: &str, timeout: Duration) -> DetectorResult<()> {
    let health_url = format!("{}/health", base_url);

    let probe = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DetectorError::config(format!("failed to build health client: {}", e)))?;

    let started = Instant::now();
    match probe.get(&health_url).send().await {
        Ok(response) if response.status().is_success() => {
            info!(
                url = %health_url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Remote health check passed"
            );
            Ok(())
        }
        Ok(response) => {
            let status = response.status().as_u16();
            error!(url = %health_url, status, "Remote health check failed");
            Err(DetectorError::HealthStatus {
                url: health_url,
                status,
            })
        }
        Err(e) if e.is_timeout() => {
            error!(
                url = %health_url,
                timeout_secs = timeout.as_secs(),
                "Remote health check timed out"
            );
            Err(DetectorError::HealthTimeout {
                url: health_url,
                timeout_secs: timeout.as_secs(),
            })
        }
        Err(e) => {
            error!(url = %health_url, error = %e, "Remote health check unreachable");
            Err(DetectorError::HealthUnreachable {
                url: health_url,
                message: e.to_string(),
            })
        }
    }
}
