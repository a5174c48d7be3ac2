//! Ephemeral detection records.

use chrono::{DateTime, Utc};
use image::RgbImage;

use anpr_media::FrameSet;
use anpr_models::BBox;

/// One raw plate candidate produced by a backend.
///
/// In-memory only: a raw detection either becomes an [`anpr_models::Event`]
/// after validation or is counted as a skip, never persisted as-is.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Plate text as read (possibly the UNREAD sentinel).
    pub plate: String,
    /// Uppercase alphanumeric form.
    pub normalized_plate: String,
    /// Detection-stage confidence in [0, 1].
    pub confidence: f64,
    /// Bounding box in source-frame pixel coordinates.
    pub bbox: BBox,
    /// Global frame index. Always global: a backend that batches frames maps
    /// batch-local keys back through the batch offset before yielding.
    pub frame_no: u64,
    pub captured_at: DateTime<Utc>,
    /// Pre-computed crop, when the backend produced one (local, stub).
    /// Remote detections carry `None`; the crop is derived from `frames`.
    pub crop: Option<RgbImage>,
}

/// Everything one backend run yields for a video: the detections in yield
/// order plus the extracted frames the crops are derived from.
#[derive(Debug)]
pub struct DetectionRun {
    pub detections: Vec<RawDetection>,
    pub frames: FrameSet,
}

impl DetectionRun {
    pub fn new(detections: Vec<RawDetection>, frames: FrameSet) -> Self {
        Self { detections, frames }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
