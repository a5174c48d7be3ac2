//! Skip reasons, per-job skip counters and forensic samples.
//!
//! A candidate detection that is not persisted as an event is "skipped" for
//! exactly one categorical reason. Reasons are counted per job, and the first
//! few rejections are captured verbatim for operator diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bbox::BBox;

/// The categorical cause a candidate detection was not persisted.
///
/// Reasons are mutually exclusive; the validator checks them in this order
/// and stops at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The crop is not a well-formed raster buffer.
    InvalidType,
    /// The crop has zero or negative dimensions after clamping to the frame.
    InvalidDims,
    /// The crop is smaller than the configured minimum plate size.
    TooSmall,
    /// The crop pixel range is below the near-zero variance threshold,
    /// indicating a decode failure rather than a real plate.
    SolidColor,
    /// The crop could not be durably stored.
    WriteFailed,
    /// No extracted frame exists at the detection's claimed frame index.
    FrameMissing,
}

impl SkipReason {
    /// Stable string form used in counters, logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InvalidType => "invalid_type",
            SkipReason::InvalidDims => "invalid_dims",
            SkipReason::TooSmall => "too_small",
            SkipReason::SolidColor => "solid_color",
            SkipReason::WriteFailed => "write_failed",
            SkipReason::FrameMissing => "frame_missing",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason-specific context captured with a forensic sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipDetail {
    /// No extra context beyond the reason itself.
    None,
    /// Requested box dimensions for a degenerate crop.
    Dims { bbox_width: i32, bbox_height: i32 },
    /// Requested vs actual dimensions. The bbox and crop dimensions are both
    /// recorded so a mismatch (an upstream bbox scaling bug) is visible next
    /// to a genuinely small plate.
    TooSmall {
        bbox_width: i32,
        bbox_height: i32,
        crop_width: u32,
        crop_height: u32,
    },
    /// Observed pixel value range of a near-uniform crop.
    SolidColor { min: u8, max: u8 },
    /// The storage error that prevented the crop upload.
    WriteFailed { error: String },
}

/// One rejected detection captured verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicSample {
    pub frame_no: u64,
    pub bbox: BBox,
    pub reason: SkipReason,
    pub plate: String,
    pub detail: SkipDetail,
}

/// Per-job skip counters, keyed by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipSummary {
    #[serde(flatten)]
    counts: BTreeMap<SkipReason, u32>,
}

impl SkipSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for a reason.
    pub fn record(&mut self, reason: SkipReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// Count for a single reason.
    pub fn count(&self, reason: SkipReason) -> u32 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    /// Total skipped detections across all reasons.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// True when nothing was skipped.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over (reason, count) pairs in reason order.
    pub fn iter(&self) -> impl Iterator<Item = (SkipReason, u32)> + '_ {
        self.counts.iter().map(|(r, c)| (*r, *c))
    }
}
