//! FFmpeg CLI wrapper for the detection pipeline.
//!
//! This crate provides:
//! - Frame extraction at a configured fps, preserving global frame indices
//! - Crop derivation from a frame and a bounding box, with clamping
//! - JPEG encoding and raster statistics for crop validation

pub mod crop;
pub mod error;
pub mod extract;
pub mod frame;

pub use crop::{crop_frame, encode_jpeg, pixel_range};
pub use error::{MediaError, MediaResult};
pub use extract::FrameExtractor;
pub use frame::{Frame, FrameSet};
