//! Shared data models for the ANPR backend.
//!
//! This crate provides the durable types written to and read from the
//! relational store, plus the pure plate/pattern logic shared by the
//! pipeline:
//! - Upload jobs and their lifecycle status
//! - Events (accepted detections) and review state
//! - Watch patterns and watch matches
//! - Skip reasons, per-job counters and forensic samples
//! - Plate normalization and wildcard pattern matching

pub mod bbox;
pub mod event;
pub mod job;
pub mod plate;
pub mod skip;
pub mod watch;

// Re-export common types
pub use bbox::BBox;
pub use event::{Event, NewEvent, ReviewState};
pub use job::{JobCounters, UploadJob, UploadStatus};
pub use plate::{normalize_plate, UNREAD_PLATE};
pub use skip::{ForensicSample, SkipDetail, SkipReason, SkipSummary};
pub use watch::{pattern_matches, WatchMatch, WatchPattern};
