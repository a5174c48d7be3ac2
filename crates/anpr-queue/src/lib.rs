//! Redis Streams job queue.
//!
//! This crate provides:
//! - Job enqueueing with idempotency dedup
//! - Consumer-group dequeue with bounded blocking
//! - Ack and a dead-letter stream for operator inspection

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::ProcessUploadJob;
pub use queue::{JobQueue, QueueConfig};
