//! S3-compatible object storage client.
//!
//! This crate provides:
//! - Source video download to a local file
//! - Crop JPEG upload under generated, collision-free keys

pub mod client;
pub mod error;

pub use client::{ObjectStorage, StorageConfig};
pub use error::{StorageError, StorageResult};
