//! Pluggable plate detection backends.
//!
//! This crate provides:
//! - The [`DetectorBackend`] closed set of variants (stub, local, remote),
//!   selected once at startup from configuration
//! - The ephemeral [`RawDetection`] record flowing out of a backend
//! - The remote inference HTTP client with health probe, fixed-size frame
//!   batching and split connect/read timeouts
//! - The local ONNX find/read adapters behind narrow traits
//!
//! Backend construction is loud: an unreachable remote service or a missing
//! model file fails construction outright, there is no fallback to another
//! variant.

pub mod backend;
pub mod config;
pub mod detection;
pub mod error;
pub mod local;
pub mod onnx;
pub mod remote;
pub mod stub;

pub use backend::DetectorBackend;
pub use config::{BackendKind, DetectorConfig};
pub use detection::{DetectionRun, RawDetection};
pub use error::{DetectorError, DetectorResult};
pub use local::{LocalModelDetector, PlateCandidate, PlateFinder, PlateReader};
pub use remote::RemoteDetector;
pub use stub::StubDetector;
