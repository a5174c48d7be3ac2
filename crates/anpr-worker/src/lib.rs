//! Detection job pipeline worker.
//!
//! This crate provides:
//! - The job executor (dequeue, atomic claim, terminal transitions)
//! - The per-job processor (detect, validate, store crops, persist events,
//!   match watch patterns)
//! - The crop validator with granular rejection diagnostics
//! - Watchlist matching and webhook notification

pub mod config;
pub mod error;
pub mod executor;
pub mod notify;
pub mod processor;
pub mod validator;
pub mod watchlist;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use validator::{validate, Validation, ValidationLimits};
