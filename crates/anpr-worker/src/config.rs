//! Worker configuration.

use crate::validator::ValidationLimits;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for downloaded videos
    pub work_dir: String,
    /// How long one dequeue call blocks waiting for a job, in milliseconds
    pub poll_block_ms: u64,
    /// Back-off after a queue error, in seconds
    pub error_backoff_secs: u64,
    /// Minimum crop width for a storable plate, in pixels
    pub min_crop_width: u32,
    /// Minimum crop height for a storable plate, in pixels
    pub min_crop_height: u32,
    /// Crops with a pixel value range below this are decode failures
    pub min_pixel_range: u8,
    /// Forensic samples captured per job (first N rejections)
    pub forensic_sample_limit: usize,
    /// JPEG quality for stored crops
    pub crop_jpeg_quality: u8,
    /// Listen address for the Prometheus exporter, when set
    pub metrics_addr: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/anpr".to_string(),
            poll_block_ms: 5000,
            error_backoff_secs: 5,
            min_crop_width: 20,
            min_crop_height: 10,
            min_pixel_range: 1,
            forensic_sample_limit: 3,
            crop_jpeg_quality: 90,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/anpr".to_string()),
            poll_block_ms: std::env::var("WORKER_POLL_BLOCK_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            error_backoff_secs: std::env::var("WORKER_ERROR_BACKOFF_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            min_crop_width: std::env::var("MIN_CROP_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            min_crop_height: std::env::var("MIN_CROP_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_pixel_range: std::env::var("MIN_PIXEL_RANGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            forensic_sample_limit: std::env::var("FORENSIC_SAMPLE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            crop_jpeg_quality: std::env::var("CROP_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(90),
            metrics_addr: std::env::var("METRICS_ADDR").ok(),
        }
    }

    /// Validator limits derived from this config.
    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            min_width: self.min_crop_width,
            min_height: self.min_crop_height,
            min_pixel_range: self.min_pixel_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.min_crop_width, 20);
        assert_eq!(config.min_crop_height, 10);
        assert_eq!(config.forensic_sample_limit, 3);
    }
}
