//! Stub backend: bounded pseudo-random detections without touching the video.
//!
//! Used for development and pipeline regression tests. The stub honors the
//! full backend contract — synthetic frames, derived crops, global frame
//! indices — so downstream code cannot tell it from a real backend. With a
//! fixed seed the run is fully deterministic.

use chrono::Utc;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use anpr_media::{crop_frame, Frame, FrameSet};
use anpr_models::{normalize_plate, BBox};

use crate::detection::{DetectionRun, RawDetection};
use crate::error::DetectorResult;

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 360;

const STUB_PLATES: &[&str] = &["ABC123", "XYZ789", "LMN456", "TEST99", "DEMO01"];

/// Generates a small, bounded number of plausible detections.
#[derive(Debug, Clone)]
pub struct StubDetector {
    seed: Option<u64>,
    fps: u32,
}

impl StubDetector {
    pub fn new(seed: Option<u64>, fps: u32) -> Self {
        Self { seed, fps }
    }

    /// Produce a synthetic detection run. The video file is never opened.
    pub fn process(&self) -> DetectorResult<DetectionRun> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let frame_count = rng.random_range(8..=16usize);
        let frames: Vec<Frame> = (0..frame_count)
            .map(|i| Frame::new(i as u64, synthetic_frame(i as u64)))
            .collect();
        let frames = FrameSet::new(self.fps, frames);

        let detection_count = rng.random_range(2..=5usize).min(frame_count);
        let mut detection_frames: Vec<u64> = Vec::with_capacity(detection_count);
        while detection_frames.len() < detection_count {
            let candidate = rng.random_range(0..frame_count as u64);
            if !detection_frames.contains(&candidate) {
                detection_frames.push(candidate);
            }
        }
        detection_frames.sort_unstable();

        let mut detections = Vec::with_capacity(detection_count);
        for frame_no in detection_frames {
            let plate = STUB_PLATES[rng.random_range(0..STUB_PLATES.len())];
            let confidence = rng.random_range(0.75..0.95f64);

            let x1 = rng.random_range((FRAME_WIDTH / 4) as i32..(FRAME_WIDTH / 2) as i32);
            let y1 = rng.random_range((FRAME_HEIGHT / 4) as i32..(FRAME_HEIGHT / 2) as i32);
            let width = rng.random_range(80..=120);
            let height = rng.random_range(30..=50);
            let bbox = BBox::new(
                x1,
                y1,
                (x1 + width).min(FRAME_WIDTH as i32 - 1),
                (y1 + height).min(FRAME_HEIGHT as i32 - 1),
            );

            let frame = frames.get(frame_no).expect("detection frame exists");
            let crop = crop_frame(frame, &bbox)?;

            detections.push(RawDetection {
                plate: plate.to_string(),
                normalized_plate: normalize_plate(plate),
                confidence,
                bbox,
                frame_no,
                captured_at: Utc::now(),
                crop: Some(crop),
            });
        }

        info!(
            frames = frame_count,
            detections = detections.len(),
            seeded = self.seed.is_some(),
            "Stub detection complete"
        );

        Ok(DetectionRun::new(detections, frames))
    }
}

/// A gradient test card; never uniform, so stub crops pass variance checks.
fn synthetic_frame(index: u64) -> RgbImage {
    RgbImage::from_fn(FRAME_WIDTH, FRAME_HEIGHT, |x, y| {
        Rgb([
            (x % 256) as u8,
            ((y * 2) % 256) as u8,
            ((x + y + index as u32 * 17) % 256) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let a = StubDetector::new(Some(42), 1).process().unwrap();
        let b = StubDetector::new(Some(42), 1).process().unwrap();

        assert_eq!(a.detections.len(), b.detections.len());
        for (x, y) in a.detections.iter().zip(b.detections.iter()) {
            assert_eq!(x.plate, y.plate);
            assert_eq!(x.frame_no, y.frame_no);
            assert_eq!(x.bbox, y.bbox);
            assert!((x.confidence - y.confidence).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_detection_count_is_bounded() {
        for seed in 0..20 {
            let run = StubDetector::new(Some(seed), 1).process().unwrap();
            assert!((2..=5).contains(&run.detections.len()));
        }
    }

    #[test]
    fn test_detections_reference_existing_frames_and_carry_crops() {
        let run = StubDetector::new(Some(7), 1).process().unwrap();
        for det in &run.detections {
            let frame = run.frames.get(det.frame_no).expect("frame exists");
            assert_eq!(frame.index, det.frame_no);

            let crop = det.crop.as_ref().expect("stub produces crops");
            assert_eq!(crop.width() as i32, det.bbox.width());
            assert_eq!(crop.height() as i32, det.bbox.height());
        }
    }

    #[test]
    fn test_frame_indices_are_sorted() {
        let run = StubDetector::new(Some(3), 1).process().unwrap();
        let indices: Vec<u64> = run.detections.iter().map(|d| d.frame_no).collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
    }

    #[test]
    fn test_confidence_in_range() {
        let run = StubDetector::new(Some(11), 1).process().unwrap();
        for det in &run.detections {
            assert!(det.confidence >= 0.75 && det.confidence < 0.95);
        }
    }
}
