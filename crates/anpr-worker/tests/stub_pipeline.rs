//! Pipeline regression tests that run without any external service.

use chrono::Utc;
use image::{Rgb, RgbImage};

use anpr_detector::{RawDetection, StubDetector};
use anpr_media::{Frame, FrameSet};
use anpr_models::{normalize_plate, BBox, ForensicSample, JobCounters, SkipReason};
use anpr_worker::{validate, Validation, ValidationLimits};

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn detection(frame_no: u64, bbox: BBox, crop: Option<RgbImage>) -> RawDetection {
    RawDetection {
        plate: "ABC123".to_string(),
        normalized_plate: normalize_plate("ABC123"),
        confidence: 0.9,
        bbox,
        frame_no,
        captured_at: Utc::now(),
        crop,
    }
}

#[test]
fn seeded_stub_runs_are_reproducible_end_to_end() {
    let limits = ValidationLimits::default();

    let first = StubDetector::new(Some(1234), 1).process().unwrap();
    let second = StubDetector::new(Some(1234), 1).process().unwrap();
    assert_eq!(first.detections.len(), second.detections.len());

    // Every stub detection carries a valid crop, so the validator accepts
    // the same deterministic count on both runs.
    let accepted = |run: &anpr_detector::DetectionRun| {
        run.detections
            .iter()
            .filter(|d| validate(d, &run.frames, &limits).is_accept())
            .count()
    };
    assert_eq!(accepted(&first), first.detections.len());
    assert_eq!(accepted(&first), accepted(&second));
}

#[test]
fn job_counters_match_the_validation_outcomes() {
    // 18 raw detections: 10 good, 5 below minimum size, 3 solid-color.
    let frames = FrameSet::new(
        1,
        (0..20)
            .map(|i| Frame::new(i as u64, gradient_image(640, 360)))
            .collect(),
    );

    let mut detections = Vec::new();
    for i in 0..10u64 {
        detections.push(detection(i, BBox::new(100, 50, 220, 110), None));
    }
    for i in 10..15u64 {
        detections.push(detection(i, BBox::new(100, 100, 102, 101), None));
    }
    for i in 15..18u64 {
        detections.push(detection(
            i,
            BBox::new(0, 0, 60, 24),
            Some(RgbImage::from_pixel(60, 24, Rgb([9, 9, 9]))),
        ));
    }

    let limits = ValidationLimits::default();
    let forensic_limit = 3;
    let mut counters = JobCounters::new();
    let mut samples: Vec<ForensicSample> = Vec::new();

    for det in &detections {
        counters.record_detection();
        match validate(det, &frames, &limits) {
            Validation::Accept(_) => counters.record_event(),
            Validation::Reject { reason, detail } => {
                counters.skipped.record(reason);
                if samples.len() < forensic_limit {
                    samples.push(ForensicSample {
                        frame_no: det.frame_no,
                        bbox: det.bbox,
                        reason,
                        plate: det.plate.clone(),
                        detail,
                    });
                }
            }
        }
    }

    assert_eq!(counters.detections_total, 18);
    assert_eq!(counters.events_created, 10);
    assert_eq!(counters.skipped.count(SkipReason::TooSmall), 5);
    assert_eq!(counters.skipped.count(SkipReason::SolidColor), 3);
    assert_eq!(counters.skipped.total(), 8);

    // Only the first N rejections are sampled.
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.reason == SkipReason::TooSmall));

    let json = counters.skipped_json();
    assert_eq!(json["too_small"], 5);
    assert_eq!(json["solid_color"], 3);
}

#[test]
fn accepted_detections_keep_frame_order() {
    let run = StubDetector::new(Some(99), 1).process().unwrap();
    let limits = ValidationLimits::default();

    let mut last_frame = 0u64;
    for det in &run.detections {
        assert!(det.frame_no >= last_frame, "yield order regressed");
        last_frame = det.frame_no;
        assert!(validate(det, &run.frames, &limits).is_accept());
    }
}
