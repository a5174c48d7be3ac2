//! Crop validation.
//!
//! Pure decision logic: given a raw detection and the extracted frames,
//! either accept the derived crop or reject with exactly one reason. The
//! reasons are checked in a fixed priority order and are mutually exclusive;
//! `write_failed` is the one reason applied later, by the processor, when
//! the accepted crop cannot be stored.

use image::RgbImage;

use anpr_detector::RawDetection;
use anpr_media::{crop_frame, pixel_range, FrameSet, MediaError};
use anpr_models::{SkipDetail, SkipReason};

/// Size and variance thresholds for a storable crop.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    /// Minimum crop width in pixels
    pub min_width: u32,
    /// Minimum crop height in pixels
    pub min_height: u32,
    /// Minimum pixel value range; anything below is a decode failure
    pub min_pixel_range: u8,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_width: 20,
            min_height: 10,
            min_pixel_range: 1,
        }
    }
}

/// Outcome of validating one detection.
#[derive(Debug)]
pub enum Validation {
    /// The crop is storable; proceed to upload and event creation.
    Accept(RgbImage),
    /// The detection is skipped for exactly one reason.
    Reject {
        reason: SkipReason,
        detail: SkipDetail,
    },
}

impl Validation {
    fn reject(reason: SkipReason, detail: SkipDetail) -> Self {
        Validation::Reject { reason, detail }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Validation::Accept(_))
    }
}

/// Validate one detection against the extracted frames.
///
/// The crop is the one the backend produced, or else is derived here from
/// the frame at the detection's global index. A detection that references no
/// frame and carries no crop cannot be checked at all and is rejected as
/// `frame_missing`.
pub fn validate(
    detection: &RawDetection,
    frames: &FrameSet,
    limits: &ValidationLimits,
) -> Validation {
    let crop = match &detection.crop {
        Some(crop) => crop.clone(),
        None => {
            let frame = match frames.get(detection.frame_no) {
                Some(frame) => frame,
                None => {
                    return Validation::reject(SkipReason::FrameMissing, SkipDetail::None);
                }
            };
            match crop_frame(frame, &detection.bbox) {
                Ok(crop) => crop,
                Err(MediaError::CropOutOfBounds { .. }) => {
                    return Validation::reject(
                        SkipReason::InvalidDims,
                        SkipDetail::Dims {
                            bbox_width: detection.bbox.width(),
                            bbox_height: detection.bbox.height(),
                        },
                    );
                }
                Err(_) => {
                    return Validation::reject(SkipReason::InvalidType, SkipDetail::None);
                }
            }
        }
    };

    let (width, height) = crop.dimensions();

    // 1. Malformed raster buffer.
    if crop.as_raw().len() != (width as usize) * (height as usize) * 3 {
        return Validation::reject(SkipReason::InvalidType, SkipDetail::None);
    }

    // 2. Degenerate dimensions after clamping.
    if width == 0 || height == 0 {
        return Validation::reject(
            SkipReason::InvalidDims,
            SkipDetail::Dims {
                bbox_width: detection.bbox.width(),
                bbox_height: detection.bbox.height(),
            },
        );
    }

    // 3. Below the minimum plate size. Both the requested box and the actual
    // crop dimensions go into the sample: a mismatch between them points at
    // an upstream bbox scaling bug, not a small plate.
    if width < limits.min_width || height < limits.min_height {
        return Validation::reject(
            SkipReason::TooSmall,
            SkipDetail::TooSmall {
                bbox_width: detection.bbox.width(),
                bbox_height: detection.bbox.height(),
                crop_width: width,
                crop_height: height,
            },
        );
    }

    // 4. Near-zero variance signals a decode failure, not a real plate.
    match pixel_range(&crop) {
        None => return Validation::reject(SkipReason::InvalidType, SkipDetail::None),
        Some((min, max)) => {
            if max - min < limits.min_pixel_range {
                return Validation::reject(
                    SkipReason::SolidColor,
                    SkipDetail::SolidColor { min, max },
                );
            }
        }
    }

    Validation::Accept(crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::Rgb;

    use anpr_media::Frame;
    use anpr_models::{normalize_plate, BBox};

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn frames(count: usize) -> FrameSet {
        let frames = (0..count)
            .map(|i| Frame::new(i as u64, gradient_image(640, 360)))
            .collect();
        FrameSet::new(1, frames)
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

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    fn rejection(v: Validation) -> (SkipReason, SkipDetail) {
        match v {
            Validation::Reject { reason, detail } => (reason, detail),
            Validation::Accept(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_accepts_a_good_crop() {
        let det = detection(2, BBox::new(100, 50, 220, 110), None);
        let result = validate(&det, &frames(5), &limits());
        match result {
            Validation::Accept(crop) => assert_eq!(crop.dimensions(), (120, 60)),
            Validation::Reject { reason, .. } => panic!("unexpected rejection: {}", reason),
        }
    }

    #[test]
    fn test_backend_supplied_crop_is_used() {
        let crop = gradient_image(100, 40);
        // There is no frame at index 7, but the crop came with the
        // detection, so validation never needs the frame.
        let det = detection(7, BBox::new(0, 0, 100, 40), Some(crop));
        assert!(validate(&det, &frames(1), &limits()).is_accept());
    }

    #[test]
    fn test_frame_missing() {
        let det = detection(99, BBox::new(100, 50, 220, 110), None);
        let (reason, detail) = rejection(validate(&det, &frames(5), &limits()));
        assert_eq!(reason, SkipReason::FrameMissing);
        assert_eq!(detail, SkipDetail::None);
    }

    #[test]
    fn test_bbox_outside_frame_is_invalid_dims() {
        let det = detection(0, BBox::new(700, 400, 800, 500), None);
        let (reason, detail) = rejection(validate(&det, &frames(1), &limits()));
        assert_eq!(reason, SkipReason::InvalidDims);
        assert!(matches!(detail, SkipDetail::Dims { bbox_width: 100, bbox_height: 100 }));
    }

    #[test]
    fn test_zero_size_crop_is_invalid_dims() {
        let det = detection(0, BBox::new(10, 10, 12, 11), Some(RgbImage::new(0, 0)));
        let (reason, _) = rejection(validate(&det, &frames(1), &limits()));
        assert_eq!(reason, SkipReason::InvalidDims);
    }

    #[test]
    fn test_too_small_captures_both_dimension_pairs() {
        // 2x1 box, far below the 20x10 minimum.
        let det = detection(0, BBox::new(100, 100, 102, 101), None);
        let (reason, detail) = rejection(validate(&det, &frames(1), &limits()));
        assert_eq!(reason, SkipReason::TooSmall);
        match detail {
            SkipDetail::TooSmall {
                bbox_width,
                bbox_height,
                crop_width,
                crop_height,
            } => {
                assert_eq!((bbox_width, bbox_height), (2, 1));
                assert_eq!((crop_width, crop_height), (2, 1));
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_solid_color_crop_is_rejected() {
        let crop = RgbImage::from_pixel(60, 24, Rgb([0, 0, 0]));
        let det = detection(0, BBox::new(0, 0, 60, 24), Some(crop));
        let (reason, detail) = rejection(validate(&det, &frames(1), &limits()));
        assert_eq!(reason, SkipReason::SolidColor);
        assert_eq!(detail, SkipDetail::SolidColor { min: 0, max: 0 });
    }

    #[test]
    fn test_small_beats_solid() {
        // A solid crop below the size minimum rejects as too_small: checks
        // run in priority order and stop at the first failure.
        let crop = RgbImage::from_pixel(4, 4, Rgb([17, 17, 17]));
        let det = detection(0, BBox::new(0, 0, 4, 4), Some(crop));
        let (reason, _) = rejection(validate(&det, &frames(1), &limits()));
        assert_eq!(reason, SkipReason::TooSmall);
    }

    #[test]
    fn test_exactly_one_outcome() {
        // A spread of detections: every one is either accepted or rejected
        // with exactly one reason, never both, never neither.
        let cases = vec![
            detection(0, BBox::new(100, 50, 220, 110), None),
            detection(99, BBox::new(100, 50, 220, 110), None),
            detection(0, BBox::new(100, 100, 102, 101), None),
            detection(0, BBox::new(0, 0, 60, 24), Some(RgbImage::from_pixel(60, 24, Rgb([5, 5, 5])))),
        ];
        let frame_set = frames(3);
        for det in &cases {
            match validate(det, &frame_set, &limits()) {
                Validation::Accept(_) => {}
                Validation::Reject { .. } => {}
            }
        }
    }

    #[test]
    fn test_min_size_boundary_is_inclusive() {
        // Exactly 20x10 passes.
        let det = detection(0, BBox::new(0, 0, 20, 10), None);
        assert!(validate(&det, &frames(1), &limits()).is_accept());
    }
}
