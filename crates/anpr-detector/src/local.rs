//! Local model backend: in-process detection + recognition per frame.
//!
//! The actual models are opaque capabilities behind two narrow traits:
//! [`PlateFinder`] locates plate boxes in a frame, [`PlateReader`] reads the
//! text off a crop. Confidence always comes from the detection stage, never
//! from recognition; a crop the reader cannot decipher yields the UNREAD
//! sentinel instead of failing the frame.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use image::RgbImage;
use tracing::{debug, info, warn};

use anpr_media::{crop_frame, FrameExtractor};
use anpr_models::{normalize_plate, BBox, UNREAD_PLATE};

use crate::detection::{DetectionRun, RawDetection};
use crate::error::DetectorResult;

/// A plate box located by the finder, before recognition.
#[derive(Debug, Clone)]
pub struct PlateCandidate {
    pub bbox: BBox,
    pub confidence: f64,
}

/// Locates plate bounding boxes in a frame.
pub trait PlateFinder: Send + Sync {
    fn find_plates(&self, image: &RgbImage) -> DetectorResult<Vec<PlateCandidate>>;
}

/// Reads plate text off a crop. `None` means unreadable, not an error.
pub trait PlateReader: Send + Sync {
    fn read_plate(&self, crop: &RgbImage) -> DetectorResult<Option<String>>;
}

/// Runs frame extraction plus find/read per frame, in process.
pub struct LocalModelDetector {
    extractor: FrameExtractor,
    finder: Arc<dyn PlateFinder>,
    reader: Arc<dyn PlateReader>,
}

impl LocalModelDetector {
    pub fn new(fps: u32, finder: Arc<dyn PlateFinder>, reader: Arc<dyn PlateReader>) -> Self {
        Self {
            extractor: FrameExtractor::new(fps),
            finder,
            reader,
        }
    }

    /// Process a video: extract frames, find plates, read each crop.
    pub async fn process(&self, video: &Path) -> DetectorResult<DetectionRun> {
        let frames = self.extractor.extract(video).await?;
        if frames.is_empty() {
            warn!(video = %video.display(), "No frames extracted");
            return Ok(DetectionRun::new(Vec::new(), frames));
        }

        let mut detections = Vec::new();
        let mut unread = 0usize;

        for frame in frames.iter() {
            let candidates = self.finder.find_plates(&frame.image)?;
            if candidates.is_empty() {
                continue;
            }
            debug!(
                frame_no = frame.index,
                candidates = candidates.len(),
                "Frame candidates"
            );

            for candidate in candidates {
                // A box entirely outside the frame cannot produce a crop;
                // yield it anyway and let the validator classify it.
                let crop = match crop_frame(frame, &candidate.bbox) {
                    Ok(crop) => Some(crop),
                    Err(e) => {
                        debug!(frame_no = frame.index, error = %e, "Crop derivation failed");
                        None
                    }
                };

                let plate = match &crop {
                    Some(crop) => match self.reader.read_plate(crop)? {
                        Some(text) if !text.trim().is_empty() => text.trim().to_uppercase(),
                        _ => {
                            unread += 1;
                            UNREAD_PLATE.to_string()
                        }
                    },
                    None => {
                        unread += 1;
                        UNREAD_PLATE.to_string()
                    }
                };

                detections.push(RawDetection {
                    normalized_plate: normalize_plate(&plate),
                    plate,
                    confidence: candidate.confidence,
                    bbox: candidate.bbox,
                    frame_no: frame.index,
                    captured_at: Utc::now(),
                    crop,
                });
            }
        }

        info!(
            video = %video.display(),
            frames = frames.len(),
            detections = detections.len(),
            unread,
            "Local detection complete"
        );

        Ok(DetectionRun::new(detections, frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFinder(Vec<PlateCandidate>);

    impl PlateFinder for FixedFinder {
        fn find_plates(&self, _image: &RgbImage) -> DetectorResult<Vec<PlateCandidate>> {
            Ok(self.0.clone())
        }
    }

    struct FixedReader(Option<String>);

    impl PlateReader for FixedReader {
        fn read_plate(&self, _crop: &RgbImage) -> DetectorResult<Option<String>> {
            Ok(self.0.clone())
        }
    }

    // The extraction path needs ffmpeg; trait behavior is covered through
    // direct calls instead.

    #[test]
    fn test_unreadable_crop_yields_sentinel() {
        let reader = FixedReader(None);
        let crop = RgbImage::new(32, 16);
        assert_eq!(reader.read_plate(&crop).unwrap(), None);
        // The detector maps None to UNREAD; normalization keeps it intact.
        assert_eq!(normalize_plate(UNREAD_PLATE), UNREAD_PLATE);
    }

    #[test]
    fn test_finder_candidates_pass_through() {
        let finder = FixedFinder(vec![PlateCandidate {
            bbox: BBox::new(10, 10, 90, 40),
            confidence: 0.8,
        }]);
        let image = RgbImage::new(640, 360);
        let found = finder.find_plates(&image).unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].confidence - 0.8).abs() < f64::EPSILON);
    }
}
