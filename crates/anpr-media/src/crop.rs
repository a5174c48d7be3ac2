//! Crop derivation and raster helpers.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbImage};

use anpr_models::BBox;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Derive a crop from a frame per a detection's bounding box.
///
/// The box is clamped to the frame bounds first; a box that lies entirely
/// outside the frame is an error. The crop is taken without padding so its
/// dimensions equal the clamped box dimensions.
pub fn crop_frame(frame: &Frame, bbox: &BBox) -> MediaResult<RgbImage> {
    let (frame_width, frame_height) = frame.image.dimensions();

    let clamped = bbox
        .clamp(frame_width, frame_height)
        .ok_or(MediaError::CropOutOfBounds {
            bbox: *bbox,
            frame_width,
            frame_height,
        })?;

    let crop = imageops::crop_imm(
        &frame.image,
        clamped.x1 as u32,
        clamped.y1 as u32,
        clamped.width() as u32,
        clamped.height() as u32,
    );

    Ok(crop.to_image())
}

/// Encode a crop as JPEG bytes.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> MediaResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(image)
        .map_err(|e| MediaError::invalid_image(format!("JPEG encode failed: {}", e)))?;
    Ok(bytes)
}

/// Minimum and maximum pixel value across all channels.
///
/// Returns `None` for an empty buffer. A near-zero range signals a decode
/// failure (e.g. a uniformly black frame) rather than a real plate.
pub fn pixel_range(image: &RgbImage) -> Option<(u8, u8)> {
    let raw = image.as_raw();
    if raw.is_empty() {
        return None;
    }
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for &value in raw {
        min = min.min(value);
        max = max.max(value);
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        Frame::new(0, image)
    }

    #[test]
    fn test_crop_matches_bbox_dimensions() {
        let frame = gradient_frame(640, 360);
        let bbox = BBox::new(100, 50, 220, 110);
        let crop = crop_frame(&frame, &bbox).unwrap();
        assert_eq!(crop.dimensions(), (120, 60));
    }

    #[test]
    fn test_crop_clamps_overhanging_bbox() {
        let frame = gradient_frame(640, 360);
        let bbox = BBox::new(600, 340, 700, 420);
        let crop = crop_frame(&frame, &bbox).unwrap();
        assert_eq!(crop.dimensions(), (40, 20));
    }

    #[test]
    fn test_crop_outside_frame_is_error() {
        let frame = gradient_frame(640, 360);
        let bbox = BBox::new(700, 10, 800, 60);
        let err = crop_frame(&frame, &bbox).unwrap_err();
        assert!(matches!(err, MediaError::CropOutOfBounds { .. }));
    }

    #[test]
    fn test_crop_preserves_pixels() {
        let frame = gradient_frame(640, 360);
        let bbox = BBox::new(10, 20, 30, 40);
        let crop = crop_frame(&frame, &bbox).unwrap();
        assert_eq!(crop.get_pixel(0, 0), frame.image.get_pixel(10, 20));
        assert_eq!(crop.get_pixel(19, 19), frame.image.get_pixel(29, 39));
    }

    #[test]
    fn test_encode_jpeg_produces_bytes() {
        let frame = gradient_frame(64, 32);
        let bytes = encode_jpeg(&frame.image, 90).unwrap();
        assert!(!bytes.is_empty());
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_pixel_range_uniform() {
        let image = RgbImage::from_pixel(16, 8, Rgb([42, 42, 42]));
        assert_eq!(pixel_range(&image), Some((42, 42)));
    }

    #[test]
    fn test_pixel_range_gradient() {
        let frame = gradient_frame(64, 32);
        let (min, max) = pixel_range(&frame.image).unwrap();
        assert!(max > min);
    }

    #[test]
    fn test_pixel_range_empty() {
        let image = RgbImage::new(0, 0);
        assert_eq!(pixel_range(&image), None);
    }
}
