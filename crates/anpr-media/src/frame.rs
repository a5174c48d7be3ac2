//! Extracted frames and the per-video frame set.

use image::RgbImage;

/// One raster frame extracted from a video.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Global frame index, starting at 0, monotonic across the whole video.
    ///
    /// This is the index the whole pipeline keys on: detections reference it,
    /// crops are derived through it, and events persist it. It must never be
    /// replaced by a batch-local index.
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Offset of this frame from the start of the video, in seconds.
    pub fn offset_secs(&self, fps: u32) -> f64 {
        self.index as f64 / fps.max(1) as f64
    }
}

/// All frames extracted from one video, ordered by global index.
#[derive(Debug, Clone)]
pub struct FrameSet {
    fps: u32,
    frames: Vec<Frame>,
}

impl FrameSet {
    /// Build a frame set from frames already carrying their global indices.
    pub fn new(fps: u32, frames: Vec<Frame>) -> Self {
        debug_assert!(
            frames.iter().enumerate().all(|(i, f)| f.index == i as u64),
            "frame indices must be dense and start at 0"
        );
        Self { fps, frames }
    }

    /// Extraction rate the frames were sampled at.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Look up a frame by global index.
    pub fn get(&self, index: u64) -> Option<&Frame> {
        self.frames.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterate over frames in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Frames grouped into fixed-size batches, preserving global indices.
    ///
    /// Each chunk's first frame carries the batch's global offset; remote
    /// inference maps batch-local response keys back through it.
    pub fn chunks(&self, batch_size: usize) -> std::slice::Chunks<'_, Frame> {
        self.frames.chunks(batch_size.max(1))
    }
}
