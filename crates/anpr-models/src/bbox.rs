use serde::{Deserialize, Serialize};

/// A bounding box in source-frame pixel coordinates.
///
/// Coordinates are corner-form: `(x1, y1)` top-left, `(x2, y2)` bottom-right,
/// with `x2 > x1` and `y2 > y1` for a valid box. Detectors may emit boxes that
/// extend past the frame edge; [`BBox::clamp`] intersects with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width in pixels. Negative when the box is degenerate.
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Box height in pixels. Negative when the box is degenerate.
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Check that the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// Intersect the box with a `frame_width` x `frame_height` frame.
    ///
    /// Returns `None` when nothing of the box remains inside the frame.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Option<BBox> {
        let x1 = self.x1.max(0);
        let y1 = self.y1.max(0);
        let x2 = self.x2.min(frame_width as i32);
        let y2 = self.y2.min(frame_height as i32);

        let clamped = BBox { x1, y1, x2, y2 };
        if clamped.is_valid() {
            Some(clamped)
        } else {
            None
        }
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x1, self.y1, self.width(), self.height())
    }
}
