//! Pixel geometry for canvases and layer placement.

use serde::{Deserialize, Serialize};

/// Width and height of a drawing surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Canvas size used when a kit does not report one.
    pub const DEFAULT: CanvasSize = CanvasSize::new(1436, 1902);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether an image of the given natural size covers this canvas exactly.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Offset that centers an image of the given size on this canvas.
    ///
    /// Images larger than the canvas get a negative offset.
    pub fn centered(&self, width: u32, height: u32) -> Offset {
        Offset::new(
            (self.width as i64 - width as i64).div_euclid(2),
            (self.height as i64 - height as i64).div_euclid(2),
        )
    }

    /// Size scaled to a display width, keeping the aspect ratio.
    pub fn scaled_to_width(&self, display_width: u32) -> CanvasSize {
        if self.width == 0 {
            return CanvasSize::new(display_width, 0);
        }
        let height = (display_width as u64 * self.height as u64) / self.width as u64;
        CanvasSize::new(display_width, height as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Top-left placement of a layer on a canvas, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Offset {
    pub const ZERO: Offset = Offset::new(0, 0);

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}
