//! Geometric primitives for crop and overlay placement.
//!
//! All rectangles are in output-surface pixel coordinates unless noted.

use serde::{Deserialize, Serialize};

/// Integer pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Height divided by width, or `None` for an empty size.
    pub fn inverse_aspect(self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.height as f32 / self.width as f32)
        }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole surface.
    pub fn full(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width as f32, size.height as f32)
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }

    /// Area of the rectangle.
    #[inline]
    pub fn area(self) -> f32 {
        self.width * self.height
    }

    /// Whether all components are finite numbers.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether the rectangle lies entirely inside `bounds`.
    pub fn is_within(self, bounds: Size) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= bounds.width as f32
            && self.bottom() <= bounds.height as f32
    }

    /// Scale every component independently along each axis.
    pub fn scale(self, sx: f32, sy: f32) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Keep the size, moving the rectangle so it lies inside `bounds`.
    ///
    /// A rectangle larger than the bounds is pinned to the origin.
    pub fn clamp_position(self, bounds: Size) -> Self {
        let max_x = (bounds.width as f32 - self.width).max(0.0);
        let max_y = (bounds.height as f32 - self.height).max(0.0);
        Self::new(
            self.x.clamp(0.0, max_x),
            self.y.clamp(0.0, max_y),
            self.width,
            self.height,
        )
    }

    /// Force the rectangle inside `bounds`.
    ///
    /// Width and height are first limited to `[min_extent, bounds]` (the
    /// minimum itself never exceeds the bounds), then the position is clamped
    /// so the whole rectangle fits.
    pub fn clamp_within(self, bounds: Size, min_extent: f32) -> Self {
        let bw = bounds.width as f32;
        let bh = bounds.height as f32;
        let width = self.width.clamp(min_extent.min(bw), bw);
        let height = self.height.clamp(min_extent.min(bh), bh);
        Self::new(self.x, self.y, width, height).clamp_position(bounds)
    }
}
