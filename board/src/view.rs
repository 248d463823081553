//! Pointer-to-canvas coordinate mapping.
//!
//! Raw pointer events arrive in client coordinates; the raster bitmap lives
//! in device pixels. [`Viewport`] normalizes between the two using the
//! canvas's current bounding rectangle and the device pixel ratio. When the
//! host resizes the surface it updates the rectangle here and recreates the
//! bitmap — see [`crate::raster::Raster::resize`].

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use crate::Point;

/// The canvas element's bounding rectangle in client (CSS pixel) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A raw pointer or touch event position in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPointer {
    pub client_x: f64,
    pub client_y: f64,
}

/// Maps pointer input onto the raster bitmap.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    rect: BoundingRect,
    dpr: f64,
}

impl Viewport {
    /// Create a viewport. A non-positive `dpr` is clamped to 1.0.
    #[must_use]
    pub fn new(rect: BoundingRect, dpr: f64) -> Self {
        Self { rect, dpr: if dpr > 0.0 { dpr } else { 1.0 } }
    }

    /// Convert a raw pointer event to bitmap pixel coordinates.
    #[must_use]
    pub fn pointer_to_canvas(&self, raw: RawPointer) -> Point {
        Point {
            x: (raw.client_x - self.rect.left) * self.dpr,
            y: (raw.client_y - self.rect.top) * self.dpr,
        }
    }

    /// Bitmap dimensions in device pixels for the current rectangle.
    #[must_use]
    pub fn bitmap_size(&self) -> (u32, u32) {
        let clamp = |v: f64| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                (v * self.dpr).round().max(1.0) as u32
            }
        };
        (clamp(self.rect.width), clamp(self.rect.height))
    }

    /// Update the bounding rectangle after a layout change.
    pub fn set_rect(&mut self, rect: BoundingRect) {
        self.rect = rect;
    }

    /// Update the device pixel ratio (e.g. window moved across monitors).
    pub fn set_dpr(&mut self, dpr: f64) {
        if dpr > 0.0 {
            self.dpr = dpr;
        }
    }

    #[must_use]
    pub fn rect(&self) -> BoundingRect {
        self.rect
    }

    #[must_use]
    pub fn dpr(&self) -> f64 {
        self.dpr
    }
}
