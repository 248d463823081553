//! The raster surface freehand paths are stroked onto.
//!
//! DESIGN
//! ======
//! This is the only module that produces pixels. It receives read-only views
//! of element state and a stream of stroke segments; it does not mutate any
//! document state.
//!
//! The surface carries a *current* stroke style — the local tool state.
//! Remote segments arriving mid-draw are painted through
//! [`Raster::paint_segment_with`], which swaps the style in and restores it
//! afterward so interleaved remote events never corrupt the local tool.
//!
//! `render_paths` clears the bitmap and redraws every committed path in
//! creation order. The host calls it after a resize (the bitmap is recreated,
//! which would otherwise lose all strokes) and after any path-set mutation.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use crate::Point;
use crate::color::{self, Rgb};
use crate::element::BoardElement;

/// Stroke color and width, as carried by draw segments and path elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgb,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self { color: Rgb::BLACK, width: 2.0 }
    }
}

impl StrokeStyle {
    /// Build a style from a hex color string, falling back to black.
    #[must_use]
    pub fn from_hex(hex: &str, width: f64) -> Self {
        Self { color: color::parse_hex(hex).unwrap_or(Rgb::BLACK), width }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("png encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// An RGBA8 bitmap with stroke-painting primitives.
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    style: StrokeStyle,
}

impl Raster {
    /// Create a white surface of the given device-pixel dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut raster = Self {
            width: width.max(1),
            height: height.max(1),
            pixels: Vec::new(),
            style: StrokeStyle::default(),
        };
        raster.clear();
        raster
    }

    /// Recreate the bitmap at new dimensions. All pixels are lost — the
    /// caller must follow up with [`Raster::render_paths`].
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.clear();
    }

    /// Fill the whole surface with white.
    pub fn clear(&mut self) {
        self.pixels = vec![0xff; self.width as usize * self.height as usize * 4];
    }

    /// Set the local tool's stroke style.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    /// The local tool's current stroke style.
    #[must_use]
    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    /// Paint one segment with the current (local tool) style.
    pub fn paint_segment(&mut self, a: Point, b: Point) {
        self.stamp_segment(a, b, self.style);
    }

    /// Paint one segment with a different style, restoring the local tool
    /// style afterward. Used for remote segments interleaved with a local
    /// stroke in progress.
    pub fn paint_segment_with(&mut self, a: Point, b: Point, style: StrokeStyle) {
        let saved = self.style;
        self.style = style;
        self.paint_segment(a, b);
        self.style = saved;
    }

    /// Clear the surface and redraw every path element in creation order.
    /// Non-path elements are overlay-positioned by the host, never rasterized.
    pub fn render_paths<'a, I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = &'a BoardElement>,
    {
        self.clear();
        for element in elements {
            if let BoardElement::Path { points, color, stroke_width, .. } = element {
                let style = StrokeStyle::from_hex(color, *stroke_width);
                self.stroke_polyline(points, style);
            }
        }
    }

    /// Stroke a full polyline with an explicit style. A single point renders
    /// as a dot.
    pub fn stroke_polyline(&mut self, points: &[Point], style: StrokeStyle) {
        match points {
            [] => {}
            [only] => self.stamp(*only, style),
            _ => {
                for pair in points.windows(2) {
                    self.stamp_segment(pair[0], pair[1], style);
                }
            }
        }
    }

    /// Serialize the bitmap as a PNG image. Paths only — overlay elements
    /// are not part of the raster and are not included.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Encode`] if PNG encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, ExportError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
        }
        Ok(out)
    }

    /// The pixel at integer coordinates, as `[r, g, b, a]`. Out-of-bounds
    /// reads return opaque white.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0xff; 4];
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    // Stamping: a thick segment is a brush disc swept along the line at
    // sub-radius steps. Cheap, branch-light, and good enough at whiteboard
    // stroke widths.

    fn stamp_segment(&mut self, a: Point, b: Point, style: StrokeStyle) {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dist = dx.hypot(dy);
        let step = (style.width / 2.0).max(0.5);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (dist / step).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = f64::from(i) / f64::from(steps);
            self.stamp(Point::new(a.x + dx * t, a.y + dy * t), style);
        }
    }

    fn stamp(&mut self, center: Point, style: StrokeStyle) {
        let radius = (style.width / 2.0).max(0.5);
        let r2 = radius * radius;
        let (cx, cy) = (center.x, center.y);
        let min_x = (cx - radius).floor().max(0.0);
        let max_x = (cx + radius).ceil().min(f64::from(self.width) - 1.0);
        let min_y = (cy - radius).floor().max(0.0);
        let max_y = (cy + radius).ceil().min(f64::from(self.height) - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x0, x1, y0, y1) = (min_x as u32, max_x as u32, min_y as u32, max_y as u32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - cx;
                let dy = f64::from(y) + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    let i = (y as usize * self.width as usize + x as usize) * 4;
                    self.pixels[i] = style.color.r;
                    self.pixels[i + 1] = style.color.g;
                    self.pixels[i + 2] = style.color.b;
                    self.pixels[i + 3] = 0xff;
                }
            }
        }
    }
}
