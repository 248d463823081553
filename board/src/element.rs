//! Board element union and sparse patches.
//!
//! DESIGN
//! ======
//! An element's `id` is its identity for the whole session: attribute changes
//! mutate the element in place, they never replace it under a new id. The
//! four variants are exactly what participants can put on a board — freehand
//! paths (rasterized), and three overlay kinds (shapes, sticky notes, text
//! boxes) that the host positions absolutely above the raster.
//!
//! `ElementPatch` is the wire-facing sparse update: only present fields are
//! applied, so patches touching disjoint fields commute and replicas converge
//! regardless of the order updates arrive in.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Point;

/// Unique identifier for a board element.
pub type ElementId = Uuid;

/// Geometric kind of a [`BoardElement::Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rect,
    /// Circle inscribed within the bounding box.
    Circle,
}

/// Any drawable object on the whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardElement {
    /// A committed freehand stroke, rendered on the raster surface.
    Path {
        id: ElementId,
        /// Ordered sequence of canvas points the stroke passed through.
        points: Vec<Point>,
        /// Stroke color as `#rrggbb`.
        color: String,
        stroke_width: f64,
        /// Participant who drew the stroke.
        owner: Uuid,
    },
    /// A geometric shape positioned on the overlay.
    Shape {
        id: ElementId,
        kind: ShapeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        owner: Uuid,
    },
    /// A colored note with editable text.
    StickyNote {
        id: ElementId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
        text: String,
        owner: Uuid,
    },
    /// A plain text box.
    TextBox {
        id: ElementId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: String,
        owner: Uuid,
    },
}

impl BoardElement {
    /// This element's session-unique identity.
    #[must_use]
    pub fn id(&self) -> ElementId {
        match self {
            Self::Path { id, .. }
            | Self::Shape { id, .. }
            | Self::StickyNote { id, .. }
            | Self::TextBox { id, .. } => *id,
        }
    }

    /// Participant that created this element.
    #[must_use]
    pub fn owner(&self) -> Uuid {
        match self {
            Self::Path { owner, .. }
            | Self::Shape { owner, .. }
            | Self::StickyNote { owner, .. }
            | Self::TextBox { owner, .. } => *owner,
        }
    }

    /// Whether this element is drawn on the raster surface (vs. the overlay).
    #[must_use]
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path { .. })
    }

    /// Merge a sparse patch into this element. Fields the variant does not
    /// carry are ignored, so a patch is always safe to apply.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        match self {
            Self::Path { color, stroke_width, .. } => {
                if let Some(c) = &patch.color {
                    *color = c.clone();
                }
                if let Some(w) = patch.stroke_width {
                    *stroke_width = w;
                }
            }
            Self::Shape { x, y, width, height, color, .. } => {
                apply_box(patch, x, y, width, height);
                if let Some(c) = &patch.color {
                    *color = c.clone();
                }
            }
            Self::StickyNote { x, y, width, height, color, text, .. } => {
                apply_box(patch, x, y, width, height);
                if let Some(c) = &patch.color {
                    *color = c.clone();
                }
                if let Some(t) = &patch.text {
                    *text = t.clone();
                }
            }
            Self::TextBox { x, y, width, height, text, .. } => {
                apply_box(patch, x, y, width, height);
                if let Some(t) = &patch.text {
                    *text = t.clone();
                }
            }
        }
    }
}

fn apply_box(patch: &ElementPatch, x: &mut f64, y: &mut f64, width: &mut f64, height: &mut f64) {
    if let Some(v) = patch.x {
        *x = v;
    }
    if let Some(v) = patch.y {
        *y = v;
    }
    if let Some(v) = patch.width {
        *width = v;
    }
    if let Some(v) = patch.height {
        *height = v;
    }
}

/// Sparse update for a board element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    /// New x position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New y position, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New fill/stroke color, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// New text content, if being updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New stroke width, if being updated (paths only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl ElementPatch {
    /// A patch that moves an element without touching anything else.
    #[must_use]
    pub fn move_to(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }
}
