//! Document model and render engine for the collaborative whiteboard.
//!
//! This crate owns everything that describes what is *on* a board and how it
//! turns into pixels: the element union ([`element::BoardElement`]), the
//! ordered in-memory store all replicas converge on ([`store::ElementStore`]),
//! the per-participant undo/redo stacks ([`history::History`]), pointer
//! normalization against the canvas rectangle ([`view::Viewport`]), and the
//! raster surface that freehand paths are stroked onto ([`raster::Raster`]).
//!
//! Nothing in this crate knows about the network. Mutations arrive from the
//! session layer (local input or applied broadcasts) and reads flow out to
//! whatever hosts the surface.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | Board element union, ids, and sparse patches |
//! | [`store`] | Ordered element store keyed by identity |
//! | [`history`] | Undo/redo stacks and their store coordination |
//! | [`view`] | Pointer-to-canvas coordinate mapping |
//! | [`raster`] | RGBA raster surface, stroke painting, PNG export |
//! | [`color`] | Hex color parsing shared by raster and elements |

pub mod color;
pub mod element;
pub mod history;
pub mod raster;
pub mod store;
pub mod view;

/// A point on the canvas, in bitmap pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
