//! Strata layout bridge
//!
//! Geometry types and the two-phase synchronization protocol between
//! resolved style and the external flex engine.

mod bridge;
mod geometry;

pub use bridge::{BoxGeometry, LayoutBridge, LayoutError};
pub use geometry::{Point, Rect, Size};
