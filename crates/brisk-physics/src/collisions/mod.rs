//! Narrow-phase collision algorithms
//!
//! Free functions over concrete shape pairs. Every function that produces a
//! [`CollisionResult`](crate::CollisionResult) follows the same convention:
//! `normal` points from the second shape toward the first, and moving the first
//! shape by `-minimum_translation_vector` (or the second by `+`) separates them.
//!
//! Touching shapes and degenerate inputs (zero-length normals, zero MTVs)
//! report no collision rather than producing NaN.

mod circle;
mod line;
mod point;
mod polygon;

pub use circle::{circle_overlaps_circle, circle_to_box, circle_to_circle, circle_to_polygon, rect_to_circle};
pub use line::{line_to_circle, line_to_polygon};
pub use point::{point_to_box, point_to_circle, point_to_polygon};
pub use polygon::{box_to_box, minkowski_difference, polygon_to_polygon};

use brisk_core::{Ray2D, RectangleF, Vec2};

/// Time of impact of `moving` travelling by `motion` against a static
/// `target`, as a fraction of `motion`. Rectangles that already overlap
/// report `Some(0.0)`.
pub fn box_sweep(moving: &RectangleF, motion: Vec2, target: &RectangleF) -> Option<f32> {
    if moving.intersects(target) {
        return Some(0.0);
    }

    // Sweep the moving rectangle's corner against the target grown by its size
    let expanded = RectangleF::new(
        target.x - moving.width,
        target.y - moving.height,
        target.width + moving.width,
        target.height + moving.height,
    );
    let ray = Ray2D::new(moving.location(), moving.location() + motion);

    expanded
        .ray_intersects(&ray)
        .filter(|fraction| *fraction <= 1.0)
}
