//! Collision shapes
//!
//! The shape set is closed: [`Shape`] is an enum over box, circle and polygon,
//! and every pairwise test dispatches on the concrete pair. Several algorithms
//! are asymmetric (circle vs box computes the MTV from the circle's side), so
//! the reversed pair runs the same routine and inverts the result.
//!
//! A shape's `position` and `bounds` are world-space and only valid after
//! [`Shape::recalculate_bounds`] has run for the current transform. Colliders
//! track when that is needed.

mod box_shape;
mod circle;
mod polygon;

pub use box_shape::BoxShape;
pub use circle::Circle;
pub use polygon::Polygon;

use brisk_core::{RectangleF, Transform2D, Vec2};

use crate::collisions;
use crate::results::{CollisionResult, RaycastHit};

/// Everything a shape needs from its collider and entity to place itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsContext {
    pub transform: Transform2D,
    pub local_offset: Vec2,
    pub scale_and_rotate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box(BoxShape),
    Circle(Circle),
    Polygon(Polygon),
}

impl Shape {
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::Box(BoxShape::new(width, height))
    }

    pub fn circle(radius: f32) -> Self {
        Self::Circle(Circle::new(radius))
    }

    pub fn polygon(points: Vec<Vec2>) -> Self {
        Self::Polygon(Polygon::new(points))
    }

    /// World-space position of the shape's center
    pub fn position(&self) -> Vec2 {
        match self {
            Shape::Box(b) => b.position(),
            Shape::Circle(c) => c.position,
            Shape::Polygon(p) => p.position,
        }
    }

    /// Offset of the shape from its entity after rotation and scale
    pub fn center(&self) -> Vec2 {
        match self {
            Shape::Box(b) => b.center(),
            Shape::Circle(c) => c.center,
            Shape::Polygon(p) => p.center,
        }
    }

    pub fn bounds(&self) -> RectangleF {
        match self {
            Shape::Box(b) => b.bounds(),
            Shape::Circle(c) => c.bounds,
            Shape::Polygon(p) => p.bounds,
        }
    }

    /// Move the shape without touching its owner. Used for "what if" probes;
    /// callers restore the shape by translating back.
    pub fn translate(&mut self, delta: Vec2) {
        let (position, bounds) = match self {
            Shape::Box(b) => (b.position() + delta, b.bounds().offset(delta)),
            Shape::Circle(c) => (c.position + delta, c.bounds.offset(delta)),
            Shape::Polygon(p) => (p.position + delta, p.bounds.offset(delta)),
        };
        self.set_placement(position, bounds);
    }

    /// Place the shape at an absolute position, keeping its extent
    pub fn set_position(&mut self, position: Vec2) {
        let delta = position - self.position();
        self.translate(delta);
    }

    /// Position and bounds, for restoring a shape after a probe
    pub(crate) fn placement(&self) -> (Vec2, RectangleF) {
        (self.position(), self.bounds())
    }

    pub(crate) fn set_placement(&mut self, position: Vec2, bounds: RectangleF) {
        match self {
            Shape::Box(b) => {
                *b.position_mut() = position;
                *b.bounds_mut() = bounds;
            }
            Shape::Circle(c) => {
                c.position = position;
                c.bounds = bounds;
            }
            Shape::Polygon(p) => {
                p.position = position;
                p.bounds = bounds;
            }
        }
    }

    pub fn recalculate_bounds(&mut self, ctx: &BoundsContext) {
        match self {
            Shape::Box(b) => b.recalculate_bounds(ctx),
            Shape::Circle(c) => c.recalculate_bounds(ctx),
            Shape::Polygon(p) => p.recalculate_bounds(ctx),
        }
    }

    /// Polygon view of box and polygon shapes
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Box(b) => Some(b.polygon()),
            Shape::Polygon(p) => Some(p),
            Shape::Circle(_) => None,
        }
    }

    pub fn is_box(&self) -> bool {
        matches!(self, Shape::Box(_))
    }

    /// Boolean overlap test. Cheaper than [`Shape::collides_with_shape`] on
    /// the axis-aligned paths and symmetric for every pair.
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => collisions::circle_overlaps_circle(a, b),
            (Shape::Circle(c), Shape::Box(b)) | (Shape::Box(b), Shape::Circle(c)) => {
                if b.is_unrotated() {
                    collisions::rect_to_circle(&b.bounds(), c.position, c.radius)
                } else {
                    collisions::circle_to_polygon(c, b.polygon()).is_some()
                }
            }
            (Shape::Circle(c), Shape::Polygon(p)) | (Shape::Polygon(p), Shape::Circle(c)) => {
                collisions::circle_to_polygon(c, p).is_some()
            }
            (Shape::Box(a), Shape::Box(b)) if a.is_unrotated() && b.is_unrotated() => {
                a.bounds().intersects(&b.bounds())
            }
            (a, b) => match (a.as_polygon(), b.as_polygon()) {
                (Some(first), Some(second)) => collisions::polygon_to_polygon(first, second).is_some(),
                _ => false,
            },
        }
    }

    /// Narrow-phase test producing an MTV that separates `self` from `other`
    pub fn collides_with_shape(&self, other: &Shape) -> Option<CollisionResult> {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => collisions::circle_to_circle(a, b),
            (Shape::Circle(c), Shape::Box(b)) => Self::circle_to_box_shape(c, b),
            (Shape::Box(b), Shape::Circle(c)) => {
                Self::circle_to_box_shape(c, b).map(CollisionResult::inverted)
            }
            (Shape::Circle(c), Shape::Polygon(p)) => collisions::circle_to_polygon(c, p),
            (Shape::Polygon(p), Shape::Circle(c)) => {
                collisions::circle_to_polygon(c, p).map(CollisionResult::inverted)
            }
            (Shape::Box(a), Shape::Box(b)) if a.is_unrotated() && b.is_unrotated() => {
                collisions::box_to_box(a, b)
            }
            (a, b) => collisions::polygon_to_polygon(a.as_polygon()?, b.as_polygon()?),
        }
    }

    fn circle_to_box_shape(circle: &Circle, shape: &BoxShape) -> Option<CollisionResult> {
        if shape.is_unrotated() {
            collisions::circle_to_box(circle, shape)
        } else {
            collisions::circle_to_polygon(circle, shape.polygon())
        }
    }

    /// Segment cast against the shape
    pub fn collides_with_line(&self, start: Vec2, end: Vec2) -> Option<RaycastHit> {
        match self {
            Shape::Circle(c) => collisions::line_to_circle(start, end, c),
            Shape::Box(b) => collisions::line_to_polygon(start, end, b.polygon()),
            Shape::Polygon(p) => collisions::line_to_polygon(start, end, p),
        }
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.contains_point(point),
            Shape::Box(b) => b.contains_point(point),
            Shape::Polygon(p) => p.contains_point(point),
        }
    }

    /// Treat `point` as the first shape and report how to push it out
    pub fn point_collides_with_shape(&self, point: Vec2) -> Option<CollisionResult> {
        match self {
            Shape::Circle(c) => collisions::point_to_circle(point, c),
            Shape::Box(b) if b.is_unrotated() => collisions::point_to_box(point, b),
            Shape::Box(b) => collisions::point_to_polygon(point, b.polygon()),
            Shape::Polygon(p) => collisions::point_to_polygon(point, p),
        }
    }
}
