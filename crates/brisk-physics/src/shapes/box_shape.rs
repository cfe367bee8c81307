use brisk_core::{RectangleF, Vec2};

use super::{BoundsContext, Polygon};

/// Rectangle shape. Stays on the axis-aligned fast paths until its owner is
/// rotated, then behaves like any other polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxShape {
    polygon: Polygon,
    width: f32,
    height: f32,
}

impl BoxShape {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            polygon: Polygon::new_box(width, height),
            width,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Resize the box. Takes effect on the next bounds recalculation.
    pub fn update_box(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.polygon.set_points(Polygon::build_box(width, height));
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn is_unrotated(&self) -> bool {
        self.polygon.is_unrotated()
    }

    pub fn position(&self) -> Vec2 {
        self.polygon.position
    }

    pub fn bounds(&self) -> RectangleF {
        self.polygon.bounds
    }

    pub(crate) fn position_mut(&mut self) -> &mut Vec2 {
        &mut self.polygon.position
    }

    pub(crate) fn bounds_mut(&mut self) -> &mut RectangleF {
        &mut self.polygon.bounds
    }

    pub(crate) fn center(&self) -> Vec2 {
        self.polygon.center
    }

    pub fn recalculate_bounds(&mut self, ctx: &BoundsContext) {
        self.polygon.recalculate_bounds(ctx);
    }

    /// Closed containment test; points on the border count as inside
    pub fn contains_point(&self, point: Vec2) -> bool {
        if self.is_unrotated() {
            let bounds = self.bounds();
            return point.x >= bounds.left()
                && point.x <= bounds.right()
                && point.y >= bounds.top()
                && point.y <= bounds.bottom();
        }
        self.polygon.contains_point(point)
    }
}
