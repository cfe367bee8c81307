use brisk_core::math;
use brisk_core::{RectangleF, Vec2};

use super::BoundsContext;

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    /// Radius after the owning transform's scale
    pub(crate) radius: f32,
    original_radius: f32,
    pub(crate) position: Vec2,
    pub(crate) center: Vec2,
    pub(crate) bounds: RectangleF,
}

impl Circle {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            original_radius: radius,
            position: Vec2::ZERO,
            center: Vec2::ZERO,
            bounds: RectangleF::new(-radius, -radius, radius * 2.0, radius * 2.0),
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Set the unscaled radius. Takes effect on the next bounds recalculation.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.original_radius = radius;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn bounds(&self) -> RectangleF {
        self.bounds
    }

    pub fn recalculate_bounds(&mut self, ctx: &BoundsContext) {
        self.center = ctx.local_offset;

        if ctx.scale_and_rotate {
            let transform = &ctx.transform;
            let max_scale = transform.scale.x.max(transform.scale.y);
            self.radius = self.original_radius * max_scale;
            let scaled_offset = ctx.local_offset * transform.scale;
            self.center = scaled_offset;

            if transform.rotation != 0.0 {
                let offset_angle = scaled_offset.y.atan2(scaled_offset.x).to_degrees();
                self.center = math::point_on_circle(
                    Vec2::ZERO,
                    scaled_offset.length(),
                    transform.rotation_degrees() + offset_angle,
                );
            }
        }

        self.position = ctx.transform.position + self.center;
        self.bounds = RectangleF::new(
            self.position.x - self.radius,
            self.position.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        );
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        (point - self.position).length_squared() <= self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use brisk_core::Transform2D;

    use super::*;

    #[test]
    fn test_scaled_radius() {
        let mut circle = Circle::new(5.0);
        circle.recalculate_bounds(&BoundsContext {
            transform: Transform2D::new(Vec2::new(10.0, 10.0), 0.0, Vec2::new(2.0, 1.0)),
            local_offset: Vec2::ZERO,
            scale_and_rotate: true,
        });

        assert_eq!(circle.radius(), 10.0);
        assert_eq!(circle.bounds(), RectangleF::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_rotated_offset() {
        let mut circle = Circle::new(1.0);
        circle.recalculate_bounds(&BoundsContext {
            transform: Transform2D::new(Vec2::ZERO, std::f32::consts::FRAC_PI_2, Vec2::ONE),
            local_offset: Vec2::new(10.0, 0.0),
            scale_and_rotate: true,
        });

        assert!(circle.position().x.abs() < 1e-4);
        assert!((circle.position().y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_contains_point() {
        let circle = Circle::new(5.0);
        assert!(circle.contains_point(Vec2::new(3.0, 4.0)));
        assert!(!circle.contains_point(Vec2::new(4.0, 4.0)));
    }
}
