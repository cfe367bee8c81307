//! Math utilities
//!
//! Re-exports from glam plus the 2D geometry primitives the collision layer is
//! built on.

use serde::{Deserialize, Serialize};

pub use glam::{Affine2, IVec2, Mat2, Vec2};

/// 3x2 affine matrix (rotation, scale and translation) used to transform
/// polygon points.
pub type Matrix2D = Affine2;

/// Tolerance used where exact float comparisons would be unstable
pub const EPSILON: f32 = 1e-6;

/// Axis-aligned rectangle with a top-left origin (y-down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RectangleF {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width, never negative for collider bounds
    pub width: f32,
    /// Height, never negative for collider bounds
    pub height: f32,
}

impl RectangleF {
    /// Zero-sized rectangle at the origin
    pub const EMPTY: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Create a rectangle from its top-left corner and size
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from a location and a size vector
    pub fn from_location_size(location: Vec2, size: Vec2) -> Self {
        Self::new(location.x, location.y, size.x, size.y)
    }

    /// Create a rectangle spanning two corners
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Create the smallest rectangle containing every point
    pub fn encompassing_points(points: &[Vec2]) -> Self {
        if points.is_empty() {
            return Self::EMPTY;
        }

        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }
        Self::from_min_max(min, max)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Top-left corner
    pub fn location(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Bottom-right corner
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Check if a point is inside the rectangle (right and bottom edges excluded)
    pub fn contains(&self, point: Vec2) -> bool {
        self.x <= point.x && point.x < self.right() && self.y <= point.y && point.y < self.bottom()
    }

    /// Check if this rectangle overlaps another. Rectangles that only share an
    /// edge do not intersect.
    pub fn intersects(&self, other: &RectangleF) -> bool {
        other.left() < self.right()
            && self.left() < other.right()
            && other.top() < self.bottom()
            && self.top() < other.bottom()
    }

    /// Smallest rectangle containing both rectangles
    pub fn union(&self, other: &RectangleF) -> RectangleF {
        Self::from_min_max(
            self.location().min(other.location()),
            self.max().max(other.max()),
        )
    }

    /// Grow (or shrink, with negative amounts) every edge outward
    pub fn inflate(&self, horizontal: f32, vertical: f32) -> RectangleF {
        Self::new(
            self.x - horizontal,
            self.y - vertical,
            self.width + horizontal * 2.0,
            self.height + vertical * 2.0,
        )
    }

    /// Translate the rectangle
    pub fn offset(&self, delta: Vec2) -> RectangleF {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Bounds covering this rectangle before and after moving by `delta`
    pub fn swept_broadphase_bounds(&self, delta: Vec2) -> RectangleF {
        self.union(&self.offset(delta))
    }

    /// Slab test against a ray. Returns the fraction along `ray.direction`
    /// where the ray enters the rectangle.
    pub fn ray_intersects(&self, ray: &Ray2D) -> Option<f32> {
        let mut distance = 0.0_f32;
        let mut max_value = f32::MAX;

        if ray.direction.x.abs() < EPSILON {
            if ray.start.x < self.x || ray.start.x > self.right() {
                return None;
            }
        } else {
            let inv = 1.0 / ray.direction.x;
            let mut near = (self.x - ray.start.x) * inv;
            let mut far = (self.right() - ray.start.x) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            distance = distance.max(near);
            max_value = max_value.min(far);
            if distance > max_value {
                return None;
            }
        }

        if ray.direction.y.abs() < EPSILON {
            if ray.start.y < self.y || ray.start.y > self.bottom() {
                return None;
            }
        } else {
            let inv = 1.0 / ray.direction.y;
            let mut near = (self.y - ray.start.y) * inv;
            let mut far = (self.bottom() - ray.start.y) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            distance = distance.max(near);
            max_value = max_value.min(far);
            if distance > max_value {
                return None;
            }
        }

        Some(distance)
    }

    /// Closest point on the rectangle's border to `point`, together with the
    /// outward normal of the edge it lies on.
    pub fn closest_point_on_border_to_point(&self, point: Vec2) -> (Vec2, Vec2) {
        let mut result = Vec2::new(
            point.x.clamp(self.left(), self.right()),
            point.y.clamp(self.top(), self.bottom()),
        );
        let mut normal = Vec2::ZERO;

        if result != point {
            // Outside: clamping already landed on the border
            if result.x == self.left() && point.x < self.left() {
                normal.x = -1.0;
            } else if result.x == self.right() && point.x > self.right() {
                normal.x = 1.0;
            }
            if result.y == self.top() && point.y < self.top() {
                normal.y = -1.0;
            } else if result.y == self.bottom() && point.y > self.bottom() {
                normal.y = 1.0;
            }
            return (result, normal.normalize_or_zero());
        }

        let dl = result.x - self.left();
        let dr = self.right() - result.x;
        let dt = result.y - self.top();
        let db = self.bottom() - result.y;
        let min = dl.min(dr).min(dt).min(db);

        if min == dt {
            result.y = self.top();
            normal.y = -1.0;
        } else if min == db {
            result.y = self.bottom();
            normal.y = 1.0;
        } else if min == dl {
            result.x = self.left();
            normal.x = -1.0;
        } else {
            result.x = self.right();
            normal.x = 1.0;
        }

        (result, normal)
    }

    /// Closest point on the rectangle's border to the origin, restricted to
    /// the four axis directions. Used to read the MTV off a Minkowski difference.
    pub fn closest_point_on_bounds_to_origin(&self) -> Vec2 {
        let max = self.max();
        let mut min_dist = self.x.abs();
        let mut bounds_point = Vec2::new(self.x, 0.0);

        if max.x.abs() < min_dist {
            min_dist = max.x.abs();
            bounds_point = Vec2::new(max.x, 0.0);
        }

        if max.y.abs() < min_dist {
            min_dist = max.y.abs();
            bounds_point = Vec2::new(0.0, max.y);
        }

        if self.y.abs() < min_dist {
            bounds_point = Vec2::new(0.0, self.y);
        }

        bounds_point
    }
}

/// Line segment used for casts. `direction` is `end - start` and is not normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray2D {
    pub start: Vec2,
    pub end: Vec2,
    pub direction: Vec2,
}

impl Ray2D {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self {
            start,
            end,
            direction: end - start,
        }
    }
}

/// Apply `matrix` to every point of `src`, writing into `dst`
pub fn transform_points(matrix: &Matrix2D, src: &[Vec2], dst: &mut Vec<Vec2>) {
    dst.clear();
    dst.extend(src.iter().map(|p| matrix.transform_point2(*p)));
}

/// Point on a circle at `angle_degrees` measured clockwise from +x (y-down)
pub fn point_on_circle(center: Vec2, radius: f32, angle_degrees: f32) -> Vec2 {
    let radians = angle_degrees.to_radians();
    Vec2::new(
        radians.cos() * radius + center.x,
        radians.sin() * radius + center.y,
    )
}

/// Unnormalized perpendicular of the segment `first -> second`
pub fn perpendicular(first: Vec2, second: Vec2) -> Vec2 {
    Vec2::new(-(second.y - first.y), second.x - first.x)
}

/// Closest point to `point` on the segment `a -> b`
pub fn closest_point_on_line(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let v = b - a;
    let length_squared = v.length_squared();
    if length_squared < EPSILON {
        return a;
    }
    let t = ((point - a).dot(v) / length_squared).clamp(0.0, 1.0);
    a + v * t
}

/// Unsigned angle between two vectors in degrees
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let denominator = (from.length_squared() * to.length_squared()).sqrt();
    if denominator < EPSILON {
        return 0.0;
    }
    let dot = (from.dot(to) / denominator).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

/// Intersection of segments `a1 -> a2` and `b1 -> b2`. Returns the parametric
/// position along each segment. Parallel segments never intersect.
pub fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<(f32, f32)> {
    let b = a2 - a1;
    let d = b2 - b1;
    let b_dot_d_perp = b.x * d.y - b.y * d.x;
    if b_dot_d_perp == 0.0 {
        return None;
    }

    let c = b1 - a1;
    let t = (c.x * d.y - c.y * d.x) / b_dot_d_perp;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }

    let u = (c.x * b.y - c.y * b.x) / b_dot_d_perp;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    Some((t, u))
}

/// Linear interpolation
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Inverse linear interpolation
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.0
    } else {
        (value - a) / (b - a)
    }
}
