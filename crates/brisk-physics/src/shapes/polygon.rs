use std::f32::consts::TAU;

use brisk_core::math::{self, Matrix2D};
use brisk_core::{RectangleF, Vec2};
use smallvec::SmallVec;

use super::BoundsContext;

/// Convex polygon. Points are stored relative to `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Points after the owning transform's rotation and scale
    points: Vec<Vec2>,
    /// Points as supplied, before any transform
    original_points: Vec<Vec2>,
    /// Average of the original points; rotation and scale happen around it
    polygon_center: Vec2,
    edge_normals: SmallVec<[Vec2; 8]>,
    /// Boxes only need two edge normals since opposite sides are parallel
    is_box: bool,
    is_unrotated: bool,
    pub(crate) position: Vec2,
    pub(crate) center: Vec2,
    pub(crate) bounds: RectangleF,
}

impl Polygon {
    /// Create a polygon from points wound in either direction. Callers must
    /// supply at least three points.
    pub fn new(points: Vec<Vec2>) -> Self {
        let mut polygon = Self {
            points: Vec::new(),
            original_points: Vec::new(),
            polygon_center: Vec2::ZERO,
            edge_normals: SmallVec::new(),
            is_box: false,
            is_unrotated: true,
            position: Vec2::ZERO,
            center: Vec2::ZERO,
            bounds: RectangleF::EMPTY,
        };
        polygon.set_points(points);
        polygon
    }

    /// Axis-aligned rectangle centered on the origin
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::new(Self::build_box(width, height))
    }

    /// Regular polygon approximating a circle
    pub fn circle_approximation(vertex_count: usize, radius: f32) -> Self {
        let vertex_count = vertex_count.max(3);
        let points = (0..vertex_count)
            .map(|i| {
                let angle = TAU * (i as f32 / vertex_count as f32);
                Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        Self::new(points)
    }

    pub(crate) fn new_box(width: f32, height: f32) -> Self {
        let mut polygon = Self::rectangle(width, height);
        polygon.is_box = true;
        polygon.build_edge_normals();
        polygon
    }

    pub(crate) fn build_box(width: f32, height: f32) -> Vec<Vec2> {
        let half = Vec2::new(width, height) * 0.5;
        vec![
            Vec2::new(-half.x, -half.y),
            Vec2::new(half.x, -half.y),
            Vec2::new(half.x, half.y),
            Vec2::new(-half.x, half.y),
        ]
    }

    /// Replace the polygon's points. Transform-derived state is reset until
    /// the next bounds recalculation.
    pub fn set_points(&mut self, points: Vec<Vec2>) {
        self.polygon_center = Self::find_polygon_center(&points);
        self.original_points = points.clone();
        self.points = points;
        self.build_edge_normals();
        self.bounds = RectangleF::encompassing_points(&self.points).offset(self.position);
    }

    /// Average of a set of points
    pub fn find_polygon_center(points: &[Vec2]) -> Vec2 {
        if points.is_empty() {
            return Vec2::ZERO;
        }
        points.iter().copied().sum::<Vec2>() / points.len() as f32
    }

    /// Shift points so their average sits on the origin
    pub fn recenter_polygon_verts(points: &mut [Vec2]) {
        let center = Self::find_polygon_center(points);
        for point in points.iter_mut() {
            *point -= center;
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn edge_normals(&self) -> &[Vec2] {
        &self.edge_normals
    }

    pub fn is_box(&self) -> bool {
        self.is_box
    }

    pub fn is_unrotated(&self) -> bool {
        self.is_unrotated
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn bounds(&self) -> RectangleF {
        self.bounds
    }

    fn build_edge_normals(&mut self) {
        self.edge_normals.clear();
        let count = self.points.len();
        if count < 2 {
            return;
        }

        let total_edges = if self.is_box { 2 } else { count };
        for i in 0..total_edges {
            let first = self.points[i];
            let second = self.points[(i + 1) % count];
            let normal = math::perpendicular(first, second).normalize_or_zero();
            // Zero-length edges give no usable axis
            if normal != Vec2::ZERO {
                self.edge_normals.push(normal);
            }
        }
    }

    /// Recompute the world-space points, position and bounds
    pub fn recalculate_bounds(&mut self, ctx: &BoundsContext) {
        self.center = ctx.local_offset;

        if ctx.scale_and_rotate {
            let transform = &ctx.transform;
            let mut combined = Matrix2D::from_translation(-self.polygon_center);

            if !transform.has_unit_scale() {
                combined = Matrix2D::from_scale(transform.scale) * combined;
                self.center = ctx.local_offset * transform.scale;
            }

            if transform.rotation != 0.0 {
                combined = Matrix2D::from_angle(transform.rotation) * combined;
                let scaled_offset = ctx.local_offset * transform.scale;
                let offset_angle = scaled_offset.y.atan2(scaled_offset.x).to_degrees();
                self.center = math::point_on_circle(
                    Vec2::ZERO,
                    scaled_offset.length(),
                    transform.rotation_degrees() + offset_angle,
                );
            }

            combined = Matrix2D::from_translation(self.polygon_center) * combined;
            math::transform_points(&combined, &self.original_points, &mut self.points);

            self.is_unrotated = transform.rotation == 0.0;
            self.build_edge_normals();
        }

        self.position = ctx.transform.position + self.center;
        self.bounds = RectangleF::encompassing_points(&self.points).offset(self.position);
    }

    /// Odd-even crossing test against a world-space point
    pub fn contains_point(&self, point: Vec2) -> bool {
        let point = point - self.position;
        let count = self.points.len();
        let mut inside = false;

        let mut j = count.wrapping_sub(1);
        for i in 0..count {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > point.y) != (pj.y > point.y)
                && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Closest point on the polygon's boundary to `point` (relative to
    /// `position`). Returns the point, its squared distance, and the outward
    /// normal of the edge it lies on.
    pub fn closest_point_to(&self, point: Vec2) -> (Vec2, f32, Vec2) {
        let count = self.points.len();
        let centroid = Self::find_polygon_center(&self.points);
        let mut distance_squared = f32::MAX;
        let mut closest = Vec2::ZERO;
        let mut edge_normal = Vec2::ZERO;

        for i in 0..count {
            let first = self.points[i];
            let second = self.points[(i + 1) % count];
            let candidate = math::closest_point_on_line(first, second, point);
            let candidate_sq = point.distance_squared(candidate);

            if candidate_sq < distance_squared {
                distance_squared = candidate_sq;
                closest = candidate;

                let mut normal = math::perpendicular(first, second).normalize_or_zero();
                if normal.dot(first - centroid) < 0.0 {
                    normal = -normal;
                }
                edge_normal = normal;
            }
        }

        (closest, distance_squared, edge_normal)
    }
}
