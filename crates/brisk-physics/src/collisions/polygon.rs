use brisk_core::{RectangleF, Vec2};

use crate::results::CollisionResult;
use crate::shapes::{BoxShape, Polygon};

/// Project a polygon's world-space points onto `axis`
fn project(polygon: &Polygon, axis: Vec2) -> (f32, f32) {
    let offset = polygon.position.dot(axis);
    polygon
        .points()
        .iter()
        .map(|point| point.dot(axis) + offset)
        .fold((f32::MAX, f32::MIN), |(min, max), d| (min.min(d), max.max(d)))
}

/// Separating axis test between two convex polygons.
///
/// On every candidate axis the overlap is measured in both directions and the
/// smaller push wins, so the returned MTV is the shortest translation along
/// any edge normal of either polygon.
pub fn polygon_to_polygon(first: &Polygon, second: &Polygon) -> Option<CollisionResult> {
    let center_offset = first.position - second.position;
    let mut best: Option<(f32, Vec2)> = None;

    let axes = first.edge_normals().iter().chain(second.edge_normals());
    for &axis in axes {
        let (min_a, max_a) = project(first, axis);
        let (min_b, max_b) = project(second, axis);

        // Distance the first polygon must travel along +axis / -axis
        let forward = max_b - min_a;
        let backward = max_a - min_b;
        if forward <= 0.0 || backward <= 0.0 {
            return None;
        }

        let (depth, direction) = if forward < backward {
            (forward, axis)
        } else if backward < forward {
            (backward, -axis)
        } else if center_offset.dot(axis) >= 0.0 {
            (forward, axis)
        } else {
            (backward, -axis)
        };

        if best.is_none_or(|(best_depth, _)| depth < best_depth) {
            best = Some((depth, direction));
        }
    }

    let (depth, normal) = best?;
    tracing::trace!(depth, ?normal, "polygon overlap");

    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: -normal * depth,
        point: Vec2::ZERO,
    })
}

/// Minkowski difference of two boxes' bounds. The origin lies inside it
/// exactly when the boxes overlap.
pub fn minkowski_difference(first: &BoxShape, second: &BoxShape) -> RectangleF {
    let first_bounds = first.bounds();
    let second_bounds = second.bounds();

    // Shapes offset from their bounds' center keep that offset in the difference
    let position_offset = first.position() - first_bounds.center();
    let top_left = first_bounds.location() + position_offset - second_bounds.max();
    let size = first_bounds.size() + second_bounds.size();

    RectangleF::from_location_size(top_left, size)
}

/// Unrotated box against unrotated box
pub fn box_to_box(first: &BoxShape, second: &BoxShape) -> Option<CollisionResult> {
    let difference = minkowski_difference(first, second);
    if !difference.contains(Vec2::ZERO) {
        return None;
    }

    let mtv = difference.closest_point_on_bounds_to_origin();
    if mtv == Vec2::ZERO {
        return None;
    }

    Some(CollisionResult {
        collider: None,
        normal: -mtv.normalize(),
        minimum_translation_vector: mtv,
        point: Vec2::ZERO,
    })
}
