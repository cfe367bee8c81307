use brisk_core::Vec2;

use crate::results::CollisionResult;
use crate::shapes::{BoxShape, Circle, Polygon};

/// A point counts as colliding only when strictly inside, since a point on
/// the boundary has nothing to push out.
pub fn point_to_circle(point: Vec2, circle: &Circle) -> Option<CollisionResult> {
    let offset = point - circle.position;
    let distance_squared = offset.length_squared();
    if distance_squared > circle.radius * circle.radius {
        return None;
    }

    let normal = offset.normalize_or_zero();
    let depth = circle.radius - distance_squared.sqrt();
    let mtv = -normal * depth;
    if mtv == Vec2::ZERO {
        return None;
    }

    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: mtv,
        point: circle.position + normal * circle.radius,
    })
}

pub fn point_to_box(point: Vec2, shape: &BoxShape) -> Option<CollisionResult> {
    if !shape.contains_point(point) {
        return None;
    }

    let (closest, normal) = shape.bounds().closest_point_on_border_to_point(point);
    let mtv = point - closest;
    if mtv == Vec2::ZERO {
        return None;
    }

    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: mtv,
        point: closest,
    })
}

pub fn point_to_polygon(point: Vec2, polygon: &Polygon) -> Option<CollisionResult> {
    if !polygon.contains_point(point) {
        return None;
    }

    let local = point - polygon.position;
    let (closest, _, normal) = polygon.closest_point_to(local);
    let mtv = local - closest;
    if mtv == Vec2::ZERO {
        return None;
    }

    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: mtv,
        point: closest + polygon.position,
    })
}
