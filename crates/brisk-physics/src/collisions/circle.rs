use brisk_core::math::EPSILON;
use brisk_core::{RectangleF, Vec2};

use crate::results::CollisionResult;
use crate::shapes::{BoxShape, Circle, Polygon};

pub fn circle_overlaps_circle(first: &Circle, second: &Circle) -> bool {
    let radii = first.radius + second.radius;
    first.position.distance_squared(second.position) < radii * radii
}

/// Overlap test between an axis-aligned rectangle and a circle. The rectangle
/// is closed, so a center on its border counts as overlapping.
pub fn rect_to_circle(rect: &RectangleF, center: Vec2, radius: f32) -> bool {
    let inside = center.x >= rect.left()
        && center.x <= rect.right()
        && center.y >= rect.top()
        && center.y <= rect.bottom();
    if inside {
        return true;
    }

    let closest = Vec2::new(
        center.x.clamp(rect.left(), rect.right()),
        center.y.clamp(rect.top(), rect.bottom()),
    );
    center.distance_squared(closest) < radius * radius
}

pub fn circle_to_circle(first: &Circle, second: &Circle) -> Option<CollisionResult> {
    let offset = first.position - second.position;
    let radii = first.radius + second.radius;
    let distance_squared = offset.length_squared();
    if distance_squared >= radii * radii {
        return None;
    }

    // Coincident centers have no separating direction
    let distance = distance_squared.sqrt();
    if distance < EPSILON {
        return None;
    }

    let normal = offset / distance;
    let depth = radii - distance;
    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: -normal * depth,
        point: second.position + normal * second.radius,
    })
}

/// Circle against an unrotated box
pub fn circle_to_box(circle: &Circle, shape: &BoxShape) -> Option<CollisionResult> {
    let bounds = shape.bounds();

    if shape.contains_point(circle.position) {
        // Center is inside: push out through the nearest edge plus the radius
        let (closest, normal) = bounds.closest_point_on_border_to_point(circle.position);
        let safe_place = closest + normal * circle.radius;
        return Some(CollisionResult {
            collider: None,
            normal,
            minimum_translation_vector: circle.position - safe_place,
            point: closest,
        });
    }

    let closest = Vec2::new(
        circle.position.x.clamp(bounds.left(), bounds.right()),
        circle.position.y.clamp(bounds.top(), bounds.bottom()),
    );
    let distance_squared = circle.position.distance_squared(closest);
    if distance_squared >= circle.radius * circle.radius {
        return None;
    }

    let distance = distance_squared.sqrt();
    let normal = (circle.position - closest) / distance;
    let depth = circle.radius - distance;
    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: -normal * depth,
        point: closest,
    })
}

/// Circle against any convex polygon, including rotated boxes
pub fn circle_to_polygon(circle: &Circle, polygon: &Polygon) -> Option<CollisionResult> {
    let local_center = circle.position - polygon.position;
    let (closest, distance_squared, edge_normal) = polygon.closest_point_to(local_center);
    let inside = polygon.contains_point(circle.position);

    if !inside && distance_squared >= circle.radius * circle.radius {
        return None;
    }

    let distance = distance_squared.sqrt();
    let (normal, depth) = if inside || distance < EPSILON {
        // Center on or inside the boundary: leave through the nearest edge.
        // A center exactly on an edge is pushed out by the radius alone.
        (edge_normal, distance + circle.radius)
    } else {
        ((local_center - closest) / distance, circle.radius - distance)
    };

    if normal == Vec2::ZERO {
        return None;
    }

    Some(CollisionResult {
        collider: None,
        normal,
        minimum_translation_vector: -normal * depth,
        point: closest + polygon.position,
    })
}
