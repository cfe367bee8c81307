use brisk_core::math::{self, EPSILON};
use brisk_core::Vec2;

use crate::results::RaycastHit;
use crate::shapes::{Circle, Polygon};

/// Segment against every edge of a polygon; the nearest crossing wins
pub fn line_to_polygon(start: Vec2, end: Vec2, polygon: &Polygon) -> Option<RaycastHit> {
    let points = polygon.points();
    let count = points.len();
    let mut nearest: Option<(f32, Vec2)> = None;

    for i in 0..count {
        let first = points[i] + polygon.position;
        let second = points[(i + 1) % count] + polygon.position;

        if let Some((fraction, _)) = math::segment_intersection(start, end, first, second) {
            if nearest.is_none_or(|(best, _)| fraction < best) {
                nearest = Some((fraction, second - first));
            }
        }
    }

    let (fraction, edge) = nearest?;
    let direction = end - start;
    let mut normal = Vec2::new(edge.y, -edge.x).normalize_or_zero();
    if normal.dot(direction) > 0.0 {
        normal = -normal;
    }

    Some(RaycastHit::new(
        fraction,
        direction.length() * fraction,
        start + direction * fraction,
        normal,
    ))
}

/// Segment against a circle. A segment starting inside the circle hits at
/// its start point.
pub fn line_to_circle(start: Vec2, end: Vec2, circle: &Circle) -> Option<RaycastHit> {
    let length = start.distance(end);
    if length < EPSILON {
        return None;
    }

    let direction = (end - start) / length;
    let from_center = start - circle.position;
    let b = from_center.dot(direction);
    let c = from_center.length_squared() - circle.radius * circle.radius;

    // Starting outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let distance = (-b - discriminant.sqrt()).max(0.0);
    if distance > length {
        return None;
    }

    let point = start + direction * distance;
    let normal = (point - circle.position).normalize_or_zero();
    Some(RaycastHit::new(distance / length, distance, point, normal))
}

#[cfg(test)]
mod tests {
    use brisk_core::Transform2D;

    use super::*;
    use crate::shapes::BoundsContext;

    fn ctx(position: Vec2) -> BoundsContext {
        BoundsContext {
            transform: Transform2D::from_position(position),
            local_offset: Vec2::ZERO,
            scale_and_rotate: true,
        }
    }

    #[test]
    fn test_line_to_polygon_hits_near_edge() {
        let mut polygon = Polygon::rectangle(10.0, 10.0);
        polygon.recalculate_bounds(&ctx(Vec2::new(50.0, 0.0)));

        let hit = line_to_polygon(Vec2::ZERO, Vec2::new(100.0, 0.0), &polygon).unwrap();
        assert!((hit.fraction - 0.45).abs() < 1e-5);
        assert!((hit.distance - 45.0).abs() < 1e-4);
        assert!((hit.point - Vec2::new(45.0, 0.0)).length() < 1e-4);
        assert_eq!(hit.normal, Vec2::NEG_X);
    }

    #[test]
    fn test_line_to_polygon_miss() {
        let mut polygon = Polygon::rectangle(10.0, 10.0);
        polygon.recalculate_bounds(&ctx(Vec2::new(50.0, 50.0)));
        assert!(line_to_polygon(Vec2::ZERO, Vec2::new(100.0, 0.0), &polygon).is_none());
    }

    #[test]
    fn test_line_to_circle() {
        let mut circle = Circle::new(5.0);
        circle.recalculate_bounds(&ctx(Vec2::new(0.0, 20.0)));

        let hit = line_to_circle(Vec2::ZERO, Vec2::new(0.0, 40.0), &circle).unwrap();
        assert!((hit.distance - 15.0).abs() < 1e-4);
        assert!((hit.fraction - 0.375).abs() < 1e-5);
        assert!((hit.normal - Vec2::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn test_line_to_circle_too_short_or_away() {
        let mut circle = Circle::new(5.0);
        circle.recalculate_bounds(&ctx(Vec2::new(0.0, 20.0)));

        assert!(line_to_circle(Vec2::ZERO, Vec2::new(0.0, 10.0), &circle).is_none());
        assert!(line_to_circle(Vec2::ZERO, Vec2::new(0.0, -40.0), &circle).is_none());
    }

    #[test]
    fn test_line_starting_inside_circle() {
        let circle = Circle::new(5.0);
        let hit = line_to_circle(Vec2::new(1.0, 0.0), Vec2::new(30.0, 0.0), &circle).unwrap();
        assert_eq!(hit.fraction, 0.0);
        assert_eq!(hit.point, Vec2::new(1.0, 0.0));
    }
}
