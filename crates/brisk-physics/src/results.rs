//! Collision and raycast results
//!
//! Both types are plain values. Narrow-phase functions return them wrapped in
//! `Option`, so a caller never observes stale data from a previous query.

use brisk_core::Vec2;

use crate::collider::ColliderId;

/// Outcome of a shape-vs-shape test
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Collider that was hit. Only set by collider-level queries.
    pub collider: Option<ColliderId>,
    /// Unit vector pointing from the second shape toward the first
    pub normal: Vec2,
    /// Subtract from the first shape's position (or add to the second's) to
    /// separate the shapes. Its length is the penetration depth.
    pub minimum_translation_vector: Vec2,
    /// Contact point. Not every algorithm fills this in.
    pub point: Vec2,
}

impl CollisionResult {
    /// Swap the roles of the two shapes
    pub fn invert(&mut self) {
        self.normal = -self.normal;
        self.minimum_translation_vector = -self.minimum_translation_vector;
    }

    pub fn inverted(mut self) -> Self {
        self.invert();
        self
    }
}

/// Outcome of a line or ray cast
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Collider that was hit. Only set by world-level queries.
    pub collider: Option<ColliderId>,
    /// Fraction (0..=1) along the cast segment
    pub fraction: f32,
    /// Distance from the segment start to the hit point
    pub distance: f32,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point, facing the cast origin
    pub normal: Vec2,
    /// Center of the cast shape at impact. Equal to `point` for line casts.
    pub centroid: Vec2,
}

impl RaycastHit {
    pub fn new(fraction: f32, distance: f32, point: Vec2, normal: Vec2) -> Self {
        Self {
            collider: None,
            fraction,
            distance,
            point,
            normal,
            centroid: point,
        }
    }
}
