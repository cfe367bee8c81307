//! Entity handles and transforms
//!
//! Entities themselves live outside the physics layer. The physics world only
//! needs a stable handle and the 2D transform (position, rotation, scale) that
//! colliders derive their world-space shapes from.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Entity identifier with generation counter for stable IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Entity index
    index: u32,
    /// Generation counter to detect stale references
    generation: u32,
}

impl Entity {
    /// Create a new entity with the given index and generation
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the entity index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the entity generation
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Create a null entity (invalid reference)
    pub fn null() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
        }
    }

    /// Check if this is a null entity
    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::null()
    }
}

/// Which part of a transform changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformComponent {
    Position,
    Rotation,
    Scale,
}

/// World-space transform of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// World position
    pub position: Vec2,
    /// Rotation in radians, clockwise in y-down space
    pub rotation: f32,
    /// Non-uniform scale
    pub scale: Vec2,
}

impl Transform2D {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    /// Create a new transform with the given position
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from all components
    pub fn new(position: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotation in degrees
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.to_degrees()
    }

    /// Whether the scale is exactly one on both axes
    pub fn has_unit_scale(&self) -> bool {
        self.scale == Vec2::ONE
    }

    /// Translate the transform
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_entity() {
        let entity = Entity::default();
        assert!(entity.is_null());
        assert!(!Entity::new(0, 0).is_null());
    }

    #[test]
    fn test_transform_translate() {
        let mut transform = Transform2D::from_position(Vec2::new(1.0, 2.0));
        transform.translate(Vec2::new(3.0, -2.0));
        assert_eq!(transform.position, Vec2::new(4.0, 0.0));
        assert!(transform.has_unit_scale());
    }

    #[test]
    fn test_rotation_degrees() {
        let transform = Transform2D::new(Vec2::ZERO, std::f32::consts::FRAC_PI_2, Vec2::ONE);
        assert!((transform.rotation_degrees() - 90.0).abs() < 1e-4);
    }
}
