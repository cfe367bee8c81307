//! Physics configuration
//!
//! Plain in-memory configuration structs. All of them derive serde so a game
//! can keep them next to the rest of its settings, but the physics layer never
//! reads or writes files itself.

use brisk_core::Vec2;
use serde::{Deserialize, Serialize};

/// Bit mask of physics layers
pub type LayerMask = u32;

/// Mask matching every layer
pub const ALL_LAYERS: LayerMask = u32::MAX;

/// Number of addressable physics layers
pub const MAX_LAYERS: u32 = 32;

/// Mask bit for a layer index
#[inline]
pub fn layer_bit(layer: u32) -> LayerMask {
    1u32.checked_shl(layer).unwrap_or(0)
}

/// Whether `mask` includes `layer`
#[inline]
pub fn mask_includes(mask: LayerMask, layer: u32) -> bool {
    mask & layer_bit(layer) != 0
}

/// World-wide physics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity applied by arcade rigidbodies, y-down
    pub gravity: Vec2,
    /// Side length of a spatial hash cell
    pub spatial_hash_cell_size: f32,
    /// Whether linecasts report trigger colliders
    pub raycasts_hit_triggers: bool,
    /// Whether linecasts report colliders that contain the cast's start point
    pub raycasts_start_in_colliders: bool,
    /// Upper bound on grid cells a single linecast may visit
    pub linecast_max_steps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 300.0),
            spatial_hash_cell_size: 100.0,
            raycasts_hit_triggers: false,
            raycasts_start_in_colliders: false,
            linecast_max_steps: 100,
        }
    }
}

/// Per-collider settings applied when a collider is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderConfig {
    /// Layer index (0..32) this collider lives on
    pub physics_layer: u32,
    /// Layers this collider queries against
    pub collides_with_layers: LayerMask,
    /// Triggers report overlaps but never block movement
    pub is_trigger: bool,
    /// Whether the shape follows the entity's rotation and scale
    pub should_collider_scale_and_rotate_with_transform: bool,
    /// Offset of the shape from the entity position
    pub local_offset: Vec2,
    /// Tie-breaker for casts and late trigger ordering; lower sorts first
    pub cast_sort_order: i32,
}

impl Default for ColliderConfig {
    fn default() -> Self {
        Self {
            physics_layer: 0,
            collides_with_layers: ALL_LAYERS,
            is_trigger: false,
            should_collider_scale_and_rotate_with_transform: true,
            local_offset: Vec2::ZERO,
            cast_sort_order: 0,
        }
    }
}

impl ColliderConfig {
    pub fn trigger() -> Self {
        Self {
            is_trigger: true,
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.physics_layer = layer.min(MAX_LAYERS - 1);
        self
    }

    pub fn with_collides_with(mut self, mask: LayerMask) -> Self {
        self.collides_with_layers = mask;
        self
    }

    pub fn with_local_offset(mut self, offset: Vec2) -> Self {
        self.local_offset = offset;
        self
    }

    pub fn with_cast_sort_order(mut self, order: i32) -> Self {
        self.cast_sort_order = order;
        self
    }

    pub fn with_scale_and_rotate(mut self, enabled: bool) -> Self {
        self.should_collider_scale_and_rotate_with_transform = enabled;
        self
    }
}
