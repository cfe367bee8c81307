//! # Brisk Physics
//!
//! 2D collision detection and arcade movement resolution.
//!
//! ## Features
//! - Spatial hash broadphase with linecasts, box casts and overlap queries
//! - Box, circle and polygon shapes with SAT and Minkowski narrow phase
//! - Clipped movers, projectile movers and impulse-based arcade rigidbodies
//! - Trigger enter/exit tracking
//! - Ray-based platformer character controller with slopes and one-way platforms
//!
//! Everything hangs off a single [`PhysicsWorld`]. Entities, colliders and
//! rigidbodies are addressed by generational handles, and movers borrow the
//! world for the duration of each call.

pub mod arena;
pub mod character_controller;
pub mod collider;
pub mod collisions;
pub mod config;
pub mod error;
pub mod mover;
pub mod results;
pub mod rigidbody;
pub mod shapes;
pub mod spatial_hash;
pub mod triggers;
pub mod world;

pub use character_controller::{
    CharacterController, CharacterControllerConfig, CollisionState, SlopeSpeedCurve,
};
pub use collider::{Collider, ColliderId, ColliderShape};
pub use config::{layer_bit, ColliderConfig, LayerMask, PhysicsConfig, ALL_LAYERS, MAX_LAYERS};
pub use error::{PhysicsError, PhysicsResult};
pub use mover::{Mover, ProjectileMover};
pub use results::{CollisionResult, RaycastHit};
pub use rigidbody::ArcadeRigidbody;
pub use shapes::{BoxShape, Circle, Polygon, Shape};
pub use spatial_hash::SpatialHash;
pub use triggers::{ColliderTriggerHelper, TriggerListener, TriggerPair};
pub use world::PhysicsWorld;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        ArcadeRigidbody, CharacterController, CharacterControllerConfig, ColliderConfig, ColliderId,
        ColliderShape, CollisionResult, Mover, PhysicsConfig, PhysicsError, PhysicsResult, PhysicsWorld,
        ProjectileMover, RaycastHit, TriggerListener, ALL_LAYERS,
    };
    pub use brisk_core::{Entity, RectangleF, Transform2D, Vec2};
}
