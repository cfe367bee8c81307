//! Physics errors
//!
//! Only programmer errors are reported here. Degenerate geometry, missing
//! cells and full result buffers are not errors; queries simply report no
//! collision or a partial count.

use brisk_core::Entity;
use thiserror::Error;

use crate::collider::ColliderId;

/// Precondition violations raised by the physics API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Entity {0:?} does not exist")]
    UnknownEntity(Entity),

    #[error("Collider {0:?} does not exist")]
    UnknownCollider(ColliderId),

    #[error("Entity {entity:?} already owns collider {existing:?}")]
    ColliderAlreadyAttached { entity: Entity, existing: ColliderId },

    #[error("Entity {0:?} already has an arcade rigidbody")]
    RigidbodyAlreadyAttached(Entity),

    #[error("Entity {0:?} has no visual bounds to size its collider from")]
    CannotAutoSize(Entity),

    #[error("Character controller on {0:?} requires a box collider")]
    ControllerRequiresBox(Entity),

    #[error("Polygon needs at least 3 points, got {0}")]
    DegeneratePolygon(usize),
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
