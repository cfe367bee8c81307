//! Movers
//!
//! [`Mover`] moves an entity but stops at solid colliders, then runs trigger
//! detection. [`ProjectileMover`] always moves the full distance and reports
//! every overlap as a trigger enter, every frame.

use brisk_core::{Entity, Vec2};

use crate::collider::Collider;
use crate::error::PhysicsResult;
use crate::results::CollisionResult;
use crate::triggers::ColliderTriggerHelper;
use crate::world::PhysicsWorld;

/// Clipped movement for an entity with a solid collider
#[derive(Debug, Clone)]
pub struct Mover {
    entity: Entity,
    trigger_helper: ColliderTriggerHelper,
}

impl Mover {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            trigger_helper: ColliderTriggerHelper::new(entity),
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn trigger_helper(&self) -> &ColliderTriggerHelper {
        &self.trigger_helper
    }

    /// Clip `motion` against every solid neighbor in its path without moving
    /// anything. Each hit backs off by its MTV, so pushing into a corner backs
    /// off from both walls. Returns the last hit, if any.
    ///
    /// Trigger colliders and entities without a collider are never clipped.
    pub fn calculate_movement(
        &mut self,
        world: &mut PhysicsWorld,
        motion: &mut Vec2,
    ) -> PhysicsResult<Option<CollisionResult>> {
        world.position(self.entity)?;

        let Some(collider) = world.collider_of(self.entity) else {
            return Ok(None);
        };
        if world.collider(collider).is_none_or(Collider::is_trigger) {
            return Ok(None);
        }

        let result = world.will_collide_with_any(collider, motion)?;
        if let Some(hit) = &result {
            tracing::trace!(entity = ?self.entity, collider = ?hit.collider, motion = ?*motion, "mover clipped");
        }
        Ok(result)
    }

    /// Move by `motion` as-is and report trigger changes
    pub fn apply_movement(&mut self, world: &mut PhysicsWorld, motion: Vec2) -> PhysicsResult<()> {
        world.translate(self.entity, motion)?;
        self.trigger_helper.update(world)
    }

    /// Clip `motion` and apply it. `Some` when a solid collider was hit.
    pub fn move_by(
        &mut self,
        world: &mut PhysicsWorld,
        mut motion: Vec2,
    ) -> PhysicsResult<Option<CollisionResult>> {
        let result = self.calculate_movement(world, &mut motion)?;
        self.apply_movement(world, motion)?;
        Ok(result)
    }
}

/// Unclipped movement that treats every overlap as a trigger hit. Meant for
/// projectiles that get destroyed on their first hit.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileMover {
    entity: Entity,
}

impl ProjectileMover {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Move by the full `motion`, then fire trigger enter on both sides for
    /// every enabled collider overlapping at the new position. Returns
    /// whether anything was hit.
    pub fn move_by(&self, world: &mut PhysicsWorld, motion: Vec2) -> PhysicsResult<bool> {
        world.translate(self.entity, motion)?;

        let Some(collider) = world.collider_of(self.entity) else {
            return Ok(false);
        };
        let bounds = world.collider_bounds(collider)?;
        let mask = world.collider(collider).map_or(0, Collider::collides_with_layers);
        let neighbors = world.take_broadphase(&bounds, Some(collider), mask);

        let mut did_collide = false;
        for &neighbor in &neighbors {
            if !world.collider(neighbor).is_some_and(Collider::enabled) {
                continue;
            }
            if world.overlaps(collider, neighbor)? {
                did_collide = true;
                world.notify_side(neighbor, collider, true);
                world.notify_side(collider, neighbor, true);
            }
        }
        world.recycle_broadphase(neighbors);

        Ok(did_collide)
    }
}
