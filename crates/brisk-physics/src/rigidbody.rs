//! Arcade rigidbody
//!
//! Impulse-based collision response without a solver: each body integrates
//! gravity, moves, then pushes itself (and any other rigidbody it hit) apart
//! along the MTV and exchanges velocity by inverse mass.

use brisk_core::{Entity, Vec2};
use serde::{Deserialize, Serialize};

use crate::collider::Collider;
use crate::error::{PhysicsError, PhysicsResult};
use crate::world::PhysicsWorld;

/// Bodies lighter than this never move
const IMMOVABLE_MASS: f32 = 0.0001;

/// Friction used while tangential motion is under the glue threshold
const GLUE_FRICTION: f32 = 1.01;

/// Scales [`ArcadeRigidbody::add_impulse`] forces into velocity units
const IMPULSE_SCALE: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcadeRigidbody {
    mass: f32,
    inverse_mass: f32,
    elasticity: f32,
    friction: f32,
    glue: f32,
    /// Whether world gravity is applied each update
    pub should_use_gravity: bool,
    pub velocity: Vec2,
}

impl Default for ArcadeRigidbody {
    fn default() -> Self {
        Self {
            mass: 10.0,
            inverse_mass: 0.1,
            elasticity: 0.5,
            friction: 0.5,
            glue: 0.01,
            should_use_gravity: true,
            velocity: Vec2::ZERO,
        }
    }
}

impl ArcadeRigidbody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mass of 0 makes the body immovable
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.set_mass(mass);
        self
    }

    /// Bounciness, clamped to 0..=1
    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity.clamp(0.0, 1.0);
        self
    }

    /// Clamped to 0..=1
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.clamp(0.0, 1.0);
        self
    }

    /// Squared tangential speed below which full friction kicks in, so bodies
    /// stick to slopes instead of sliding forever. Clamped to 0..=10.
    pub fn with_glue(mut self, glue: f32) -> Self {
        self.glue = glue.clamp(0.0, 10.0);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_gravity(mut self, should_use_gravity: bool) -> Self {
        self.should_use_gravity = should_use_gravity;
        self
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.inverse_mass = if self.mass > IMMOVABLE_MASS {
            1.0 / self.mass
        } else {
            0.0
        };
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn elasticity(&self) -> f32 {
        self.elasticity
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn glue(&self) -> f32 {
        self.glue
    }

    pub fn is_immovable(&self) -> bool {
        self.mass < IMMOVABLE_MASS
    }

    /// Instant push in the direction of `force`, scaled by inverse mass
    pub fn add_impulse(&mut self, force: Vec2, delta_time: f32) {
        if !self.is_immovable() {
            self.velocity += force * IMPULSE_SCALE * (self.inverse_mass * delta_time * delta_time);
        }
    }

    /// Velocity change that bounces `relative_velocity` off the surface
    /// described by `minimum_translation_vector`
    fn calculate_response_velocity(&self, relative_velocity: Vec2, minimum_translation_vector: Vec2) -> Vec2 {
        let normal = (-minimum_translation_vector).normalize_or_zero();
        let n = relative_velocity.dot(normal);

        let mut normal_component = normal * n;
        let tangential_component = relative_velocity - normal_component;

        // Already separating along the normal
        if n > 0.0 {
            normal_component = Vec2::ZERO;
        }

        let friction = if tangential_component.length_squared() < self.glue {
            GLUE_FRICTION
        } else {
            self.friction
        };

        -(1.0 + self.elasticity) * normal_component - friction * tangential_component
    }
}

impl PhysicsWorld {
    /// Step every rigidbody once, in the order they were added
    pub fn update_rigidbodies(&mut self, delta_time: f32) -> PhysicsResult<()> {
        let entities: Vec<Entity> = self.rigidbodies.keys().copied().collect();
        for entity in entities {
            self.update_rigidbody(entity, delta_time)?;
        }
        Ok(())
    }

    /// Integrate gravity, move, and resolve collisions for one rigidbody
    pub fn update_rigidbody(&mut self, entity: Entity, delta_time: f32) -> PhysicsResult<()> {
        if !self.contains_entity(entity) {
            return Err(PhysicsError::UnknownEntity(entity));
        }
        let Some(mut body) = self.rigidbodies.get(&entity).copied() else {
            return Ok(());
        };

        let collider = self.collider_of(entity).filter(|_| !body.is_immovable());
        let Some(collider) = collider else {
            body.velocity = Vec2::ZERO;
            self.rigidbodies.insert(entity, body);
            return Ok(());
        };

        if body.should_use_gravity {
            body.velocity += self.gravity() * delta_time;
        }
        self.translate(entity, body.velocity * delta_time)?;

        let bounds = self.collider_bounds(collider)?;
        let mask = self.collider(collider).map_or(0, Collider::collides_with_layers);
        let neighbors = self.take_broadphase(&bounds, Some(collider), mask);

        for &neighbor in &neighbors {
            let Some(neighbor_entity) = self
                .collider(neighbor)
                .filter(|other| !other.is_trigger())
                .map(Collider::entity)
            else {
                continue;
            };

            let Some(result) = self.collides_with(collider, neighbor)? else {
                continue;
            };
            let mtv = result.minimum_translation_vector;
            tracing::trace!(?entity, ?neighbor_entity, ?mtv, "rigidbody contact");

            match self.rigidbodies.get(&neighbor_entity).copied() {
                Some(mut other) => {
                    self.process_overlap(entity, &body, neighbor_entity, &other, mtv)?;
                    process_collision(&mut body, &mut other, mtv);
                    self.rigidbodies.insert(neighbor_entity, other);
                }
                None => {
                    // Neighbor acts as infinite mass
                    self.translate(entity, -mtv)?;
                    body.velocity += body.calculate_response_velocity(body.velocity, mtv);
                }
            }
        }
        self.recycle_broadphase(neighbors);

        self.rigidbodies.insert(entity, body);
        Ok(())
    }

    /// Separate two rigidbodies, splitting the MTV unless one cannot move
    fn process_overlap(
        &mut self,
        entity: Entity,
        body: &ArcadeRigidbody,
        other_entity: Entity,
        other: &ArcadeRigidbody,
        mtv: Vec2,
    ) -> PhysicsResult<()> {
        if body.is_immovable() {
            self.translate(other_entity, mtv)
        } else if other.is_immovable() {
            self.translate(entity, -mtv)
        } else {
            self.translate(entity, -mtv * 0.5)?;
            self.translate(other_entity, mtv * 0.5)
        }
    }
}

/// Share the response velocity between two bodies by inverse mass
fn process_collision(body: &mut ArcadeRigidbody, other: &mut ArcadeRigidbody, mtv: Vec2) {
    let relative_velocity = body.velocity - other.velocity;
    let response = body.calculate_response_velocity(relative_velocity, mtv);

    let total_inverse_mass = body.inverse_mass + other.inverse_mass;
    if total_inverse_mass <= 0.0 {
        return;
    }
    let our_fraction = body.inverse_mass / total_inverse_mass;
    let other_fraction = other.inverse_mass / total_inverse_mass;

    body.velocity += response * our_fraction;
    other.velocity -= response * other_fraction;
}

#[cfg(test)]
mod tests {
    use brisk_core::Transform2D;

    use super::*;
    use crate::collider::ColliderShape;
    use crate::config::ColliderConfig;

    fn spawn_body(world: &mut PhysicsWorld, position: Vec2, size: Vec2, body: Option<ArcadeRigidbody>) -> Entity {
        let entity = world.create_entity(Transform2D::from_position(position));
        world
            .add_collider(
                entity,
                ColliderShape::Box { width: size.x, height: size.y },
                ColliderConfig::default(),
            )
            .unwrap();
        if let Some(body) = body {
            world.add_rigidbody(entity, body).unwrap();
        }
        entity
    }

    #[test]
    fn test_builder_clamps() {
        let body = ArcadeRigidbody::new()
            .with_mass(-3.0)
            .with_elasticity(2.0)
            .with_friction(-1.0)
            .with_glue(50.0);
        assert_eq!(body.mass(), 0.0);
        assert!(body.is_immovable());
        assert_eq!(body.elasticity(), 1.0);
        assert_eq!(body.friction(), 0.0);
        assert_eq!(body.glue(), 10.0);
    }

    #[test]
    fn test_immovable_body_never_moves() {
        let mut world = PhysicsWorld::default();
        let body = ArcadeRigidbody::new()
            .with_mass(0.0)
            .with_velocity(Vec2::new(50.0, -20.0));
        let entity = spawn_body(&mut world, Vec2::new(10.0, 10.0), Vec2::splat(10.0), Some(body));

        for _ in 0..10 {
            world.update_rigidbody(entity, 1.0 / 60.0).unwrap();
            let body = world.rigidbody_mut(entity).unwrap();
            assert_eq!(body.velocity, Vec2::ZERO);
            body.add_impulse(Vec2::new(10.0, 0.0), 1.0 / 60.0);
        }
        assert_eq!(world.position(entity).unwrap(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_gravity_accelerates() {
        let mut world = PhysicsWorld::default();
        let entity = spawn_body(&mut world, Vec2::ZERO, Vec2::splat(10.0), Some(ArcadeRigidbody::new()));

        world.update_rigidbody(entity, 0.1).unwrap();
        let body = world.rigidbody(entity).unwrap();
        assert!((body.velocity.y - 30.0).abs() < 1e-4);
        assert!((world.position(entity).unwrap().y - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_body_lands_on_static_ground() {
        let mut world = PhysicsWorld::default();
        spawn_body(&mut world, Vec2::new(0.0, 105.0), Vec2::new(200.0, 10.0), None);
        let body = ArcadeRigidbody::new().with_elasticity(0.0);
        let entity = spawn_body(&mut world, Vec2::new(0.0, 90.0), Vec2::splat(10.0), Some(body));

        for _ in 0..120 {
            world.update_rigidbody(entity, 1.0 / 60.0).unwrap();
        }

        // Resting on top of the ground (top edge at y = 100)
        let y = world.position(entity).unwrap().y;
        assert!(y <= 95.0 + 1e-3, "sank into the ground: {y}");
        assert!(y > 94.0, "floating above the ground: {y}");
        assert!(world.rigidbody(entity).unwrap().velocity.y.abs() < 10.0);
    }

    #[test]
    fn test_head_on_collision_exchanges_velocity() {
        let mut world = PhysicsWorld::default();
        let moving = ArcadeRigidbody::new()
            .with_gravity(false)
            .with_elasticity(1.0)
            .with_velocity(Vec2::new(100.0, 0.0));
        let resting = ArcadeRigidbody::new().with_gravity(false).with_elasticity(1.0);

        let a = spawn_body(&mut world, Vec2::ZERO, Vec2::splat(10.0), Some(moving));
        let b = spawn_body(&mut world, Vec2::new(10.5, 0.0), Vec2::splat(10.0), Some(resting));

        world.update_rigidbody(a, 0.1).unwrap();

        let va = world.rigidbody(a).unwrap().velocity;
        let vb = world.rigidbody(b).unwrap().velocity;
        // Equal masses with full elasticity swap velocities
        assert!(va.x.abs() < 1e-3, "{va:?}");
        assert!((vb.x - 100.0).abs() < 1e-3, "{vb:?}");

        // Both were pushed apart by half the overlap
        let gap = world.position(b).unwrap().x - world.position(a).unwrap().x;
        assert!(gap >= 10.0 - 1e-3);
    }

    #[test]
    fn test_add_impulse_scales_by_inverse_mass() {
        let mut body = ArcadeRigidbody::new().with_mass(10.0);
        body.add_impulse(Vec2::new(1.0, 0.0), 0.1);
        assert!((body.velocity.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_duplicate_rigidbody_rejected() {
        let mut world = PhysicsWorld::default();
        let entity = spawn_body(&mut world, Vec2::ZERO, Vec2::splat(4.0), Some(ArcadeRigidbody::new()));
        assert_eq!(
            world.add_rigidbody(entity, ArcadeRigidbody::new()),
            Err(PhysicsError::RigidbodyAlreadyAttached(entity))
        );
    }
}
