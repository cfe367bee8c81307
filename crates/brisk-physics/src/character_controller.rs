//! Platformer character controller
//!
//! Moves a box-collided entity by casting fans of rays instead of resolving
//! overlaps. Horizontal rays run first and can walk the character up gentle
//! slopes; vertical rays then clip the fall or jump. Rays start `skin_width`
//! inside the box so a character resting on a surface never starts a ray
//! inside it.
//!
//! Coordinates are y-down: positive `delta.y` moves toward the ground.

use brisk_core::math::angle_between;
use brisk_core::{Entity, RectangleF, Vec2};
use serde::{Deserialize, Serialize};

use crate::collider::ColliderId;
use crate::config::{LayerMask, ALL_LAYERS};
use crate::error::{PhysicsError, PhysicsResult};
use crate::results::RaycastHit;
use crate::triggers::ColliderTriggerHelper;
use crate::world::PhysicsWorld;

/// Extra margin so float error never lets a ray stop just short of the skin
const SKIN_WIDTH_FLOAT_FUDGE: f32 = 0.001;

/// World up in y-down space
const UP: Vec2 = Vec2::new(0.0, -1.0);

/// Piecewise-linear curve mapping a slope angle in degrees to a speed
/// multiplier. Values outside the keyed range clamp to the end keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeSpeedCurve {
    /// `(angle, multiplier)` keys sorted by angle
    pub keys: Vec<(f32, f32)>,
}

impl Default for SlopeSpeedCurve {
    fn default() -> Self {
        Self {
            keys: vec![(-90.0, 1.5), (0.0, 1.0), (90.0, 0.0)],
        }
    }
}

impl SlopeSpeedCurve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, angle: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };
        if angle <= first.0 {
            return first.1;
        }
        if angle >= last.0 {
            return last.1;
        }

        self.keys
            .windows(2)
            .find(|pair| angle <= pair[1].0)
            .map_or(last.1, |pair| {
                let t = brisk_core::math::inverse_lerp(pair[0].0, pair[1].0, angle);
                brisk_core::math::lerp(pair[0].1, pair[1].1, t)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterControllerConfig {
    /// Inset of the ray origins from the collider edges
    pub skin_width: f32,
    /// Steepest walkable slope in degrees
    pub slope_limit: f32,
    /// Upward speed below which the controller still treats itself as
    /// walking rather than jumping when it meets a slope
    pub jumping_threshold: f32,
    pub total_horizontal_rays: u32,
    pub total_vertical_rays: u32,
    /// Layers that block movement. One-way platforms must be included.
    pub platform_mask: LayerMask,
    /// Layers that only report triggers and never block the rays
    pub trigger_mask: LayerMask,
    /// Layers passable from below
    pub one_way_platform_mask: LayerMask,
    pub slope_speed_multiplier: SlopeSpeedCurve,
    /// Give up on [`CharacterController::warp_to_grounded`] after this many steps
    pub warp_max_iterations: u32,
}

impl Default for CharacterControllerConfig {
    fn default() -> Self {
        Self {
            skin_width: 0.02,
            slope_limit: 30.0,
            jumping_threshold: 0.07,
            total_horizontal_rays: 8,
            total_vertical_rays: 4,
            platform_mask: ALL_LAYERS,
            trigger_mask: 0,
            one_way_platform_mask: 0,
            slope_speed_multiplier: SlopeSpeedCurve::default(),
            warp_max_iterations: 1000,
        }
    }
}

/// What the controller touched during the last move
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CollisionState {
    pub right: bool,
    pub left: bool,
    pub above: bool,
    pub below: bool,
    pub became_grounded_this_frame: bool,
    pub was_grounded_last_frame: bool,
    pub moving_down_slope: bool,
    /// Angle of the slope walked this frame. Negative while climbing.
    pub slope_angle: f32,
}

impl CollisionState {
    pub fn has_collision(&self) -> bool {
        self.below || self.right || self.left || self.above
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RaycastOrigins {
    top_left: Vec2,
    bottom_left: Vec2,
    bottom_right: Vec2,
}

type CollidedCallback = Box<dyn FnMut(&RaycastHit)>;

pub struct CharacterController {
    entity: Entity,
    collider: ColliderId,
    config: CharacterControllerConfig,
    collision_state: CollisionState,
    velocity: Vec2,
    trigger_helper: ColliderTriggerHelper,
    raycast_origins: RaycastOrigins,
    vertical_distance_between_rays: f32,
    horizontal_distance_between_rays: f32,
    raycast_hits_this_frame: Vec<RaycastHit>,
    is_going_up_slope: bool,
    ignore_one_way_platforms_time: f32,
    on_controller_collided: Option<CollidedCallback>,
}

impl CharacterController {
    /// Attach a controller to an entity that already has a box collider
    pub fn new(world: &PhysicsWorld, entity: Entity, config: CharacterControllerConfig) -> PhysicsResult<Self> {
        world.position(entity)?;
        let collider = world
            .collider_of(entity)
            .filter(|&id| world.collider(id).is_some_and(|c| c.shape().is_box()))
            .ok_or(PhysicsError::ControllerRequiresBox(entity))?;

        Ok(Self {
            entity,
            collider,
            config,
            collision_state: CollisionState::default(),
            velocity: Vec2::ZERO,
            trigger_helper: ColliderTriggerHelper::new(entity),
            raycast_origins: RaycastOrigins::default(),
            vertical_distance_between_rays: 0.0,
            horizontal_distance_between_rays: 0.0,
            raycast_hits_this_frame: Vec::new(),
            is_going_up_slope: false,
            ignore_one_way_platforms_time: 0.0,
            on_controller_collided: None,
        })
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn config(&self) -> &CharacterControllerConfig {
        &self.config
    }

    pub fn collision_state(&self) -> &CollisionState {
        &self.collision_state
    }

    /// Velocity implied by the last move
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.collision_state.below
    }

    /// Every ray hit from the last move, in the order they were found
    pub fn raycast_hits_this_frame(&self) -> &[RaycastHit] {
        &self.raycast_hits_this_frame
    }

    /// Drop through one-way platforms for the next `seconds` of moves
    pub fn ignore_one_way_platforms_for(&mut self, seconds: f32) {
        self.ignore_one_way_platforms_time = seconds.max(0.0);
    }

    /// Called once per ray hit at the end of every move
    pub fn set_on_controller_collided(&mut self, callback: impl FnMut(&RaycastHit) + 'static) {
        self.on_controller_collided = Some(Box::new(callback));
    }

    /// Move by `delta` as far as the level allows
    pub fn move_by(&mut self, world: &mut PhysicsWorld, mut delta: Vec2, delta_time: f32) -> PhysicsResult<()> {
        self.collision_state.was_grounded_last_frame = self.collision_state.below;
        let was_grounded = self.collision_state.was_grounded_last_frame;
        self.collision_state.reset();
        self.collision_state.was_grounded_last_frame = was_grounded;
        self.raycast_hits_this_frame.clear();
        self.is_going_up_slope = false;

        let ignore_one_way = self.ignore_one_way_platforms_time > 0.0;
        if ignore_one_way {
            self.ignore_one_way_platforms_time -= delta_time;
        }

        let bounds = world.collider_bounds(self.collider)?;
        self.prime_raycast_origins(&bounds);

        if delta.y > 0.0 && was_grounded {
            self.handle_vertical_slope(world, &mut delta);
        }
        if delta.x != 0.0 {
            self.move_horizontally(world, &mut delta);
        }
        if delta.y != 0.0 {
            self.move_vertically(world, &mut delta, ignore_one_way);
        }

        world.translate(self.entity, delta)?;

        if delta_time > 0.0 {
            self.velocity = delta / delta_time;
        }
        if !was_grounded && self.collision_state.below {
            self.collision_state.became_grounded_this_frame = true;
        }
        // Climbing a slope fakes vertical motion that must not carry into a jump
        if self.is_going_up_slope {
            self.velocity.y = 0.0;
        }

        self.trigger_helper.update(world)?;

        if let Some(callback) = self.on_controller_collided.as_mut() {
            for hit in &self.raycast_hits_this_frame {
                callback(hit);
            }
        }
        Ok(())
    }

    /// Step down one unit at a time until grounded. Returns whether ground
    /// was found within `warp_max_iterations` steps.
    pub fn warp_to_grounded(&mut self, world: &mut PhysicsWorld) -> PhysicsResult<bool> {
        for _ in 0..self.config.warp_max_iterations {
            self.move_by(world, Vec2::new(0.0, 1.0), 0.0)?;
            if self.is_grounded() {
                return Ok(true);
            }
        }
        log::warn!(
            "Character {:?} found no ground within {} steps",
            self.entity,
            self.config.warp_max_iterations
        );
        Ok(false)
    }

    fn prime_raycast_origins(&mut self, bounds: &RectangleF) {
        let skin = self.config.skin_width;
        let inset = bounds.inflate(-skin, -skin);
        self.raycast_origins = RaycastOrigins {
            top_left: Vec2::new(inset.left(), inset.top()),
            bottom_left: Vec2::new(inset.left(), inset.bottom()),
            bottom_right: Vec2::new(inset.right(), inset.bottom()),
        };

        let horizontal_rays = self.config.total_horizontal_rays.max(2);
        let vertical_rays = self.config.total_vertical_rays.max(2);
        self.vertical_distance_between_rays = inset.height / (horizontal_rays - 1) as f32;
        self.horizontal_distance_between_rays = inset.width / (vertical_rays - 1) as f32;
    }

    fn ray_mask(&self) -> LayerMask {
        self.config.platform_mask & !self.config.trigger_mask
    }

    fn cast(&self, world: &mut PhysicsWorld, origin: Vec2, direction: Vec2, distance: f32, mask: LayerMask) -> Option<RaycastHit> {
        world.linecast(origin, origin + direction * distance, mask, &[self.collider])
    }

    /// Snap onto a slope the character is walking down instead of stepping
    /// off it into the air
    fn handle_vertical_slope(&mut self, world: &mut PhysicsWorld, delta: &mut Vec2) {
        // Standing still never counts as walking down either side of a slope
        if delta.x == 0.0 {
            return;
        }

        let origins = self.raycast_origins;
        let center_x = (origins.bottom_left.x + origins.bottom_right.x) * 0.5;
        let slope_ray = Vec2::new(center_x, origins.bottom_left.y);
        let distance = self.config.slope_limit.to_radians().tan() * (origins.bottom_right.x - center_x);

        let Some(hit) = self.cast(world, slope_ray, -UP, distance, self.ray_mask()) else {
            return;
        };

        let angle = angle_between(hit.normal, UP);
        if angle == 0.0 {
            return;
        }

        let moving_down_slope = hit.normal.x.signum() == delta.x.signum();
        if moving_down_slope {
            let modifier = self.config.slope_speed_multiplier.evaluate(-angle);
            delta.y += hit.point.y - slope_ray.y + self.config.skin_width;
            delta.x *= modifier;
            self.collision_state.moving_down_slope = true;
            self.collision_state.slope_angle = angle;
        }
    }

    fn move_horizontally(&mut self, world: &mut PhysicsWorld, delta: &mut Vec2) {
        let skin = self.config.skin_width;
        let going_right = delta.x > 0.0;
        let mut ray_distance = delta.x.abs() + skin;
        let direction = if going_right { Vec2::X } else { Vec2::NEG_X };
        let initial_origin = if going_right {
            self.raycast_origins.bottom_right
        } else {
            self.raycast_origins.bottom_left
        };

        for i in 0..self.config.total_horizontal_rays.max(2) {
            // Fan upward from the bottom edge
            let ray = initial_origin + UP * (i as f32 * self.vertical_distance_between_rays);

            // Only the bottom ray of a grounded character may stand on one-way platforms
            let mask = if i == 0 && self.collision_state.was_grounded_last_frame {
                self.ray_mask()
            } else {
                self.ray_mask() & !self.config.one_way_platform_mask
            };

            let Some(hit) = self.cast(world, ray, direction, ray_distance, mask) else {
                continue;
            };

            if i == 0 && self.handle_horizontal_slope(world, delta, angle_between(hit.normal, UP)) {
                self.raycast_hits_this_frame.push(hit);
                break;
            }

            delta.x = hit.point.x - ray.x;
            ray_distance = delta.x.abs();
            if going_right {
                delta.x -= skin;
                self.collision_state.right = true;
            } else {
                delta.x += skin;
                self.collision_state.left = true;
            }
            self.raycast_hits_this_frame.push(hit);

            if ray_distance < skin + SKIN_WIDTH_FLOAT_FUDGE {
                break;
            }
        }
    }

    /// Returns true when the bottom ray hit a slope rather than a wall. Walkable
    /// slopes redirect `delta` along the surface; steeper ones block.
    fn handle_horizontal_slope(&mut self, world: &mut PhysicsWorld, delta: &mut Vec2, angle: f32) -> bool {
        if angle.round() as i32 == 90 {
            return false;
        }

        if angle < self.config.slope_limit {
            if -delta.y < self.config.jumping_threshold {
                delta.x *= self.config.slope_speed_multiplier.evaluate(angle);
                delta.y = -(angle.to_radians().tan() * delta.x).abs();

                let going_right = delta.x > 0.0;
                let origin = if going_right {
                    self.raycast_origins.bottom_right
                } else {
                    self.raycast_origins.bottom_left
                };
                let mask = if self.collision_state.was_grounded_last_frame {
                    self.ray_mask()
                } else {
                    self.ray_mask() & !self.config.one_way_platform_mask
                };

                let direction = delta.normalize_or_zero();
                if let Some(hit) = self.cast(world, origin, direction, delta.length(), mask) {
                    *delta = hit.point - origin;
                    if going_right {
                        delta.x -= self.config.skin_width;
                    } else {
                        delta.x += self.config.skin_width;
                    }
                }

                self.is_going_up_slope = true;
                self.collision_state.below = true;
                self.collision_state.slope_angle = -angle;
            }
        } else {
            delta.x = 0.0;
        }
        true
    }

    fn move_vertically(&mut self, world: &mut PhysicsWorld, delta: &mut Vec2, ignore_one_way: bool) {
        let skin = self.config.skin_width;
        let going_up = delta.y < 0.0;
        let mut ray_distance = delta.y.abs() + skin;
        let direction = if going_up { UP } else { -UP };
        let mut initial_origin = if going_up {
            self.raycast_origins.top_left
        } else {
            self.raycast_origins.bottom_left
        };
        initial_origin.x += delta.x;

        let mut mask = self.ray_mask();
        if (going_up && !self.collision_state.was_grounded_last_frame) || ignore_one_way {
            mask &= !self.config.one_way_platform_mask;
        }

        for i in 0..self.config.total_vertical_rays.max(2) {
            let ray = Vec2::new(initial_origin.x + i as f32 * self.horizontal_distance_between_rays, initial_origin.y);

            let Some(hit) = self.cast(world, ray, direction, ray_distance, mask) else {
                continue;
            };

            delta.y = hit.point.y - ray.y;
            ray_distance = delta.y.abs();
            if going_up {
                delta.y += skin;
                self.collision_state.above = true;
            } else {
                delta.y -= skin;
                self.collision_state.below = true;
            }
            self.raycast_hits_this_frame.push(hit);

            // Landing ended above the starting height, so a slope pushed us up
            if !going_up && delta.y < -0.00001 {
                self.is_going_up_slope = true;
            }

            if ray_distance < skin + SKIN_WIDTH_FLOAT_FUDGE {
                break;
            }
        }
    }
}

impl std::fmt::Debug for CharacterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterController")
            .field("entity", &self.entity)
            .field("collider", &self.collider)
            .field("collision_state", &self.collision_state)
            .field("velocity", &self.velocity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use brisk_core::Transform2D;

    use super::*;
    use crate::collider::ColliderShape;
    use crate::config::{layer_bit, ColliderConfig};

    const DT: f32 = 1.0 / 60.0;

    fn spawn_box(world: &mut PhysicsWorld, center: Vec2, size: Vec2, config: ColliderConfig) -> Entity {
        let entity = world.create_entity(Transform2D::from_position(center));
        world
            .add_collider(entity, ColliderShape::Box { width: size.x, height: size.y }, config)
            .unwrap();
        entity
    }

    fn controller_at(world: &mut PhysicsWorld, center: Vec2) -> CharacterController {
        let player = spawn_box(world, center, Vec2::splat(10.0), ColliderConfig::default());
        CharacterController::new(world, player, CharacterControllerConfig::default()).unwrap()
    }

    #[test]
    fn test_requires_box_collider() {
        let mut world = PhysicsWorld::default();
        let ball = world.create_entity(Transform2D::IDENTITY);
        world
            .add_collider(ball, ColliderShape::Circle { radius: 4.0 }, ColliderConfig::default())
            .unwrap();
        let bare = world.create_entity(Transform2D::IDENTITY);

        for entity in [ball, bare] {
            assert!(matches!(
                CharacterController::new(&world, entity, CharacterControllerConfig::default()),
                Err(PhysicsError::ControllerRequiresBox(e)) if e == entity
            ));
        }
    }

    #[test]
    fn test_lands_on_platform_below() {
        let mut world = PhysicsWorld::default();
        // Platform top edge at y = 12, character bottom at y = 5
        spawn_box(&mut world, Vec2::new(0.0, 17.0), Vec2::new(100.0, 10.0), ColliderConfig::default());
        let mut controller = controller_at(&mut world, Vec2::ZERO);

        controller.move_by(&mut world, Vec2::new(0.0, 10.0), DT).unwrap();

        let state = *controller.collision_state();
        assert!(state.below);
        assert!(state.became_grounded_this_frame);
        assert!((world.position(controller.entity()).unwrap().y - 7.0).abs() < 1e-3);
        assert!((controller.velocity().y - 7.0 / DT).abs() < 0.1);

        // Already grounded on the next frame
        controller.move_by(&mut world, Vec2::new(0.0, 10.0), DT).unwrap();
        assert!(controller.is_grounded());
        assert!(!controller.collision_state().became_grounded_this_frame);
        assert!(controller.velocity().y.abs() < 0.1);
    }

    #[test]
    fn test_falls_freely_without_ground() {
        let mut world = PhysicsWorld::default();
        let mut controller = controller_at(&mut world, Vec2::ZERO);

        controller.move_by(&mut world, Vec2::new(3.0, 4.0), 0.5).unwrap();
        assert!(!controller.collision_state().has_collision());
        assert_eq!(world.position(controller.entity()).unwrap(), Vec2::new(3.0, 4.0));
        assert_eq!(controller.velocity(), Vec2::new(6.0, 8.0));
    }

    #[test]
    fn test_wall_clips_horizontal_motion() {
        let mut world = PhysicsWorld::default();
        // Wall left edge at x = 10, character right edge at x = 5
        spawn_box(&mut world, Vec2::new(15.0, 0.0), Vec2::new(10.0, 40.0), ColliderConfig::default());
        let mut controller = controller_at(&mut world, Vec2::ZERO);

        controller.move_by(&mut world, Vec2::new(8.0, 0.0), DT).unwrap();

        assert!(controller.collision_state().right);
        assert!(!controller.collision_state().left);
        assert!((world.position(controller.entity()).unwrap().x - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_ceiling_stops_jump() {
        let mut world = PhysicsWorld::default();
        // Ceiling bottom edge at y = -12
        spawn_box(&mut world, Vec2::new(0.0, -17.0), Vec2::new(100.0, 10.0), ColliderConfig::default());
        let mut controller = controller_at(&mut world, Vec2::ZERO);

        controller.move_by(&mut world, Vec2::new(0.0, -20.0), DT).unwrap();

        assert!(controller.collision_state().above);
        assert!((world.position(controller.entity()).unwrap().y + 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_one_way_platform() {
        let mut world = PhysicsWorld::default();
        let one_way = ColliderConfig::default().with_layer(3);
        // Platform spans y = 10..14
        spawn_box(&mut world, Vec2::new(0.0, 12.0), Vec2::new(100.0, 4.0), one_way);

        let player = spawn_box(&mut world, Vec2::new(0.0, 25.0), Vec2::splat(10.0), ColliderConfig::default());
        let config = CharacterControllerConfig {
            one_way_platform_mask: layer_bit(3),
            ..CharacterControllerConfig::default()
        };
        let mut controller = CharacterController::new(&world, player, config).unwrap();

        // Jump up through it from below
        controller.move_by(&mut world, Vec2::new(0.0, -25.0), DT).unwrap();
        assert!(!controller.collision_state().above);
        assert_eq!(world.position(player).unwrap().y, 0.0);

        // Fall back onto it
        controller.move_by(&mut world, Vec2::new(0.0, 10.0), DT).unwrap();
        assert!(controller.is_grounded());
        assert!((world.position(player).unwrap().y - 5.0).abs() < 1e-3);

        // Drop through on request
        controller.ignore_one_way_platforms_for(0.25);
        controller.move_by(&mut world, Vec2::new(0.0, 10.0), DT).unwrap();
        assert!(!controller.is_grounded());
        assert!((world.position(player).unwrap().y - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_walks_up_gentle_slope() {
        let mut world = PhysicsWorld::default();
        let tan = 20f32.to_radians().tan();
        // Ramp rising to the right at 20 degrees
        let ramp = world.create_entity(Transform2D::IDENTITY);
        world
            .add_collider(
                ramp,
                ColliderShape::Polygon {
                    points: vec![
                        Vec2::new(0.0, 100.0),
                        Vec2::new(200.0, 100.0),
                        Vec2::new(200.0, 100.0 - 200.0 * tan),
                    ],
                },
                ColliderConfig::default(),
            )
            .unwrap();

        let mut controller = controller_at(&mut world, Vec2::new(100.0, 0.0));
        assert!(controller.warp_to_grounded(&mut world).unwrap());
        let start = world.position(controller.entity()).unwrap();

        controller.move_by(&mut world, Vec2::new(2.0, 1.0), DT).unwrap();

        let end = world.position(controller.entity()).unwrap();
        assert!(end.x > start.x + 1.0, "{start:?} -> {end:?}");
        assert!(end.y < start.y, "should climb: {start:?} -> {end:?}");
        assert!(controller.is_grounded());
        assert!(controller.collision_state().slope_angle < 0.0);
        assert_eq!(controller.velocity().y, 0.0);
    }

    fn spawn_polygon(world: &mut PhysicsWorld, points: Vec<Vec2>) {
        let entity = world.create_entity(Transform2D::IDENTITY);
        world
            .add_collider(entity, ColliderShape::Polygon { points }, ColliderConfig::default())
            .unwrap();
    }

    /// 200 wide ramp with its base on y = 100, high end on the left
    fn descending_ramp(world: &mut PhysicsWorld, degrees: f32) {
        let rise = 200.0 * degrees.to_radians().tan();
        spawn_polygon(
            world,
            vec![Vec2::new(0.0, 100.0 - rise), Vec2::new(0.0, 100.0), Vec2::new(200.0, 100.0)],
        );
    }

    /// 200 wide ramp with its base on y = 100, high end on the right
    fn ascending_ramp(world: &mut PhysicsWorld, degrees: f32) {
        let rise = 200.0 * degrees.to_radians().tan();
        spawn_polygon(
            world,
            vec![Vec2::new(0.0, 100.0), Vec2::new(200.0, 100.0), Vec2::new(200.0, 100.0 - rise)],
        );
    }

    #[test]
    fn test_walks_down_slope_with_speed_curve() {
        let mut world = PhysicsWorld::default();
        descending_ramp(&mut world, 20.0);

        let mut controller = controller_at(&mut world, Vec2::new(100.0, 0.0));
        assert!(controller.warp_to_grounded(&mut world).unwrap());
        let start = world.position(controller.entity()).unwrap();

        controller.move_by(&mut world, Vec2::new(2.0, 1.0), DT).unwrap();

        let state = *controller.collision_state();
        assert!(state.moving_down_slope);
        assert!(controller.is_grounded());
        assert!((state.slope_angle - 20.0).abs() < 1e-3, "{}", state.slope_angle);

        let moved = world.position(controller.entity()).unwrap() - start;
        let expected_x = 2.0 * SlopeSpeedCurve::default().evaluate(-20.0);
        assert!((moved.x - expected_x).abs() < 1e-3, "{moved:?}");
        // Follows the surface down instead of stepping off into the air
        assert!((moved.y - moved.x * 20f32.to_radians().tan()).abs() < 1e-3, "{moved:?}");
    }

    #[test]
    fn test_standing_still_on_slope_either_way() {
        for descending in [true, false] {
            let mut world = PhysicsWorld::default();
            if descending {
                descending_ramp(&mut world, 20.0);
            } else {
                ascending_ramp(&mut world, 20.0);
            }

            let mut controller = controller_at(&mut world, Vec2::new(100.0, 0.0));
            assert!(controller.warp_to_grounded(&mut world).unwrap());
            let start = world.position(controller.entity()).unwrap();

            controller.move_by(&mut world, Vec2::new(0.0, 1.0), DT).unwrap();

            let state = *controller.collision_state();
            assert!(!state.moving_down_slope, "descending: {descending}");
            assert_eq!(state.slope_angle, 0.0, "descending: {descending}");
            assert!(controller.is_grounded());
            let end = world.position(controller.entity()).unwrap();
            assert!((end - start).length() < 1e-3, "{start:?} -> {end:?}");
        }
    }

    #[test]
    fn test_steep_slope_blocks_like_a_wall() {
        let mut world = PhysicsWorld::default();
        // Ground top at y = 100, 60 degree ramp rising from x = 200
        spawn_box(&mut world, Vec2::new(150.0, 110.0), Vec2::new(500.0, 20.0), ColliderConfig::default());
        let rise = 100.0 * 60f32.to_radians().tan();
        spawn_polygon(
            &mut world,
            vec![Vec2::new(200.0, 100.0), Vec2::new(300.0, 100.0), Vec2::new(300.0, 100.0 - rise)],
        );

        let mut controller = controller_at(&mut world, Vec2::new(190.0, 95.0));
        assert!(controller.warp_to_grounded(&mut world).unwrap());

        controller.move_by(&mut world, Vec2::new(8.0, 1.0), DT).unwrap();

        let end = world.position(controller.entity()).unwrap();
        assert!((end - Vec2::new(190.0, 95.0)).length() < 1e-3, "{end:?}");
        assert!(controller.is_grounded());
        assert!(!controller.collision_state().moving_down_slope);
        assert!(controller.raycast_hits_this_frame().iter().any(|hit| hit.normal.x < 0.0));
    }

    #[test]
    fn test_collided_callback_sees_every_hit() {
        let mut world = PhysicsWorld::default();
        spawn_box(&mut world, Vec2::new(0.0, 17.0), Vec2::new(100.0, 10.0), ColliderConfig::default());
        let mut controller = controller_at(&mut world, Vec2::ZERO);

        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        controller.set_on_controller_collided(move |_| *counter.borrow_mut() += 1);

        controller.move_by(&mut world, Vec2::new(0.0, 10.0), DT).unwrap();
        assert!(!controller.raycast_hits_this_frame().is_empty());
        assert_eq!(*seen.borrow(), controller.raycast_hits_this_frame().len());
    }

    #[test]
    fn test_warp_gives_up_without_ground() {
        let mut world = PhysicsWorld::default();
        let mut controller = controller_at(&mut world, Vec2::ZERO);
        controller.config.warp_max_iterations = 5;

        assert!(!controller.warp_to_grounded(&mut world).unwrap());
        assert_eq!(world.position(controller.entity()).unwrap(), Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_slope_curve_interpolates_and_clamps() {
        let curve = SlopeSpeedCurve::default();
        assert_eq!(curve.evaluate(-180.0), 1.5);
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert!((curve.evaluate(45.0) - 0.5).abs() < 1e-6);
        assert!((curve.evaluate(-45.0) - 1.25).abs() < 1e-6);
        assert_eq!(curve.evaluate(120.0), 0.0);
        assert_eq!(SlopeSpeedCurve::new(Vec::new()).evaluate(10.0), 1.0);
    }
}
