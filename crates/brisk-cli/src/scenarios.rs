//! Headless scenarios
//!
//! Each scenario builds a small level, drives it at the configured fixed
//! tick and returns a report of where things ended up and what happened on
//! the way.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{bail, Result};
use brisk_core::{FixedStepClock, FixedTimeStep};
use brisk_physics::prelude::*;
use brisk_physics::layer_bit;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Everything a scenario run can be configured with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub controller: CharacterControllerConfig,
    pub time_step: FixedTimeStep,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step.step > 0.0) {
            bail!("time_step.step must be positive, got {}", self.time_step.step);
        }
        if self.time_step.max_updates == 0 {
            bail!("time_step.max_updates must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Character controller running over ground, a ramp and a one-way platform
    Platformer,
    /// Arcade rigidbodies dropped onto the ground and each other
    Rigidbodies,
    /// Projectile movers fired at a column of targets
    Projectiles,
    /// A mover walking through trigger zones into a wall
    Triggers,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodyReport {
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub ticks: u64,
    pub bodies: Vec<BodyReport>,
    pub events: Vec<String>,
}

impl ScenarioReport {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            ticks: 0,
            bodies: Vec::new(),
            events: Vec::new(),
        }
    }

    fn body(&mut self, name: impl Into<String>, position: Vec2, velocity: Vec2) {
        self.bodies.push(BodyReport {
            name: name.into(),
            position,
            velocity,
        });
    }

    fn event(&mut self, tick: u64, message: String) {
        log::debug!("[{tick}] {message}");
        self.events.push(format!("tick {tick}: {message}"));
    }
}

pub fn run(scenario: Scenario, config: &SimulationConfig, ticks: u64, fps: f64) -> Result<ScenarioReport> {
    config.validate()?;
    log::info!("Running {:?} for {} ticks", scenario, ticks);

    match scenario {
        Scenario::Platformer => platformer(config, ticks, fps),
        Scenario::Rigidbodies => rigidbodies(config, ticks, fps),
        Scenario::Projectiles => projectiles(config, ticks, fps),
        Scenario::Triggers => triggers(config, ticks, fps),
    }
}

/// Feed frames of `1 / fps` seconds through a fixed-step clock and run
/// `step` once per tick until `ticks` have run
fn drive(time_step: FixedTimeStep, ticks: u64, fps: f64, mut step: impl FnMut(u64, f32) -> Result<()>) -> Result<u64> {
    let mut clock = FixedStepClock::new(time_step);
    let frame_time = 1.0 / fps.max(1.0);
    let dt = time_step.step_f32();

    let mut tick = 0;
    while tick < ticks {
        for _ in 0..clock.advance(frame_time) {
            if tick >= ticks {
                break;
            }
            step(tick, dt)?;
            tick += 1;
        }
    }
    Ok(tick)
}

fn spawn_box(world: &mut PhysicsWorld, center: Vec2, size: Vec2, config: ColliderConfig) -> Result<(Entity, ColliderId)> {
    let entity = world.create_entity(Transform2D::from_position(center));
    let collider = world.add_collider(
        entity,
        ColliderShape::Box {
            width: size.x,
            height: size.y,
        },
        config,
    )?;
    Ok((entity, collider))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerKind {
    Enter,
    Exit,
}

/// Collects trigger callbacks so the scenario can report them by name
#[derive(Clone, Default)]
struct TriggerLog(Rc<RefCell<Vec<(TriggerKind, ColliderId, ColliderId)>>>);

impl TriggerLog {
    fn drain(&self) -> Vec<(TriggerKind, ColliderId, ColliderId)> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl TriggerListener for TriggerLog {
    fn on_trigger_enter(&mut self, other: ColliderId, local: ColliderId) {
        self.0.borrow_mut().push((TriggerKind::Enter, other, local));
    }

    fn on_trigger_exit(&mut self, other: ColliderId, local: ColliderId) {
        self.0.borrow_mut().push((TriggerKind::Exit, other, local));
    }
}

const ONE_WAY_LAYER: u32 = 1;
const RUN_SPEED: f32 = 120.0;
const JUMP_HEIGHT: f32 = 40.0;
const JUMP_INTERVAL: u64 = 90;
const RAMP_ANGLE: f32 = 20.0;

fn platformer(config: &SimulationConfig, ticks: u64, fps: f64) -> Result<ScenarioReport> {
    let mut world = PhysicsWorld::new(config.physics.clone());
    let mut report = ScenarioReport::new(Scenario::Platformer);

    // Ground top at y = 200, walls at both ends
    spawn_box(&mut world, Vec2::new(200.0, 210.0), Vec2::new(600.0, 20.0), ColliderConfig::default())?;
    spawn_box(&mut world, Vec2::new(-110.0, 150.0), Vec2::new(20.0, 200.0), ColliderConfig::default())?;
    spawn_box(&mut world, Vec2::new(510.0, 150.0), Vec2::new(20.0, 200.0), ColliderConfig::default())?;
    spawn_box(
        &mut world,
        Vec2::new(100.0, 160.0),
        Vec2::new(80.0, 4.0),
        ColliderConfig::default().with_layer(ONE_WAY_LAYER),
    )?;

    let ramp = world.create_entity(Transform2D::IDENTITY);
    let rise = 150.0 * RAMP_ANGLE.to_radians().tan();
    world.add_collider(
        ramp,
        ColliderShape::Polygon {
            points: vec![
                Vec2::new(250.0, 200.0),
                Vec2::new(400.0, 200.0),
                Vec2::new(400.0, 200.0 - rise),
            ],
        },
        ColliderConfig::default(),
    )?;

    let (player, _) = spawn_box(&mut world, Vec2::new(0.0, 100.0), Vec2::new(12.0, 16.0), ColliderConfig::default())?;
    let mut controller_config = config.controller.clone();
    controller_config.one_way_platform_mask |= layer_bit(ONE_WAY_LAYER);
    let mut controller = CharacterController::new(&world, player, controller_config)?;

    if !controller.warp_to_grounded(&mut world)? {
        log::warn!("Player never found the ground");
    }
    report.event(0, format!("spawned at {}", world.position(player)?));

    let gravity = world.gravity().y;
    let jump_speed = (2.0 * JUMP_HEIGHT * gravity.abs()).sqrt();
    let mut direction = 1.0;
    let mut velocity = Vec2::ZERO;

    let ran = drive(config.time_step, ticks, fps, |tick, dt| {
        if controller.is_grounded() {
            velocity.y = 0.0;
            if tick > 0 && tick % JUMP_INTERVAL == 0 {
                velocity.y = -jump_speed;
                report.event(tick, "jump".to_string());
            }
        }
        velocity.x = RUN_SPEED * direction;
        velocity.y += gravity * dt;

        controller.move_by(&mut world, velocity * dt, dt)?;
        velocity = controller.velocity();

        let state = *controller.collision_state();
        if state.became_grounded_this_frame {
            report.event(tick, format!("landed at {}", world.position(player)?));
        }
        if (direction > 0.0 && state.right) || (direction < 0.0 && state.left) {
            direction = -direction;
            report.event(tick, "turned around".to_string());
        }
        Ok(())
    })?;
    report.ticks = ran;

    report.body("player", world.position(player)?, controller.velocity());
    Ok(report)
}

fn rigidbodies(config: &SimulationConfig, ticks: u64, fps: f64) -> Result<ScenarioReport> {
    let mut world = PhysicsWorld::new(config.physics.clone());
    let mut report = ScenarioReport::new(Scenario::Rigidbodies);

    // Static ground, top at y = 190
    spawn_box(&mut world, Vec2::new(0.0, 200.0), Vec2::new(400.0, 20.0), ColliderConfig::default())?;

    let mut bodies = Vec::new();
    for (i, (mass, elasticity)) in [(1.0, 0.9), (5.0, 0.5), (10.0, 0.2), (20.0, 0.0)].into_iter().enumerate() {
        let x = -120.0 + i as f32 * 80.0;
        let (entity, _) = spawn_box(&mut world, Vec2::new(x, 20.0 * i as f32), Vec2::splat(16.0), ColliderConfig::default())?;
        world.add_rigidbody(
            entity,
            ArcadeRigidbody::new().with_mass(mass).with_elasticity(elasticity),
        )?;
        bodies.push((format!("box mass {mass}"), entity));
    }

    // A ball that lands on an immovable shelf
    let (shelf, _) = spawn_box(&mut world, Vec2::new(150.0, 120.0), Vec2::new(40.0, 8.0), ColliderConfig::default())?;
    world.add_rigidbody(shelf, ArcadeRigidbody::new().with_mass(0.0))?;
    bodies.push(("shelf".to_string(), shelf));

    let ball = world.create_entity(Transform2D::from_position(Vec2::new(150.0, 0.0)));
    world.add_collider(ball, ColliderShape::Circle { radius: 8.0 }, ColliderConfig::default())?;
    world.add_rigidbody(ball, ArcadeRigidbody::new().with_mass(2.0).with_elasticity(0.6))?;
    bodies.push(("ball".to_string(), ball));

    let mut resting = vec![false; bodies.len()];
    let ran = drive(config.time_step, ticks, fps, |tick, dt| {
        world.update_rigidbodies(dt)?;

        for (i, (name, entity)) in bodies.iter().enumerate() {
            let speed = world.rigidbody(*entity).map_or(0.0, |body| body.velocity.length());
            let now_resting = speed < 1.0;
            if now_resting && !resting[i] && tick > 0 {
                report.event(tick, format!("{name} came to rest at {}", world.position(*entity)?));
            }
            resting[i] = now_resting;
        }
        Ok(())
    })?;
    report.ticks = ran;

    for (name, entity) in bodies {
        let velocity = world.rigidbody(entity).map_or(Vec2::ZERO, |body| body.velocity);
        report.body(name, world.position(entity)?, velocity);
    }
    Ok(report)
}

const BULLET_SPEED: f32 = 600.0;
const FIRE_INTERVAL: u64 = 15;

fn projectiles(config: &SimulationConfig, ticks: u64, fps: f64) -> Result<ScenarioReport> {
    let mut world = PhysicsWorld::new(config.physics.clone());
    let mut report = ScenarioReport::new(Scenario::Projectiles);

    let hits = TriggerLog::default();
    let mut names = HashMap::new();
    let rows = [50.0, 100.0, 150.0];
    for (i, y) in rows.iter().enumerate() {
        let (target, collider) = spawn_box(&mut world, Vec2::new(300.0, *y), Vec2::splat(20.0), ColliderConfig::default())?;
        world.add_trigger_listener(target, hits.clone())?;
        names.insert(collider, format!("target {i}"));
    }

    let mut bullets: Vec<ProjectileMover> = Vec::new();
    let mut fired = 0usize;
    let ran = drive(config.time_step, ticks, fps, |tick, dt| {
        if tick % FIRE_INTERVAL == 0 {
            let y = rows[fired % rows.len()];
            let (bullet, _) = spawn_box(&mut world, Vec2::new(0.0, y), Vec2::splat(4.0), ColliderConfig::default())?;
            bullets.push(ProjectileMover::new(bullet));
            fired += 1;
        }

        let mut spent = Vec::new();
        for (i, bullet) in bullets.iter().enumerate() {
            if bullet.move_by(&mut world, Vec2::new(BULLET_SPEED * dt, 0.0))? {
                spent.push(i);
            }
        }
        for i in spent.into_iter().rev() {
            let bullet = bullets.swap_remove(i);
            world.destroy_entity(bullet.entity())?;
        }

        for (_, _, target) in hits.drain() {
            let name = names.get(&target).map_or("unknown", String::as_str);
            report.event(tick, format!("{name} hit"));
        }
        Ok(())
    })?;
    report.ticks = ran;

    report.event(report.ticks, format!("{fired} fired, {} still in flight", bullets.len()));
    for bullet in &bullets {
        report.body("bullet", world.position(bullet.entity())?, Vec2::new(BULLET_SPEED, 0.0));
    }
    Ok(report)
}

const WALK_SPEED: f32 = 120.0;

fn triggers(config: &SimulationConfig, ticks: u64, fps: f64) -> Result<ScenarioReport> {
    let mut world = PhysicsWorld::new(config.physics.clone());
    let mut report = ScenarioReport::new(Scenario::Triggers);

    let mut names = HashMap::new();
    for (i, x) in [60.0, 140.0, 220.0].into_iter().enumerate() {
        let (_, zone) = spawn_box(&mut world, Vec2::new(x, 0.0), Vec2::splat(30.0), ColliderConfig::trigger())?;
        names.insert(zone, format!("zone {i}"));
    }
    let (_, wall) = spawn_box(&mut world, Vec2::new(300.0, 0.0), Vec2::new(20.0, 60.0), ColliderConfig::default())?;
    names.insert(wall, "wall".to_string());

    let (walker, _) = spawn_box(&mut world, Vec2::ZERO, Vec2::splat(10.0), ColliderConfig::default())?;
    let log = TriggerLog::default();
    world.add_trigger_listener(walker, log.clone())?;
    let mut mover = Mover::new(walker);

    let mut blocked = false;
    let ran = drive(config.time_step, ticks, fps, |tick, dt| {
        let hit = mover.move_by(&mut world, Vec2::new(WALK_SPEED * dt, 0.0))?;
        if let Some(hit) = hit.filter(|_| !blocked) {
            let name = hit.collider.and_then(|id| names.get(&id)).map_or("unknown", String::as_str);
            report.event(tick, format!("blocked by {name}"));
            blocked = true;
        }

        for (kind, other, _) in log.drain() {
            let name = names.get(&other).map_or("unknown", String::as_str);
            let verb = match kind {
                TriggerKind::Enter => "entered",
                TriggerKind::Exit => "left",
            };
            report.event(tick, format!("{verb} {name}"));
        }
        Ok(())
    })?;
    report.ticks = ran;

    report.body("walker", world.position(walker)?, Vec2::new(WALK_SPEED, 0.0));
    Ok(report)
}
