//! # Brisk Core
//!
//! Foundational types shared by the Brisk crates:
//! - **Math**: `glam` re-exports, `RectangleF`, `Ray2D`, `Matrix2D` and scalar helpers
//! - **Entity**: generational entity handles and the 2D transform the physics layer reads
//! - **Time**: fixed-step accumulation for deterministic simulation ticks
//!
//! Coordinates are y-down (screen space): positive `y` points toward the bottom
//! of the screen, so gravity is usually a positive `y` value.

pub mod entity;
pub mod math;
pub mod time;

pub use entity::{Entity, Transform2D, TransformComponent};
pub use math::{Matrix2D, Ray2D, RectangleF, Vec2};
pub use time::{FixedStepClock, FixedTimeStep};
