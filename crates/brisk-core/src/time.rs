//! Time Management
//!
//! Fixed-step simulation support. Physics is advanced in whole ticks of a
//! constant size; a frame's wall-clock delta is accumulated and drained one
//! tick at a time.

use serde::{Deserialize, Serialize};

/// Fixed time step configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedTimeStep {
    /// Fixed timestep in seconds
    pub step: f64,
    /// Maximum number of fixed updates per frame (to prevent spiral of death)
    pub max_updates: u32,
}

impl Default for FixedTimeStep {
    fn default() -> Self {
        Self {
            step: 1.0 / 60.0, // 60 Hz
            max_updates: 8,
        }
    }
}

impl FixedTimeStep {
    /// Create a new fixed time step with the given frequency
    pub fn from_hz(hz: f64) -> Self {
        Self {
            step: 1.0 / hz,
            max_updates: 8,
        }
    }

    /// Set the maximum number of updates per frame
    pub fn with_max_updates(mut self, max: u32) -> Self {
        self.max_updates = max;
        self
    }

    /// Step size as f32 for the simulation
    pub fn step_f32(&self) -> f32 {
        self.step as f32
    }
}

/// Accumulates frame time and hands out fixed ticks
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    config: FixedTimeStep,
    /// Accumulated time not yet consumed by ticks
    accumulator: f64,
    /// Ticks run so far
    tick_count: u64,
}

impl FixedStepClock {
    pub fn new(config: FixedTimeStep) -> Self {
        Self {
            config,
            accumulator: 0.0,
            tick_count: 0,
        }
    }

    pub fn config(&self) -> &FixedTimeStep {
        &self.config
    }

    /// Add a frame's delta and return how many fixed ticks should run.
    /// Time beyond `max_updates` ticks is dropped.
    pub fn advance(&mut self, delta_time: f64) -> u32 {
        self.accumulator += delta_time.max(0.0);

        let mut ticks = 0;
        while self.accumulator >= self.config.step && ticks < self.config.max_updates {
            self.accumulator -= self.config.step;
            ticks += 1;
        }

        if ticks == self.config.max_updates {
            self.accumulator = self.accumulator.min(self.config.step);
        }

        self.tick_count += u64::from(ticks);
        ticks
    }

    /// Interpolation factor between the last tick and the next one
    pub fn interpolation(&self) -> f64 {
        (self.accumulator / self.config.step).clamp(0.0, 1.0)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(FixedTimeStep::default())
    }
}
