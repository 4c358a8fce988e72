//! Damped-spring integrator for window slides.
//!
//! Offsets are always measured from the window's on-screen anchor, so the
//! rendered position is `anchor + offset` whichever way the window travels.

use std::ops::RangeInclusive;

/// Fraction of the remaining distance added to the velocity each sub-step.
const ACCELERATION: f32 = 0.15;
const DAMPING_GAIN: f32 = 1.5;
const MIN_DAMPING: f32 = 0.5;
const MAX_DAMPING: f32 = 5.0;
/// Settled once every axis is closer than this...
const DISTANCE_EPSILON: f32 = 0.1;
/// ...and slower than this.
const VELOCITY_EPSILON: f32 = 0.2;
/// Converts milliseconds into integrator time units.
const MS_TO_UNITS: f32 = 0.05;

pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=50.0;
/// Sub-steps longer than this overshoot and the spring stops settling.
pub const TIMESTEP_RANGE: RangeInclusive<f32> = 0.1..=10.0;
/// Longest stretch of time a single paint tick advances.
pub const MAX_TICK_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moving,
    Settled,
}

/// Animated displacement of one window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trajectory {
    pub tx: f32,
    pub ty: f32,
    pub x_velocity: f32,
    pub y_velocity: f32,
}

impl Trajectory {
    /// Update the velocity towards `goal` (an offset from the anchor). On
    /// settling, the velocity is zeroed and the offset snapped to `goal`.
    pub fn adjust_velocity(&mut self, goal: (f32, f32)) -> Step {
        let dx = goal.0 - self.tx;
        let dy = goal.1 - self.ty;

        self.x_velocity = damped_velocity(dx, self.x_velocity);
        self.y_velocity = damped_velocity(dy, self.y_velocity);

        if dx.abs() < DISTANCE_EPSILON
            && self.x_velocity.abs() < VELOCITY_EPSILON
            && dy.abs() < DISTANCE_EPSILON
            && self.y_velocity.abs() < VELOCITY_EPSILON
        {
            self.x_velocity = 0.0;
            self.y_velocity = 0.0;
            self.tx = goal.0;
            self.ty = goal.1;
            return Step::Settled;
        }
        Step::Moving
    }

    pub fn advance(&mut self, chunk: f32) {
        self.tx += self.x_velocity * chunk;
        self.ty += self.y_velocity * chunk;
    }

    /// One sub-step: velocity update, then move by `chunk`.
    pub fn step(&mut self, goal: (f32, f32), chunk: f32) -> Step {
        let step = self.adjust_velocity(goal);
        self.advance(chunk);
        step
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn damped_velocity(delta: f32, velocity: f32) -> f32 {
    let accel = delta * ACCELERATION;
    let damping = (delta.abs() * DAMPING_GAIN).clamp(MIN_DAMPING, MAX_DAMPING);
    (damping * velocity + accel) / (damping + 1.0)
}

/// Sub-step schedule for one paint tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickBudget {
    pub steps: u32,
    pub chunk: f32,
}

/// Split `ms` of elapsed time into fixed-size sub-steps of about
/// `timestep / 2` units each (at least one). Speed, timestep and elapsed
/// time are clamped to their supported ranges first.
pub fn tick_budget(ms_since_last_paint: u32, speed: f32, timestep: f32) -> TickBudget {
    let speed = speed.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end());
    let timestep = timestep.clamp(*TIMESTEP_RANGE.start(), *TIMESTEP_RANGE.end());
    let amount = ms_since_last_paint.min(MAX_TICK_MS) as f32 * MS_TO_UNITS * speed;
    let steps = (amount / (0.5 * timestep)) as u32;
    let steps = steps.max(1);
    TickBudget {
        steps,
        chunk: amount / steps as f32,
    }
}
