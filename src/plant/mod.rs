//! Setpoint-driven actuator wrappers (§3 "Plant (capability)", §4.B–D).

mod builder;
mod fanout;
mod interlock;
mod motor_position;
mod motor_velocity;
mod power;
mod rate_limited;
mod servo;

pub use builder::*;
pub use fanout::Fanout;
pub use interlock::Interlock;
pub use motor_position::MotorPosition;
pub use motor_velocity::MotorVelocity;
pub use power::Power;
pub use rate_limited::RateLimited;
pub use servo::ServoPosition;

use crate::debug::DebugSink;

/// A single actuator (or composed group) with one scalar target.
///
/// `set_target` is cheap and idempotent on repeated identical calls.
/// `has_feedback == false` implies `at_setpoint()` always returns `true`
/// (set-and-hold semantics); `has_feedback == true` implies `at_setpoint()`
/// meaningfully compares measurement against target within tolerance.
pub trait Plant {
    fn set_target(&mut self, target: f64);
    fn get_target(&self) -> f64;
    fn update(&mut self, dt: f64);
    fn stop(&mut self);
    /// Re-zeroes the internal coordinate frame at the current measurement,
    /// where applicable. A no-op for plants without feedback.
    fn reset(&mut self);
    fn at_setpoint(&self) -> bool;
    fn has_feedback(&self) -> bool;

    /// Default no-op; components that want cycle-safe telemetry override
    /// this (§4.K).
    fn debug_dump(&self, _sink: &mut dyn DebugSink, _prefix: &str) {}
}
