use crate::debug::{child_prefix, DebugSink};
use crate::hal::VelocityOutput;
use crate::plant::Plant;

/// Feedback-capable motor-velocity plant. Closed loop lives in the output
/// (the host's SDK); `update` has nothing to do here (§4.B).
pub struct MotorVelocity<O> {
    output: O,
    target: f64,
    tolerance: f64,
}

impl<O: VelocityOutput> MotorVelocity<O> {
    pub fn new(output: O, tolerance: f64) -> Self {
        Self { output, target: 0.0, tolerance }
    }
}

impl<O: VelocityOutput> Plant for MotorVelocity<O> {
    fn set_target(&mut self, target: f64) {
        self.target = target;
        self.output.set_velocity(target);
    }

    fn get_target(&self) -> f64 {
        self.target
    }

    fn update(&mut self, _dt: f64) {}

    fn stop(&mut self) {
        self.output.stop();
    }

    fn reset(&mut self) {}

    fn at_setpoint(&self) -> bool {
        (self.output.get_measured_velocity() - self.target).abs() <= self.tolerance
    }

    fn has_feedback(&self) -> bool {
        true
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "target"), self.target);
        sink.add_data(
            &child_prefix(prefix, "measured"),
            self.output.get_measured_velocity(),
        );
    }
}

/// Default tolerance in native units when the builder stage isn't given one
/// explicitly (§4.D).
pub const DEFAULT_VELOCITY_TOLERANCE: f64 = 100.0;
