use crate::debug::{child_prefix, DebugSink};
use crate::hal::PositionOutput;
use crate::plant::Plant;

/// Feedback-capable motor-position plant. Holds an `offset` used to
/// re-zero the coordinate frame without touching the underlying output's
/// own origin (§4.B).
pub struct MotorPosition<O> {
    output: O,
    target: f64,
    offset: f64,
    tolerance: f64,
}

impl<O: PositionOutput> MotorPosition<O> {
    pub fn new(output: O, tolerance: f64) -> Self {
        Self { output, target: 0.0, offset: 0.0, tolerance }
    }
}

impl<O: PositionOutput> Plant for MotorPosition<O> {
    fn set_target(&mut self, target: f64) {
        self.target = target;
        self.output.set_position(target + self.offset);
    }

    fn get_target(&self) -> f64 {
        self.target
    }

    fn update(&mut self, _dt: f64) {}

    fn stop(&mut self) {
        self.output.stop();
    }

    /// Re-zeroes: stops the output and sets `offset := measured_position`,
    /// so the next `set_target(0)` commands the output back to here.
    fn reset(&mut self) {
        self.output.stop();
        self.offset = self.output.get_measured_position();
    }

    fn at_setpoint(&self) -> bool {
        let measured = self.output.get_measured_position();
        (measured - self.offset - self.target).abs() <= self.tolerance
    }

    fn has_feedback(&self) -> bool {
        true
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "target"), self.target);
        sink.add_data(&child_prefix(prefix, "offset"), self.offset);
        sink.add_data(
            &child_prefix(prefix, "measured"),
            self.output.get_measured_position(),
        );
        sink.add_data(
            &child_prefix(prefix, "at_setpoint"),
            if self.at_setpoint() { 1.0 } else { 0.0 },
        );
    }
}

/// Default tolerance in native units when the builder stage isn't given one
/// explicitly (§4.D).
pub const DEFAULT_POSITION_TOLERANCE: f64 = 10.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeOutput {
        commanded: f64,
        measured: f64,
        stopped: bool,
    }

    impl PositionOutput for FakeOutput {
        fn set_position(&mut self, x: f64) {
            self.commanded = x;
        }
        fn get_measured_position(&self) -> f64 {
            self.measured
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[test]
    fn at_setpoint_within_tolerance() {
        let mut m = MotorPosition::new(FakeOutput::default(), 10.0);
        m.set_target(100.0);
        m.output.measured = 95.0;
        assert!(m.at_setpoint());
        m.output.measured = 80.0;
        assert!(!m.at_setpoint());
    }

    #[test]
    fn reset_rezeroes_at_measurement() {
        let mut m = MotorPosition::new(FakeOutput::default(), 5.0);
        m.output.measured = 500.0;
        m.reset();
        assert!(m.output.stopped);
        m.set_target(0.0);
        assert_eq!(m.output.commanded, 500.0);
        assert!(m.at_setpoint());
    }

    #[test]
    fn boundary_tolerance_inclusive() {
        let mut m = MotorPosition::new(FakeOutput::default(), 10.0);
        m.set_target(0.0);
        m.output.measured = 10.0;
        assert!(m.at_setpoint());
        m.output.measured = 10.0001;
        assert!(!m.at_setpoint());
    }
}
