use crate::debug::{child_prefix, DebugSink};
use crate::hal::PowerOutput;
use crate::plant::Plant;

/// Open-loop power plant. Forwards `set_target` straight to the output;
/// `update` is a no-op and `at_setpoint` is always `true`. The caller is
/// responsible for normalizing the target into `[-1, 1]`; this plant does
/// no clamping of its own beyond whatever the underlying output does.
pub struct Power<O> {
    output: O,
    target: f64,
}

impl<O: PowerOutput> Power<O> {
    pub fn new(output: O) -> Self {
        Self { output, target: 0.0 }
    }
}

impl<O: PowerOutput> Plant for Power<O> {
    fn set_target(&mut self, target: f64) {
        self.target = target;
        self.output.set_power(target);
    }

    fn get_target(&self) -> f64 {
        self.target
    }

    fn update(&mut self, _dt: f64) {}

    fn stop(&mut self) {
        self.target = 0.0;
        self.output.stop();
    }

    fn reset(&mut self) {}

    fn at_setpoint(&self) -> bool {
        true
    }

    fn has_feedback(&self) -> bool {
        false
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "target"), self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeOutput {
        power: f64,
        stopped: bool,
    }

    impl PowerOutput for FakeOutput {
        fn set_power(&mut self, x: f64) {
            self.power = x;
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[test]
    fn forwards_target_immediately() {
        let mut p = Power::new(FakeOutput::default());
        p.set_target(0.5);
        assert_eq!(p.output.power, 0.5);
        assert_eq!(p.get_target(), 0.5);
    }

    #[test]
    fn no_feedback_always_at_setpoint() {
        let p = Power::new(FakeOutput::default());
        assert!(!p.has_feedback());
        assert!(p.at_setpoint());
    }

    #[test]
    fn repeated_identical_set_target_is_idempotent() {
        let mut p = Power::new(FakeOutput::default());
        p.set_target(0.3);
        p.set_target(0.3);
        assert_eq!(p.get_target(), 0.3);
    }

    #[test]
    fn stop_zeroes_target_and_calls_output_stop() {
        let mut p = Power::new(FakeOutput::default());
        p.set_target(1.0);
        p.stop();
        assert_eq!(p.get_target(), 0.0);
        assert!(p.output.stopped);
    }

    #[test]
    fn update_with_zero_dt_leaves_target_unchanged() {
        let mut p = Power::new(FakeOutput::default());
        p.set_target(0.7);
        for _ in 0..10 {
            p.update(0.0);
        }
        assert_eq!(p.get_target(), 0.7);
    }
}
