use crate::debug::{child_prefix, DebugSink};
use crate::hal::PositionOutput;
use crate::plant::Plant;

/// Open-loop servo-position plant, target in `[0, 1]`. Shape-identical to
/// [`Power`](super::Power) but over a [`PositionOutput`] and a different
/// target range convention (§4.B).
pub struct ServoPosition<O> {
    output: O,
    target: f64,
}

impl<O: PositionOutput> ServoPosition<O> {
    pub fn new(output: O) -> Self {
        Self { output, target: 0.0 }
    }
}

impl<O: PositionOutput> Plant for ServoPosition<O> {
    fn set_target(&mut self, target: f64) {
        self.target = target;
        self.output.set_position(target);
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
        true
    }

    fn has_feedback(&self) -> bool {
        false
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "target"), self.target);
    }
}
