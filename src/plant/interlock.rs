use crate::debug::{child_prefix, DebugSink};
use crate::plant::Plant;

/// Gates commands to `inner` by a boolean supplier. While the gate is
/// false, `blocked_target` is applied instead of the desired target
/// (§4.C). `get_target()` returns the last *applied* value, not the
/// desired one.
pub struct Interlock {
    inner: Box<dyn Plant>,
    condition: Box<dyn FnMut() -> bool>,
    blocked_target: f64,
    desired: f64,
    applied: f64,
}

impl Interlock {
    pub fn new(inner: Box<dyn Plant>, condition: Box<dyn FnMut() -> bool>, blocked_target: f64) -> Self {
        let start = inner.get_target();
        Self {
            inner,
            condition,
            blocked_target,
            desired: start,
            applied: start,
        }
    }
}

impl Plant for Interlock {
    fn set_target(&mut self, target: f64) {
        self.desired = target;
    }

    fn get_target(&self) -> f64 {
        self.applied
    }

    fn update(&mut self, dt: f64) {
        self.applied = if (self.condition)() { self.desired } else { self.blocked_target };
        self.inner.set_target(self.applied);
        self.inner.update(dt);
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn at_setpoint(&self) -> bool {
        self.inner.at_setpoint()
    }

    fn has_feedback(&self) -> bool {
        self.inner.has_feedback()
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "desired"), self.desired);
        sink.add_data(&child_prefix(prefix, "applied"), self.applied);
        self.inner.debug_dump(sink, &child_prefix(prefix, "inner"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PowerOutput;
    use crate::plant::Power;
    use std::cell::Cell;
    use std::rc::Rc;

    struct NoOp;
    impl PowerOutput for NoOp {
        fn set_power(&mut self, _x: f64) {}
        fn stop(&mut self) {}
    }

    #[test]
    fn blocked_target_applied_when_gate_false() {
        let gate = Rc::new(Cell::new(false));
        let gate_clone = gate.clone();
        let inner = Power::new(NoOp);
        let mut lock = Interlock::new(Box::new(inner), Box::new(move || gate_clone.get()), -1.0);
        lock.set_target(1.0);
        lock.update(0.1);
        assert_eq!(lock.get_target(), -1.0);

        gate.set(true);
        lock.update(0.1);
        assert_eq!(lock.get_target(), 1.0);
    }
}
