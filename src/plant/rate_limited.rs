use crate::debug::{child_prefix, DebugSink};
use crate::plant::Plant;

/// Slews `current_target` toward `desired_target` at an asymmetric rate
/// per-second, forwarding the slewed value to `inner` (§4.C).
pub struct RateLimited {
    inner: Box<dyn Plant>,
    current_target: f64,
    desired_target: f64,
    max_up_per_sec: f64,
    max_down_per_sec: f64,
}

impl RateLimited {
    /// `max_up_per_sec`/`max_down_per_sec` must be non-negative.
    pub fn new(inner: Box<dyn Plant>, max_up_per_sec: f64, max_down_per_sec: f64) -> Self {
        debug_assert!(max_up_per_sec >= 0.0 && max_down_per_sec >= 0.0);
        let start = inner.get_target();
        Self {
            inner,
            current_target: start,
            desired_target: start,
            max_up_per_sec,
            max_down_per_sec,
        }
    }

    pub fn current_target(&self) -> f64 {
        self.current_target
    }
}

impl Plant for RateLimited {
    fn set_target(&mut self, target: f64) {
        self.desired_target = target;
    }

    fn get_target(&self) -> f64 {
        self.desired_target
    }

    fn update(&mut self, dt: f64) {
        let dt = dt.max(0.0);
        let max_up = self.max_up_per_sec * dt;
        let max_down = self.max_down_per_sec * dt;
        let delta = (self.desired_target - self.current_target).clamp(-max_down, max_up);
        self.current_target += delta;
        self.inner.set_target(self.current_target);
        self.inner.update(dt);
    }

    fn stop(&mut self) {
        self.inner.stop();
        self.current_target = self.inner.get_target();
        self.desired_target = self.current_target;
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
        sink.add_data(&child_prefix(prefix, "desired"), self.desired_target);
        sink.add_data(&child_prefix(prefix, "current"), self.current_target);
        self.inner.debug_dump(sink, &child_prefix(prefix, "inner"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::PowerOutput;
    use crate::plant::Power;

    struct NoOp;
    impl PowerOutput for NoOp {
        fn set_power(&mut self, _x: f64) {}
        fn stop(&mut self) {}
    }

    #[test]
    fn asymmetric_ramp_climbs_slower_than_it_descends() {
        // §8 scenario 3: set_target(1.0) then five updates at dt=0.1 with
        // max_up=1.0, max_down=2.0 -> 0.1, 0.2, 0.3, 0.4, 0.5.
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 1.0, 2.0);
        rl.set_target(1.0);
        let mut observed = vec![];
        for _ in 0..5 {
            rl.update(0.1);
            observed.push((rl.current_target() * 10.0).round() / 10.0);
        }
        assert_eq!(observed, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn bounded_step_up_and_down() {
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 2.0, 4.0);
        rl.set_target(10.0);
        let before = rl.current_target();
        rl.update(0.1);
        assert!((rl.current_target() - before).abs() <= 2.0 * 0.1 + 1e-12);

        rl.set_target(-10.0);
        let before = rl.current_target();
        rl.update(0.1);
        assert!((before - rl.current_target()).abs() <= 4.0 * 0.1 + 1e-12);
    }

    #[test]
    fn zero_dt_does_not_advance_current_toward_desired() {
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 1.0, 1.0);
        rl.set_target(5.0);
        for _ in 0..10 {
            rl.update(0.0);
        }
        assert_eq!(rl.current_target(), 0.0);
    }

    #[test]
    fn zero_max_delta_never_changes_current_target() {
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 0.0, 0.0);
        rl.set_target(1.0);
        for _ in 0..100 {
            rl.update(1.0);
        }
        assert_eq!(rl.current_target(), 0.0);
    }

    #[test]
    fn asymmetric_zero_up_allows_decrease_only() {
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 0.0, f64::INFINITY);
        rl.set_target(5.0);
        rl.update(1.0);
        assert_eq!(rl.current_target(), 0.0);

        rl.set_target(-5.0);
        rl.update(1.0);
        assert_eq!(rl.current_target(), -5.0);
    }

    #[test]
    fn stop_syncs_current_and_desired_to_inner_target() {
        let inner = Power::new(NoOp);
        let mut rl = RateLimited::new(Box::new(inner), 1.0, 1.0);
        rl.set_target(0.3);
        rl.update(0.1);
        rl.stop();
        assert_eq!(rl.current_target(), 0.0);
        assert_eq!(rl.get_target(), 0.0);
    }
}
