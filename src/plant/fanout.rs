use crate::debug::{child_prefix, DebugSink};
use crate::plant::Plant;

struct Child {
    plant: Box<dyn Plant>,
    scale: f64,
    bias: f64,
}

/// Forwards `scale_i * target + bias_i` to each of `N >= 1` owned children.
/// `at_setpoint`/`has_feedback` are the AND across children; all children
/// are peers (§4.C).
pub struct Fanout {
    children: Vec<Child>,
    target: f64,
}

impl Fanout {
    /// `children` is `(plant, scale, bias)` tuples, at least one.
    pub fn new(children: Vec<(Box<dyn Plant>, f64, f64)>) -> Self {
        assert!(!children.is_empty(), "Fanout requires at least one child");
        Self {
            children: children
                .into_iter()
                .map(|(plant, scale, bias)| Child { plant, scale, bias })
                .collect(),
            target: 0.0,
        }
    }
}

impl Plant for Fanout {
    fn set_target(&mut self, target: f64) {
        self.target = target;
        for child in &mut self.children {
            child.plant.set_target(child.scale * target + child.bias);
        }
    }

    fn get_target(&self) -> f64 {
        self.target
    }

    fn update(&mut self, dt: f64) {
        for child in &mut self.children {
            child.plant.update(dt);
        }
    }

    fn stop(&mut self) {
        for child in &mut self.children {
            child.plant.stop();
        }
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.plant.reset();
        }
    }

    fn at_setpoint(&self) -> bool {
        self.children.iter().all(|c| c.plant.at_setpoint())
    }

    fn has_feedback(&self) -> bool {
        self.children.iter().all(|c| c.plant.has_feedback())
    }

    fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "target"), self.target);
        for (i, child) in self.children.iter().enumerate() {
            child
                .plant
                .debug_dump(sink, &child_prefix(prefix, &format!("child{i}")));
        }
    }
}
