//! Staged, type-safe plant construction (§4.D). Each stage only exposes the
//! operations valid from it: a positional-servo stage has no `.velocity()`
//! method at all, so the motor/servo/cr-servo × power/velocity/position
//! matrix from §4.D is enforced by the type checker rather than at
//! runtime, per the "staged builder" design note in §9.

use crate::error::{BuildError, BuildResult};
use crate::hal::{PositionOutput, PowerOutput, VelocityOutput};
use crate::plant::fanout::Fanout;
use crate::plant::interlock::Interlock;
use crate::plant::motor_position::{MotorPosition, DEFAULT_POSITION_TOLERANCE};
use crate::plant::motor_velocity::{MotorVelocity, DEFAULT_VELOCITY_TOLERANCE};
use crate::plant::power::Power;
use crate::plant::rate_limited::RateLimited;
use crate::plant::servo::ServoPosition;
use crate::plant::Plant;

struct Tuned<T> {
    handle: T,
    scale: f64,
    bias: f64,
}

fn start_element<T>(handle: T, reversed: bool) -> Tuned<T> {
    Tuned { handle, scale: if reversed { -1.0 } else { 1.0 }, bias: 0.0 }
}

/// Entry point: pick which kind of hardware this plant wraps.
pub struct PlantBuilder;

impl PlantBuilder {
    pub fn motor<M>(handle: M) -> MotorStage<M> {
        MotorStage { elements: vec![start_element(handle, false)] }
    }

    pub fn positional_servo<S>(handle: S) -> ServoStage<S> {
        ServoStage { elements: vec![start_element(handle, false)] }
    }

    pub fn continuous_servo<C>(handle: C) -> CrServoStage<C> {
        CrServoStage { elements: vec![start_element(handle, false)] }
    }
}

/// Shared tuning methods applied to the last-added element of a group,
/// shared by all three hardware stages.
macro_rules! tuning_methods {
    ($stage:ident) => {
        impl<T> $stage<T> {
            /// Adds another element of the same kind to the group. After
            /// the second element, `.scale`/`.bias`/`.tune` apply to this
            /// newest one.
            pub fn and_same_kind(mut self, handle: T, reversed: bool) -> Self {
                self.elements.push(start_element(handle, reversed));
                self
            }

            pub fn scale(mut self, scale: f64) -> Self {
                self.elements.last_mut().expect("group never empty").scale = scale;
                self
            }

            pub fn bias(mut self, bias: f64) -> Self {
                self.elements.last_mut().expect("group never empty").bias = bias;
                self
            }

            pub fn tune(mut self, scale: f64, bias: f64) -> Self {
                let last = self.elements.last_mut().expect("group never empty");
                last.scale = scale;
                last.bias = bias;
                self
            }
        }
    };
}

pub struct MotorStage<M> {
    elements: Vec<Tuned<M>>,
}
tuning_methods!(MotorStage);

pub struct ServoStage<S> {
    elements: Vec<Tuned<S>>,
}
tuning_methods!(ServoStage);

pub struct CrServoStage<C> {
    elements: Vec<Tuned<C>>,
}
tuning_methods!(CrServoStage);

fn validate_non_negative(field: &'static str, value: f64) -> BuildResult<()> {
    if value < 0.0 {
        return Err(BuildError::InvalidConfig {
            field,
            reason: format!("must be non-negative, got {value}"),
        });
    }
    Ok(())
}

/// A motor (or motor group) supports all three control modes.
impl<M> MotorStage<M>
where
    M: PowerOutput + PositionOutput + VelocityOutput + 'static,
{
    pub fn power(self) -> ModifierStage {
        let plants: Vec<(Box<dyn Plant>, f64, f64)> = self
            .elements
            .into_iter()
            .map(|t| (Box::new(Power::new(t.handle)) as Box<dyn Plant>, t.scale, t.bias))
            .collect();
        ModifierStage::from_children(plants)
    }

    pub fn velocity(self, tolerance: Option<f64>) -> BuildResult<ModifierStage> {
        let tolerance = tolerance.unwrap_or(DEFAULT_VELOCITY_TOLERANCE);
        validate_non_negative("velocity tolerance", tolerance)?;
        let plants: Vec<(Box<dyn Plant>, f64, f64)> = self
            .elements
            .into_iter()
            .map(|t| {
                (Box::new(MotorVelocity::new(t.handle, tolerance)) as Box<dyn Plant>, t.scale, t.bias)
            })
            .collect();
        Ok(ModifierStage::from_children(plants))
    }

    pub fn position(self, tolerance: Option<f64>) -> BuildResult<ModifierStage> {
        let tolerance = tolerance.unwrap_or(DEFAULT_POSITION_TOLERANCE);
        validate_non_negative("position tolerance", tolerance)?;
        let plants: Vec<(Box<dyn Plant>, f64, f64)> = self
            .elements
            .into_iter()
            .map(|t| {
                (Box::new(MotorPosition::new(t.handle, tolerance)) as Box<dyn Plant>, t.scale, t.bias)
            })
            .collect();
        Ok(ModifierStage::from_children(plants))
    }
}

/// A servo (or servo group) only ever supports `.position()`.
impl<S> ServoStage<S>
where
    S: PositionOutput + 'static,
{
    pub fn position(self) -> ModifierStage {
        let plants: Vec<(Box<dyn Plant>, f64, f64)> = self
            .elements
            .into_iter()
            .map(|t| (Box::new(ServoPosition::new(t.handle)) as Box<dyn Plant>, t.scale, t.bias))
            .collect();
        ModifierStage::from_children(plants)
    }
}

/// A continuous-rotation servo (or group) only ever supports `.power()`.
impl<C> CrServoStage<C>
where
    C: PowerOutput + 'static,
{
    pub fn power(self) -> ModifierStage {
        let plants: Vec<(Box<dyn Plant>, f64, f64)> = self
            .elements
            .into_iter()
            .map(|t| (Box::new(Power::new(t.handle)) as Box<dyn Plant>, t.scale, t.bias))
            .collect();
        ModifierStage::from_children(plants)
    }
}

/// Optional modifiers, then `build()`.
pub struct ModifierStage {
    plant: Box<dyn Plant>,
}

impl ModifierStage {
    fn from_children(mut plants: Vec<(Box<dyn Plant>, f64, f64)>) -> Self {
        if plants.len() == 1 {
            let (plant, scale, bias) = plants.pop().unwrap();
            // A lone element with non-identity tuning still needs the
            // scale/bias applied; reuse Fanout's semantics rather than
            // special-casing, since a 1-element fan-out is just a plant.
            if scale == 1.0 && bias == 0.0 {
                return Self { plant };
            }
            return Self { plant: Box::new(Fanout::new(vec![(plant, scale, bias)])) };
        }
        Self { plant: Box::new(Fanout::new(plants)) }
    }

    /// Symmetric slew limit.
    pub fn rate_limit(self, max_delta_per_sec: f64) -> BuildResult<Self> {
        self.rate_limit_asymmetric(max_delta_per_sec, max_delta_per_sec)
    }

    /// Asymmetric slew limit: `up`/`down` in target units per second.
    pub fn rate_limit_asymmetric(self, up: f64, down: f64) -> BuildResult<Self> {
        validate_non_negative("rate_limit up", up)?;
        validate_non_negative("rate_limit down", down)?;
        Ok(Self { plant: Box::new(RateLimited::new(self.plant, up, down)) })
    }

    /// Gates every `set_target` behind `condition`: while `condition()` is
    /// false, `blocked_target` is forwarded to the inner plant instead of
    /// the caller's desired target. Decorators stack inside-out, so an
    /// interlock added after a rate limit gates the limiter's output, and
    /// one added before gates its input.
    pub fn interlock(self, condition: impl FnMut() -> bool + 'static, blocked_target: f64) -> Self {
        Self { plant: Box::new(Interlock::new(self.plant, Box::new(condition), blocked_target)) }
    }

    pub fn build(self) -> Box<dyn Plant> {
        self.plant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeMotor {
        power: f64,
        position_cmd: f64,
        velocity_cmd: f64,
        measured_position: f64,
        measured_velocity: f64,
    }

    impl PowerOutput for FakeMotor {
        fn set_power(&mut self, x: f64) {
            self.power = x;
        }
        fn stop(&mut self) {
            self.power = 0.0;
        }
    }
    impl PositionOutput for FakeMotor {
        fn set_position(&mut self, x: f64) {
            self.position_cmd = x;
        }
        fn get_measured_position(&self) -> f64 {
            self.measured_position
        }
        fn stop(&mut self) {}
    }
    impl VelocityOutput for FakeMotor {
        fn set_velocity(&mut self, x: f64) {
            self.velocity_cmd = x;
        }
        fn get_measured_velocity(&self) -> f64 {
            self.measured_velocity
        }
        fn stop(&mut self) {}
    }

    #[derive(Default)]
    struct FakeServo {
        position: f64,
    }
    impl PositionOutput for FakeServo {
        fn set_position(&mut self, x: f64) {
            self.position = x;
        }
        fn get_measured_position(&self) -> f64 {
            self.position
        }
        fn stop(&mut self) {}
    }

    #[test]
    fn motor_power_builds_plain_power_plant() {
        let mut plant = PlantBuilder::motor(FakeMotor::default()).power().build();
        plant.set_target(0.4);
        assert!(!plant.has_feedback());
        assert_eq!(plant.get_target(), 0.4);
    }

    #[test]
    fn motor_velocity_defaults_tolerance() {
        let plant = PlantBuilder::motor(FakeMotor::default())
            .velocity(None)
            .unwrap()
            .build();
        assert!(plant.has_feedback());
    }

    #[test]
    fn servo_position_only_exposes_position() {
        let mut plant = PlantBuilder::positional_servo(FakeServo::default())
            .position()
            .build();
        plant.set_target(0.2);
        assert_eq!(plant.get_target(), 0.2);
        assert!(!plant.has_feedback());
    }

    #[test]
    fn negative_tolerance_rejected() {
        let err = PlantBuilder::motor(FakeMotor::default()).position(Some(-1.0));
        assert!(matches!(err, Err(BuildError::InvalidConfig { .. })));
    }

    #[test]
    fn negative_rate_limit_rejected() {
        let stage = PlantBuilder::motor(FakeMotor::default()).power();
        let err = stage.rate_limit(-1.0);
        assert!(matches!(err, Err(BuildError::InvalidConfig { .. })));
    }

    #[test]
    fn group_of_two_fans_out_with_scale_bias() {
        let plant = PlantBuilder::motor(FakeMotor::default())
            .and_same_kind(FakeMotor::default(), true)
            .power()
            .build();
        assert!(!plant.has_feedback());
    }

    #[test]
    fn interlock_blocks_target_until_condition_is_true() {
        use std::cell::Cell;
        use std::rc::Rc;

        let gate = Rc::new(Cell::new(false));
        let gate_clone = gate.clone();
        let mut plant = PlantBuilder::motor(FakeMotor::default())
            .power()
            .interlock(move || gate_clone.get(), 0.0)
            .build();

        plant.set_target(1.0);
        plant.update(0.1);
        assert_eq!(plant.get_target(), 0.0);

        gate.set(true);
        plant.update(0.1);
        assert_eq!(plant.get_target(), 1.0);
    }

    #[test]
    fn zero_rate_limit_pins_current_target() {
        let mut plant = PlantBuilder::motor(FakeMotor::default())
            .power()
            .rate_limit(0.0)
            .unwrap()
            .build();
        plant.set_target(1.0);
        for _ in 0..50 {
            plant.update(1.0);
        }
        // with max_delta == 0, current never moves off its start
        plant.update(0.0);
        assert_eq!(plant.at_setpoint(), true); // Power-backed plant has no feedback
    }
}
