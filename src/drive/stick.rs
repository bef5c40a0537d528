use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::LoopClock;
use crate::drive::signal::DriveSignal;
use crate::drive::DriveSource;
use crate::input::{ButtonId, Gamepads, Player};

/// A `Gamepads` shared between the runtime and however many drive sources
/// read from it.
pub type SharedGamepads = Rc<RefCell<Gamepads>>;

/// Standard stick layout: `axial = -left_stick_y`, `lateral = -left_stick_x`,
/// `omega = -right_stick_x` (§4.H). Zeroes below `deadband`, then applies a
/// sign-preserving `expo` curve to what's left; optionally scales the whole
/// signal down while `slow_button` is held.
pub struct StickMapper {
    gamepads: SharedGamepads,
    player: Player,
    deadband: f64,
    expo: f64,
    slow_button: Option<ButtonId>,
    slow_scale: f64,
}

impl StickMapper {
    pub fn new(gamepads: SharedGamepads, player: Player) -> Self {
        Self {
            gamepads,
            player,
            deadband: 0.05,
            expo: 1.0,
            slow_button: None,
            slow_scale: 1.0,
        }
    }

    pub fn deadband(mut self, deadband: f64) -> Self {
        self.deadband = deadband;
        self
    }

    pub fn expo(mut self, expo: f64) -> Self {
        self.expo = expo;
        self
    }

    /// `slow_scale` should be in `(0, 1]`.
    pub fn slow_mode(mut self, button: ButtonId, slow_scale: f64) -> Self {
        self.slow_button = Some(button);
        self.slow_scale = slow_scale;
        self
    }

    fn shape(&self, raw: f64) -> f64 {
        let magnitude = raw.abs();
        if magnitude < self.deadband {
            return 0.0;
        }
        raw.signum() * magnitude.powf(self.expo)
    }
}

impl DriveSource for StickMapper {
    fn get(&mut self, _clock: &LoopClock) -> DriveSignal {
        let gamepads = self.gamepads.borrow();
        let axes = gamepads.player(self.player).axes();

        let axial = self.shape(-axes.left_stick_y);
        let lateral = self.shape(-axes.left_stick_x);
        let omega = self.shape(-axes.right_stick_x);
        let signal = DriveSignal::new(axial, lateral, omega);

        match self.slow_button {
            Some(button) if gamepads.player(self.player).button(button).is_pressed() => {
                signal.scaled(self.slow_scale)
            }
            _ => signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Axes, RawGamepadSource};

    struct FixedSource {
        axes: Axes,
    }

    impl RawGamepadSource for FixedSource {
        fn read_axes(&self, _player: Player) -> Axes {
            self.axes
        }
        fn read_button(&self, _player: Player, button: ButtonId) -> bool {
            button == ButtonId::LeftBumper
        }
    }

    fn gamepads_with(axes: Axes) -> SharedGamepads {
        let mut gamepads = Gamepads::new(Box::new(FixedSource { axes }));
        let mut clock = LoopClock::new();
        clock.update(1.0);
        gamepads.update(&clock);
        Rc::new(RefCell::new(gamepads))
    }

    #[test]
    fn stick_drive_only_scenario_1() {
        let axes = Axes { left_stick_y: -0.5, ..Axes::default() };
        let gamepads = gamepads_with(axes);
        let mut mapper = StickMapper::new(gamepads, Player::One);
        let clock = LoopClock::new();
        let signal = mapper.get(&clock);
        assert_eq!(signal, DriveSignal::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn slow_mode_scenario_2() {
        let axes = Axes { left_stick_y: -0.5, ..Axes::default() };
        let gamepads = gamepads_with(axes);
        let mut mapper = StickMapper::new(gamepads, Player::One).slow_mode(ButtonId::LeftBumper, 0.3);
        let clock = LoopClock::new();
        let signal = mapper.get(&clock);
        assert_eq!(signal, DriveSignal::new(0.15, 0.0, 0.0));
    }

    #[test]
    fn below_deadband_is_zeroed() {
        let axes = Axes { left_stick_y: -0.02, ..Axes::default() };
        let gamepads = gamepads_with(axes);
        let mut mapper = StickMapper::new(gamepads, Player::One);
        let clock = LoopClock::new();
        assert_eq!(mapper.get(&clock).axial, 0.0);
    }
}
