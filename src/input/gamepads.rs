use crate::clock::{CycleGate, LoopClock};

/// Which of the two drivers a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

/// The buttons a `Bindings` registry can key off of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Start,
    Back,
}

const ALL_BUTTONS: [ButtonId; 12] = [
    ButtonId::A,
    ButtonId::B,
    ButtonId::X,
    ButtonId::Y,
    ButtonId::LeftBumper,
    ButtonId::RightBumper,
    ButtonId::DpadUp,
    ButtonId::DpadDown,
    ButtonId::DpadLeft,
    ButtonId::DpadRight,
    ButtonId::Start,
    ButtonId::Back,
];

/// Analog axes for one gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub left_stick_x: f64,
    pub left_stick_y: f64,
    pub right_stick_x: f64,
    pub right_stick_y: f64,
    pub left_trigger: f64,
    pub right_trigger: f64,
}

/// A boolean snapshot with edge state, per §3 "Button, Axis, Gamepads,
/// Bindings".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Button {
    pressed_now: bool,
    pressed_prev: bool,
}

impl Button {
    pub fn is_pressed(&self) -> bool {
        self.pressed_now
    }

    /// Rising edge: pressed this cycle, not pressed the previous one.
    pub fn rising(&self) -> bool {
        self.pressed_now && !self.pressed_prev
    }

    /// Falling edge: pressed the previous cycle, not pressed this one.
    pub fn falling(&self) -> bool {
        !self.pressed_now && self.pressed_prev
    }

    fn poll(&mut self, raw: bool) {
        self.pressed_prev = self.pressed_now;
        self.pressed_now = raw;
    }
}

/// Host-supplied raw poll functions for one player's controller (§6
/// "Gamepad reader").
pub trait RawGamepadSource {
    fn read_axes(&self, player: Player) -> Axes;
    fn read_button(&self, player: Player, button: ButtonId) -> bool;
}

/// One player's polled snapshot: analog axes plus edge-tracked buttons.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gamepad {
    axes: Axes,
    buttons: [Button; 12],
}

impl Gamepad {
    pub fn axes(&self) -> Axes {
        self.axes
    }

    pub fn button(&self, id: ButtonId) -> Button {
        self.buttons[button_index(id)]
    }

    fn poll(&mut self, source: &dyn RawGamepadSource, player: Player) {
        self.axes = source.read_axes(player);
        for id in ALL_BUTTONS {
            self.buttons[button_index(id)].poll(source.read_button(player, id));
        }
    }
}

fn button_index(id: ButtonId) -> usize {
    ALL_BUTTONS.iter().position(|b| *b == id).expect("exhaustive ButtonId table")
}

/// Polled-per-cycle view of both players, idempotent per `LoopClock` cycle
/// (§4.G).
pub struct Gamepads {
    source: Box<dyn RawGamepadSource>,
    player_one: Gamepad,
    player_two: Gamepad,
    gate: CycleGate,
}

impl Gamepads {
    pub fn new(source: Box<dyn RawGamepadSource>) -> Self {
        Self {
            source,
            player_one: Gamepad::default(),
            player_two: Gamepad::default(),
            gate: CycleGate::new(),
        }
    }

    pub fn player_one(&self) -> &Gamepad {
        &self.player_one
    }

    pub fn player_two(&self) -> &Gamepad {
        &self.player_two
    }

    pub fn player(&self, player: Player) -> &Gamepad {
        match player {
            Player::One => &self.player_one,
            Player::Two => &self.player_two,
        }
    }

    /// Polls raw state and advances button edges. No-op if called twice in
    /// the same `clock.cycle`.
    pub fn update(&mut self, clock: &LoopClock) {
        if !self.gate.enter(clock.cycle()) {
            return;
        }
        self.player_one.poll(self.source.as_ref(), Player::One);
        self.player_two.poll(self.source.as_ref(), Player::Two);
    }
}
