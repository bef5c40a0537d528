use std::collections::HashMap;

use crate::clock::{CycleGate, LoopClock};
use crate::input::gamepads::{ButtonId, Gamepads, Player};

type Callback = Box<dyn FnMut()>;

#[derive(Default)]
struct Registration {
    on_press: Vec<Callback>,
    on_release: Vec<Callback>,
    while_held: Vec<Callback>,
}

/// Registry keyed by `(player, button)` with callback lists for rising
/// edge, falling edge, and held-every-cycle dispatch (§4.G).
#[derive(Default)]
pub struct Bindings {
    registrations: HashMap<(Player, ButtonId), Registration>,
    gate: CycleGate,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press(&mut self, player: Player, button: ButtonId, callback: impl FnMut() + 'static) {
        self.registrations
            .entry((player, button))
            .or_default()
            .on_press
            .push(Box::new(callback));
    }

    pub fn on_release(&mut self, player: Player, button: ButtonId, callback: impl FnMut() + 'static) {
        self.registrations
            .entry((player, button))
            .or_default()
            .on_release
            .push(Box::new(callback));
    }

    pub fn while_held(&mut self, player: Player, button: ButtonId, callback: impl FnMut() + 'static) {
        self.registrations
            .entry((player, button))
            .or_default()
            .while_held
            .push(Box::new(callback));
    }

    /// Fires all qualifying callbacks for this cycle, in the order:
    /// `on_press` for every button that just rose, then `on_release` for
    /// every button that just fell, then `while_held` for every button
    /// currently pressed. Idempotent per `clock.cycle`.
    pub fn update(&mut self, clock: &LoopClock, gamepads: &Gamepads) {
        if !self.gate.enter(clock.cycle()) {
            return;
        }

        for (&(player, button), reg) in self.registrations.iter_mut() {
            let state = gamepads.player(player).button(button);
            if state.rising() {
                for cb in &mut reg.on_press {
                    cb();
                }
            }
        }
        for (&(player, button), reg) in self.registrations.iter_mut() {
            let state = gamepads.player(player).button(button);
            if state.falling() {
                for cb in &mut reg.on_release {
                    cb();
                }
            }
        }
        for (&(player, button), reg) in self.registrations.iter_mut() {
            let state = gamepads.player(player).button(button);
            if state.is_pressed() {
                for cb in &mut reg.while_held {
                    cb();
                }
            }
        }
    }
}
