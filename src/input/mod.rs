//! Polled-per-cycle input snapshot and binding dispatch (§4.G). Device
//! polling itself is the host's job; this module only keeps edge state and
//! fires callbacks from it.

mod bindings;
mod gamepads;

pub use bindings::Bindings;
pub use gamepads::{Axes, Button, ButtonId, Gamepad, Gamepads, Player, RawGamepadSource};
