use crate::clock::LoopClock;
use crate::debug::{child_prefix, DebugSink};
use crate::drive::signal::DriveSignal;
use crate::hal::PowerOutput;

/// Per-wheel inversion flags, copied at construction (§9 "Configuration
/// copy-on-construct").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MecanumGeometry {
    pub front_left_inverted: bool,
    pub front_right_inverted: bool,
    pub back_left_inverted: bool,
    pub back_right_inverted: bool,
}

/// Raw mecanum mix for `signal` under `geometry`: `fl = a+l+w`, `fr = a-l-w`,
/// `bl = a-l+w`, `br = a+l-w`, inversion applied as a sign flip, then all
/// four divided by the largest absolute value if it exceeds 1 (§4.I).
pub fn mix_mecanum(signal: DriveSignal, geometry: &MecanumGeometry) -> [f64; 4] {
    let (a, l, w) = (signal.axial, signal.lateral, signal.omega);
    let mut fl = a + l + w;
    let mut fr = a - l - w;
    let mut bl = a - l + w;
    let mut br = a + l - w;

    if geometry.front_left_inverted {
        fl = -fl;
    }
    if geometry.front_right_inverted {
        fr = -fr;
    }
    if geometry.back_left_inverted {
        bl = -bl;
    }
    if geometry.back_right_inverted {
        br = -br;
    }

    let peak = [fl, fr, bl, br].into_iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if peak > 1.0 {
        fl /= peak;
        fr /= peak;
        bl /= peak;
        br /= peak;
    }
    [fl, fr, bl, br]
}

struct AxisSlew {
    current: f64,
    max_per_sec: f64,
}

impl AxisSlew {
    fn step(&mut self, desired: f64, dt: f64) -> f64 {
        let max_delta = self.max_per_sec * dt.max(0.0);
        let delta = (desired - self.current).clamp(-max_delta, max_delta);
        self.current += delta;
        self.current
    }
}

struct RateLimitState {
    axial: AxisSlew,
    lateral: AxisSlew,
    omega: AxisSlew,
}

/// Robot-centric signal to four wheel powers (§3, §4.I). Owns the four
/// power outputs outright; no overlay or binding ever writes to a motor
/// directly (§5 "Shared resource policy").
pub struct MecanumDrivebase {
    front_left: Box<dyn PowerOutput>,
    front_right: Box<dyn PowerOutput>,
    back_left: Box<dyn PowerOutput>,
    back_right: Box<dyn PowerOutput>,
    geometry: MecanumGeometry,
    rate_limit: Option<RateLimitState>,
    last_dt: f64,
    last_wheels: [f64; 4],
}

impl MecanumDrivebase {
    pub fn new(
        front_left: Box<dyn PowerOutput>,
        front_right: Box<dyn PowerOutput>,
        back_left: Box<dyn PowerOutput>,
        back_right: Box<dyn PowerOutput>,
        geometry: MecanumGeometry,
    ) -> Self {
        Self {
            front_left,
            front_right,
            back_left,
            back_right,
            geometry,
            rate_limit: None,
            last_dt: 0.0,
            last_wheels: [0.0; 4],
        }
    }

    /// Enables per-axis slew limiting of the incoming signal, in signal
    /// units per second.
    pub fn with_rate_limits(mut self, max_axial_per_sec: f64, max_lateral_per_sec: f64, max_omega_per_sec: f64) -> Self {
        self.rate_limit = Some(RateLimitState {
            axial: AxisSlew { current: 0.0, max_per_sec: max_axial_per_sec },
            lateral: AxisSlew { current: 0.0, max_per_sec: max_lateral_per_sec },
            omega: AxisSlew { current: 0.0, max_per_sec: max_omega_per_sec },
        });
        self
    }

    /// Captures `dt` for the next `drive` call's rate limiting. Does not
    /// touch the wheel outputs.
    pub fn update(&mut self, clock: &LoopClock) {
        self.last_dt = clock.dt();
    }

    /// Mixes `signal` to wheel powers and applies them. Independent of
    /// `update`: calling `drive` without a prior `update` this cycle reuses
    /// the previous cycle's `dt` for rate limiting.
    pub fn drive(&mut self, signal: DriveSignal) {
        let shaped = match &mut self.rate_limit {
            Some(state) => DriveSignal::new(
                state.axial.step(signal.axial, self.last_dt),
                state.lateral.step(signal.lateral, self.last_dt),
                state.omega.step(signal.omega, self.last_dt),
            ),
            None => signal,
        };

        let wheels = mix_mecanum(shaped, &self.geometry);
        self.front_left.set_power(wheels[0]);
        self.front_right.set_power(wheels[1]);
        self.back_left.set_power(wheels[2]);
        self.back_right.set_power(wheels[3]);
        self.last_wheels = wheels;
    }

    pub fn stop(&mut self) {
        self.front_left.stop();
        self.front_right.stop();
        self.back_left.stop();
        self.back_right.stop();
        self.last_wheels = [0.0; 4];
    }

    pub fn debug_dump(&self, sink: &mut dyn DebugSink, prefix: &str) {
        sink.add_data(&child_prefix(prefix, "fl"), self.last_wheels[0]);
        sink.add_data(&child_prefix(prefix, "fr"), self.last_wheels[1]);
        sink.add_data(&child_prefix(prefix, "bl"), self.last_wheels[2]);
        sink.add_data(&child_prefix(prefix, "br"), self.last_wheels[3]);
    }
}
