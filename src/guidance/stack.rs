use crate::clock::LoopClock;
use crate::drive::{Dof, DofMask, DriveSignal, DriveSource};
use crate::guidance::DriveOverlay;

struct Layer {
    name: String,
    enabled: Box<dyn FnMut() -> bool>,
    overlay: Box<dyn DriveOverlay>,
    requested_mask: DofMask,
}

/// Builds a [`StackedDriveSource`] from a base source plus an ordered list
/// of conditionally-enabled overlays (§4.J "Overlay stack").
pub struct OverlayStack {
    base: Box<dyn DriveSource>,
    layers: Vec<Layer>,
}

impl OverlayStack {
    pub fn new(base: impl DriveSource + 'static) -> Self {
        Self { base: Box::new(base), layers: Vec::new() }
    }

    /// Appends a layer. Layers are applied in the order added; a later
    /// layer's owned DOFs overwrite an earlier layer's on the same cycle
    /// (last writer wins, per DOF).
    pub fn add(
        mut self,
        name: impl Into<String>,
        enabled: impl FnMut() -> bool + 'static,
        overlay: impl DriveOverlay + 'static,
        requested_mask: DofMask,
    ) -> Self {
        self.layers.push(Layer {
            name: name.into(),
            enabled: Box::new(enabled),
            overlay: Box::new(overlay),
            requested_mask,
        });
        self
    }

    pub fn build(self) -> StackedDriveSource {
        StackedDriveSource { base: self.base, layers: self.layers }
    }
}

/// A base [`DriveSource`] composed with an ordered stack of overlays,
/// itself a `DriveSource` (§4.J).
pub struct StackedDriveSource {
    base: Box<dyn DriveSource>,
    layers: Vec<Layer>,
}

impl DriveSource for StackedDriveSource {
    fn get(&mut self, clock: &LoopClock) -> DriveSignal {
        let mut signal = self.base.get(clock);
        for layer in &mut self.layers {
            if !(layer.enabled)() {
                continue;
            }
            let (produced, owned_mask) = layer.overlay.resolve(clock, layer.requested_mask);
            for dof in [Dof::Axial, Dof::Lateral, Dof::Omega] {
                if owned_mask.contains(dof) {
                    signal = signal.with_component(dof, produced.component(dof));
                }
            }
        }
        signal
    }
}

impl StackedDriveSource {
    /// Names of the layers that are currently enabled, in application
    /// order, for debug dumps.
    pub fn active_layer_names(&mut self) -> Vec<&str> {
        self.layers.iter_mut().filter(|l| (l.enabled)()).map(|l| l.name.as_str()).collect()
    }
}

/// Fluent overlay attachment for any [`DriveSource`] (§6 "Exposed
/// operations").
pub trait DriveSourceExt: DriveSource + Sized + 'static {
    fn overlay_when(
        self,
        enabled: impl FnMut() -> bool + 'static,
        overlay: impl DriveOverlay + 'static,
        requested_mask: DofMask,
    ) -> StackedDriveSource {
        OverlayStack::new(self).add("overlay", enabled, overlay, requested_mask).build()
    }

    fn overlay_stack(self) -> OverlayStack {
        OverlayStack::new(self)
    }
}

impl<T: DriveSource + 'static> DriveSourceExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(DriveSignal);
    impl DriveSource for Fixed {
        fn get(&mut self, _clock: &LoopClock) -> DriveSignal {
            self.0
        }
    }

    struct FixedOverlay {
        signal: DriveSignal,
        mask: DofMask,
    }
    impl DriveOverlay for FixedOverlay {
        fn resolve(&mut self, _clock: &LoopClock, requested_mask: DofMask) -> (DriveSignal, DofMask) {
            (self.signal, self.mask.intersect(&requested_mask))
        }
    }

    #[test]
    fn disabled_layer_is_skipped() {
        let mut source = OverlayStack::new(Fixed(DriveSignal::new(0.2, 0.0, 0.0)))
            .add(
                "never",
                || false,
                FixedOverlay { signal: DriveSignal::new(0.0, 0.0, 0.9), mask: DofMask::single(Dof::Omega) },
                DofMask::single(Dof::Omega),
            )
            .build();
        let clock = LoopClock::new();
        assert_eq!(source.get(&clock), DriveSignal::new(0.2, 0.0, 0.0));
    }

    #[test]
    fn later_layer_overwrites_earlier_on_shared_dof() {
        // layer A owns {omega}; layer B owns {omega, axial}; final omega and
        // axial come from B, lateral stays at the base value.
        let mut source = OverlayStack::new(Fixed(DriveSignal::new(0.0, 0.3, 0.0)))
            .add(
                "a",
                || true,
                FixedOverlay { signal: DriveSignal::new(0.0, 0.0, 0.1), mask: DofMask::single(Dof::Omega) },
                DofMask::single(Dof::Omega),
            )
            .add(
                "b",
                || true,
                FixedOverlay {
                    signal: DriveSignal::new(0.7, 0.0, 0.5),
                    mask: DofMask::single(Dof::Omega).with(Dof::Axial),
                },
                DofMask::single(Dof::Omega).with(Dof::Axial),
            )
            .build();
        let clock = LoopClock::new();
        let result = source.get(&clock);
        assert_eq!(result, DriveSignal::new(0.7, 0.3, 0.5));
    }
}
