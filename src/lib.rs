//! Host-agnostic robot control runtime core: plant primitives and
//! decorators, a staged builder, a cooperative task engine, polled input
//! with edge-triggered bindings, a drive-signal pipeline with a mecanum
//! mixer, and guidance overlays composed onto a base drive source.
//!
//! The host owns the actual hardware SDK, the wall clock, and the per-cycle
//! driver loop; this crate only ever reacts to values handed in through the
//! narrow seams in [`hal`] and [`clock`].

pub mod clock;
pub mod debug;
pub mod drive;
pub mod error;
pub mod geometry;
pub mod guidance;
pub mod hal;
pub mod input;
pub mod plant;
pub mod task;

pub use clock::LoopClock;
pub use drive::{DriveSignal, DriveSource};
pub use error::{BuildError, BuildResult};
pub use plant::Plant;
pub use task::{Task, TaskRunner};
