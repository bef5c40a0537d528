use crate::clock::LoopClock;
use crate::drive::{DofMask, DriveSignal};
use crate::geometry::Pose2d;
use crate::guidance::observation::PoseEstimator;
use crate::guidance::DriveOverlay;

const TRANSLATE_GAIN: f64 = 0.05;
const AIM_GAIN: f64 = 0.6;

/// Captures the robot's current field pose the first time it's resolved
/// and drives back toward that captured pose on every following cycle,
/// over all three DOFs (§4.J "PoseLock").
pub struct PoseLock {
    estimator: Box<dyn PoseEstimator>,
    captured: Option<Pose2d>,
}

impl PoseLock {
    pub fn new(estimator: impl PoseEstimator + 'static) -> Self {
        Self { estimator: Box::new(estimator), captured: None }
    }
}

impl DriveOverlay for PoseLock {
    fn resolve(&mut self, _clock: &LoopClock, requested_mask: DofMask) -> (DriveSignal, DofMask) {
        let estimate = self.estimator.poll();
        if !estimate.has_pose {
            return (DriveSignal::ZERO, DofMask::NONE);
        }

        let target = *self.captured.get_or_insert(estimate.field_to_robot);
        let (dx, dy) = estimate.field_to_robot.translation_to(&target);
        let dyaw = crate::geometry::normalize_angle(target.yaw_rad - estimate.field_to_robot.yaw_rad);

        let signal = DriveSignal::new(
            (dx * TRANSLATE_GAIN).clamp(-1.0, 1.0),
            (dy * TRANSLATE_GAIN).clamp(-1.0, 1.0),
            (dyaw * AIM_GAIN).clamp(-1.0, 1.0),
        );
        (signal, DofMask::ALL.intersect(&requested_mask))
    }
}
