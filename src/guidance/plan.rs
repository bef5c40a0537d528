use crate::clock::LoopClock;
use crate::drive::{Dof, DofMask, DriveSignal};
use crate::geometry::{normalize_angle, Pose2d};
use crate::guidance::observation::{Observation, ObservationSource, PoseEstimate, PoseEstimator, TagLayout};
use crate::guidance::DriveOverlay;

/// Output fraction per inch of translation error, clamped to `[-1, 1]`.
const TRANSLATE_GAIN: f64 = 0.05;
/// Output fraction per radian of heading error, clamped to `[-1, 1]`.
const AIM_GAIN: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranslationTarget {
    FieldPoint { x: f64, y: f64 },
    TagRelativePoint { tag_id: i32, forward: f64, left: f64 },
    RobotRelativeOffset { forward: f64, left: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AimTarget {
    FieldPoint { x: f64, y: f64 },
    FieldHeading { rad: f64 },
    TagRelativePoint { tag_id: i32, forward: f64, left: f64 },
}

/// Behavior when a requested DOF can't be solved this cycle (§4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LossPolicy {
    #[default]
    PassThrough,
    ZeroOutput,
}

enum Feedback {
    Observation(Box<dyn ObservationSource>),
    FieldPose(Box<dyn PoseEstimator>, Option<TagLayout>),
    Adaptive {
        observation: Box<dyn ObservationSource>,
        pose: Box<dyn PoseEstimator>,
        tag_layout: Option<TagLayout>,
        enter_gate_inches: f64,
        exit_gate_inches: f64,
        blend_seconds: f64,
        blend_elapsed: f64,
        using_pose: bool,
    },
}

/// Staged construction of a [`DriveOverlay`] from declarative translate/aim
/// targets plus a feedback source (§4.J "Plan" / "Exposed operations").
pub struct PlanBuilder {
    translation: Option<TranslationTarget>,
    aim: Option<AimTarget>,
    control_frame: Pose2d,
    loss_policy: LossPolicy,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self {
            translation: None,
            aim: None,
            control_frame: Pose2d::IDENTITY,
            loss_policy: LossPolicy::default(),
        }
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate_to(mut self, target: TranslationTarget) -> Self {
        self.translation = Some(target);
        self
    }

    pub fn aim_at(mut self, target: AimTarget) -> Self {
        self.aim = Some(target);
        self
    }

    /// Pose of the "controlled point" relative to the robot origin; aim
    /// error is measured from this transformed point.
    pub fn control_frame(mut self, robot_to_aim_frame: Pose2d) -> Self {
        self.control_frame = robot_to_aim_frame;
        self
    }

    pub fn loss_policy(mut self, policy: LossPolicy) -> Self {
        self.loss_policy = policy;
        self
    }

    pub fn build_with_observation(self, source: impl ObservationSource + 'static) -> Box<dyn DriveOverlay> {
        self.build(Feedback::Observation(Box::new(source)))
    }

    pub fn build_with_field_pose(
        self,
        estimator: impl PoseEstimator + 'static,
        tag_layout: Option<TagLayout>,
    ) -> Box<dyn DriveOverlay> {
        self.build(Feedback::FieldPose(Box::new(estimator), tag_layout))
    }

    pub fn build_adaptive(
        self,
        observation: impl ObservationSource + 'static,
        pose: impl PoseEstimator + 'static,
        tag_layout: Option<TagLayout>,
        enter_gate_inches: f64,
        exit_gate_inches: f64,
        blend_seconds: f64,
    ) -> Box<dyn DriveOverlay> {
        self.build(Feedback::Adaptive {
            observation: Box::new(observation),
            pose: Box::new(pose),
            tag_layout,
            enter_gate_inches,
            exit_gate_inches,
            blend_seconds,
            blend_elapsed: 0.0,
            using_pose: true,
        })
    }

    fn build(self, feedback: Feedback) -> Box<dyn DriveOverlay> {
        Box::new(PlanOverlay {
            translation: self.translation,
            aim: self.aim,
            control_frame: self.control_frame,
            loss_policy: self.loss_policy,
            feedback,
        })
    }
}

struct PlanOverlay {
    translation: Option<TranslationTarget>,
    aim: Option<AimTarget>,
    control_frame: Pose2d,
    loss_policy: LossPolicy,
    feedback: Feedback,
}

/// One cycle's polled feedback, resolved once per `resolve` call.
struct Polled {
    observation: Option<Observation>,
    pose: Option<PoseEstimate>,
}

impl PlanOverlay {
    fn poll(&mut self) -> Polled {
        match &mut self.feedback {
            Feedback::Observation(source) => Polled { observation: Some(source.poll()), pose: None },
            Feedback::FieldPose(estimator, _) => Polled { observation: None, pose: Some(estimator.poll()) },
            Feedback::Adaptive { observation, pose, .. } => {
                Polled { observation: Some(observation.poll()), pose: Some(pose.poll()) }
            }
        }
    }

    /// Distance to the active target, used only to drive the adaptive
    /// enter/exit gates. Prefers the translation solve (true field
    /// distance); falls back to the tag-relative aim target's camera
    /// range when there's no translation target to measure against.
    fn distance_estimate(&self, polled: &Polled) -> Option<f64> {
        if self.translation.is_some() {
            let (forward, left) = self.solve_translation(polled)?;
            return Some((forward * forward + left * left).sqrt());
        }
        if matches!(self.aim, Some(AimTarget::TagRelativePoint { .. })) {
            return polled.observation.filter(|o| o.has_target).map(|o| o.camera_range_inches);
        }
        None
    }

    /// For adaptive feedback, decide this cycle whether to prefer the pose
    /// estimate or the raw observation, tracking the enter/exit gates and
    /// the blend window. Returns the pose-preference weight in `[0, 1]`
    /// (1 = fully pose, 0 = fully observation).
    fn adaptive_pose_weight(&mut self, polled: &Polled, dt: f64) -> f64 {
        let aim_only = self.translation.is_none() && self.aim.is_some();
        let distance = self.distance_estimate(polled);

        let Feedback::Adaptive {
            enter_gate_inches,
            exit_gate_inches,
            blend_seconds,
            blend_elapsed,
            using_pose,
            ..
        } = &mut self.feedback
        else {
            return 1.0;
        };

        if aim_only {
            if let Some(obs) = polled.observation {
                if obs.has_target {
                    return 0.0;
                }
            }
        }

        if *using_pose {
            if let Some(d) = distance {
                if d < *exit_gate_inches {
                    *using_pose = false;
                    *blend_elapsed = 0.0;
                }
            }
        } else if let Some(d) = distance {
            if d > *enter_gate_inches {
                *using_pose = true;
                *blend_elapsed = 0.0;
            }
        }

        if *blend_seconds <= 0.0 {
            return if *using_pose { 1.0 } else { 0.0 };
        }
        *blend_elapsed = (*blend_elapsed + dt).min(*blend_seconds);
        let t = *blend_elapsed / *blend_seconds;
        if *using_pose {
            t
        } else {
            1.0 - t
        }
    }

    fn tag_layout(&self) -> Option<&TagLayout> {
        match &self.feedback {
            Feedback::FieldPose(_, layout) => layout.as_ref(),
            Feedback::Adaptive { tag_layout, .. } => tag_layout.as_ref(),
            Feedback::Observation(_) => None,
        }
    }

    /// Resolves the translation target to a robot-frame `(forward, left)`
    /// error, or `None` if it can't be solved this cycle.
    fn solve_translation(&self, polled: &Polled) -> Option<(f64, f64)> {
        let target = self.translation?;
        match target {
            TranslationTarget::RobotRelativeOffset { forward, left } => Some((forward, left)),
            TranslationTarget::FieldPoint { x, y } => {
                let pose = polled.pose.filter(|p| p.has_pose)?.field_to_robot;
                Some(pose.translation_to(&Pose2d::new(x, y, 0.0)))
            }
            TranslationTarget::TagRelativePoint { tag_id, forward, left } => {
                if let (Some(pose), Some(layout)) = (polled.pose.filter(|p| p.has_pose), self.tag_layout()) {
                    let tag_pose = layout.get(&tag_id)?;
                    let target_field = tag_pose.compose(&Pose2d::new(forward, left, 0.0));
                    return Some(pose.field_to_robot.translation_to(&target_field));
                }
                let obs = polled.observation.filter(|o| o.has_target)?;
                let (bearing, range) = (obs.camera_bearing_rad, obs.camera_range_inches);
                let tag_forward = range * bearing.cos();
                let tag_left = range * bearing.sin();
                Some((tag_forward + forward, tag_left + left))
            }
        }
    }

    /// Resolves the aim target to a heading error in radians, or `None` if
    /// it can't be solved this cycle.
    fn solve_aim(&self, polled: &Polled) -> Option<f64> {
        let target = self.aim?;
        match target {
            AimTarget::FieldHeading { rad } => {
                let pose = polled.pose.filter(|p| p.has_pose)?.field_to_robot;
                let aim_frame = pose.compose(&self.control_frame);
                Some(normalize_angle(rad - aim_frame.yaw_rad))
            }
            AimTarget::FieldPoint { x, y } => {
                let pose = polled.pose.filter(|p| p.has_pose)?.field_to_robot;
                let aim_frame = pose.compose(&self.control_frame);
                let (dx, dy) = aim_frame.translation_to(&Pose2d::new(x, y, 0.0));
                Some(normalize_angle(dy.atan2(dx)))
            }
            AimTarget::TagRelativePoint { tag_id, forward, left } => {
                if let (Some(pose), Some(layout)) = (polled.pose.filter(|p| p.has_pose), self.tag_layout()) {
                    let tag_pose = layout.get(&tag_id)?;
                    let target_field = tag_pose.compose(&Pose2d::new(forward, left, 0.0));
                    let aim_frame = pose.field_to_robot.compose(&self.control_frame);
                    let (dx, dy) = aim_frame.translation_to(&target_field);
                    return Some(normalize_angle(dy.atan2(dx)));
                }
                let obs = polled.observation.filter(|o| o.has_target)?;
                Some(-obs.camera_bearing_rad)
            }
        }
    }
}

/// Blends a pose-based and an observation-based translation solve by
/// `pose_weight`, falling back to whichever one is actually available.
fn blend_translation(pose: Option<(f64, f64)>, obs: Option<(f64, f64)>, pose_weight: f64) -> Option<(f64, f64)> {
    match (pose, obs) {
        (Some(p), Some(o)) => Some((p.0 + (o.0 - p.0) * (1.0 - pose_weight), p.1 + (o.1 - p.1) * (1.0 - pose_weight))),
        (Some(p), None) => Some(p),
        (None, Some(o)) => Some(o),
        (None, None) => None,
    }
}

fn blend_aim(pose: Option<f64>, obs: Option<f64>, pose_weight: f64) -> Option<f64> {
    match (pose, obs) {
        (Some(p), Some(o)) => Some(p + normalize_angle(o - p) * (1.0 - pose_weight)),
        (Some(p), None) => Some(p),
        (None, Some(o)) => Some(o),
        (None, None) => None,
    }
}

impl DriveOverlay for PlanOverlay {
    fn resolve(&mut self, clock: &LoopClock, requested_mask: DofMask) -> (DriveSignal, DofMask) {
        let mut natural_mask = DofMask::NONE;
        if self.translation.is_some() {
            natural_mask = natural_mask.with(Dof::Axial).with(Dof::Lateral);
        }
        if self.aim.is_some() {
            natural_mask = natural_mask.with(Dof::Omega);
        }
        let natural_mask = natural_mask.intersect(&requested_mask);

        let polled = self.poll();
        let (translation, aim) = if matches!(self.feedback, Feedback::Adaptive { .. }) {
            let weight = self.adaptive_pose_weight(&polled, clock.dt());
            let pose_only = Polled { observation: None, pose: polled.pose };
            let obs_only = Polled { observation: polled.observation, pose: None };
            let translation = blend_translation(self.solve_translation(&pose_only), self.solve_translation(&obs_only), weight);
            let aim = blend_aim(self.solve_aim(&pose_only), self.solve_aim(&obs_only), weight);
            (translation, aim)
        } else {
            (self.solve_translation(&polled), self.solve_aim(&polled))
        };

        let mut solved_mask = DofMask::NONE;
        let mut signal = DriveSignal::ZERO;
        if let Some((forward, left)) = translation {
            if natural_mask.contains(Dof::Axial) {
                solved_mask = solved_mask.with(Dof::Axial);
                signal.axial = (forward * TRANSLATE_GAIN).clamp(-1.0, 1.0);
            }
            if natural_mask.contains(Dof::Lateral) {
                solved_mask = solved_mask.with(Dof::Lateral);
                signal.lateral = (left * TRANSLATE_GAIN).clamp(-1.0, 1.0);
            }
        }
        if let Some(heading_error) = aim {
            if natural_mask.contains(Dof::Omega) {
                solved_mask = solved_mask.with(Dof::Omega);
                signal.omega = (heading_error * AIM_GAIN).clamp(-1.0, 1.0);
            }
        }

        match self.loss_policy {
            LossPolicy::PassThrough => (signal, solved_mask),
            LossPolicy::ZeroOutput => {
                if solved_mask == natural_mask {
                    (signal, natural_mask)
                } else {
                    (DriveSignal::ZERO, natural_mask)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aim_overlay_no_target_drops_omega_under_pass_through() {
        // §8 scenario 5.
        let mut overlay = PlanBuilder::new()
            .aim_at(AimTarget::TagRelativePoint { tag_id: 1, forward: 0.0, left: 0.0 })
            .loss_policy(LossPolicy::PassThrough)
            .build_with_observation(|| Observation { has_target: false, ..Observation::default() });

        let clock = LoopClock::new();
        let (_signal, mask) = overlay.resolve(&clock, DofMask::ALL);
        assert!(!mask.contains(Dof::Omega));
    }

    #[test]
    fn zero_output_zeroes_all_requested_dofs_on_any_loss() {
        let mut overlay = PlanBuilder::new()
            .translate_to(TranslationTarget::TagRelativePoint { tag_id: 1, forward: 0.0, left: 0.0 })
            .loss_policy(LossPolicy::ZeroOutput)
            .build_with_observation(|| Observation { has_target: false, ..Observation::default() });

        let clock = LoopClock::new();
        let (signal, mask) = overlay.resolve(&clock, DofMask::ALL);
        assert_eq!(signal, DriveSignal::ZERO);
        assert!(mask.contains(Dof::Axial) && mask.contains(Dof::Lateral));
    }

    #[test]
    fn robot_relative_offset_always_solvable() {
        let mut overlay = PlanBuilder::new()
            .translate_to(TranslationTarget::RobotRelativeOffset { forward: 10.0, left: 0.0 })
            .build_with_observation(|| Observation::default());
        let clock = LoopClock::new();
        let (signal, mask) = overlay.resolve(&clock, DofMask::ALL);
        assert!(mask.contains(Dof::Axial));
        assert!(signal.axial > 0.0);
    }
}
