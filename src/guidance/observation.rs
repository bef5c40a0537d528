use std::collections::HashMap;

use crate::geometry::Pose2d;

/// Matches any currently-visible tag rather than one specific id, as a
/// `tag_id` argument to a tag-relative target.
pub const ANY_OBSERVED: i32 = -1;

/// A vision-style report about a target tag: range + bearing + age (§6
/// "Observation source").
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation {
    pub has_target: bool,
    pub tag_id: i32,
    pub camera_range_inches: f64,
    pub camera_bearing_rad: f64,
    pub age_seconds: f64,
}

/// Host-supplied pull function for the current observation.
pub trait ObservationSource {
    fn poll(&mut self) -> Observation;
}

impl<F: FnMut() -> Observation> ObservationSource for F {
    fn poll(&mut self) -> Observation {
        self()
    }
}

/// Field-frame position+orientation estimate, with a confidence quality
/// score (§6 "Pose estimator").
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseEstimate {
    pub has_pose: bool,
    pub field_to_robot: Pose2d,
    pub quality: f64,
}

/// Host-supplied pull function for the current pose estimate.
pub trait PoseEstimator {
    fn poll(&mut self) -> PoseEstimate;
}

impl<F: FnMut() -> PoseEstimate> PoseEstimator for F {
    fn poll(&mut self) -> PoseEstimate {
        self()
    }
}

/// Optional map from tag id to its field-frame pose (§6 "Tag layout").
pub type TagLayout = HashMap<i32, Pose2d>;
