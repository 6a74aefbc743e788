//! Kinematic measurements from poses.
//!
//! Computes per-frame balance, left/right movement symmetry, and joint
//! angles from a single pose, plus postural stability over a short pose
//! window. All scores live on a 0-100 scale where higher is better.
//!
//! Measurements degrade gracefully: a score whose defining landmarks are
//! occluded comes back as [`MetricEstimate::unavailable`] rather than a
//! fabricated number, and partial landmark sets drop only the terms they
//! cannot support.

use gaitsense_core::utils::{mean, rad_to_deg, std_deviation};
use gaitsense_core::{Keypoint, KeypointType, Point2, Pose, Resettable};

use crate::config::KinematicsConfig;
use crate::types::{
    FootPressure, FootSide, JointAngles, MetricEstimate, StabilityMetrics, SymmetryScores,
};

// ===== Geometry =====

/// Interior angle at `vertex` formed by the rays toward `a` and `b`,
/// in degrees within [0, 180].
pub(crate) fn angle_at(a: Point2, vertex: Point2, b: Point2) -> f64 {
    let radians =
        (a.y - vertex.y).atan2(a.x - vertex.x) - (b.y - vertex.y).atan2(b.x - vertex.x);
    let mut degrees = rad_to_deg(radians);
    if degrees < 0.0 {
        degrees += 360.0;
    }
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Reference point directly above a keypoint, for measuring segment
/// angles against the vertical.
fn vertical_reference(kp: &Keypoint) -> Point2 {
    Point2::new(kp.x, kp.y - 10.0)
}

fn confidence_mean(keypoints: &[&Keypoint]) -> f64 {
    let values: Vec<f64> = keypoints
        .iter()
        .map(|kp| f64::from(kp.confidence.value()))
        .collect();
    mean(&values)
}

/// Hip center used for displacement tracking. Falls back to the single
/// confident hip when the other is occluded.
pub(crate) fn hip_center(pose: &Pose, threshold: f32) -> Option<Point2> {
    pose.midpoint_or_better(KeypointType::LeftHip, KeypointType::RightHip, threshold)
}

// ===== Velocity =====

/// Exponential velocity filter over hip-center displacement.
#[derive(Debug)]
pub struct VelocityFilter {
    alpha: f64,
    hip_threshold: f32,
    previous: Option<Point2>,
}

impl VelocityFilter {
    /// Creates a filter from the kinematic configuration.
    pub fn new(config: &KinematicsConfig) -> Self {
        Self {
            alpha: config.velocity_blend_alpha,
            hip_threshold: config.joint_confidence_threshold,
            previous: None,
        }
    }

    /// Filtered hip-center velocity in pixels per second.
    ///
    /// A non-positive time delta yields zero velocity without touching
    /// the filter state. Occluded hips contribute zero displacement, so
    /// the filtered velocity decays toward zero while tracking is lost.
    pub fn update(&mut self, current: &Pose, previous: &Pose, delta_time_s: f64) -> Point2 {
        if delta_time_s <= 0.0 {
            return Point2::ZERO;
        }

        let displacement = match (
            hip_center(current, self.hip_threshold),
            hip_center(previous, self.hip_threshold),
        ) {
            (Some(curr), Some(prev)) => Point2::new(curr.x - prev.x, curr.y - prev.y),
            _ => Point2::ZERO,
        };

        let instant = Point2::new(
            displacement.x / delta_time_s,
            displacement.y / delta_time_s,
        );
        let prev = self.previous.unwrap_or(instant);
        let filtered = Point2::new(
            self.alpha * instant.x + (1.0 - self.alpha) * prev.x,
            self.alpha * instant.y + (1.0 - self.alpha) * prev.y,
        );
        self.previous = Some(filtered);
        filtered
    }
}

impl Resettable for VelocityFilter {
    fn reset(&mut self) {
        self.previous = None;
    }
}

// ===== Balance =====

/// Postural balance score for a single pose.
///
/// Starts from 100 and deducts for trunk lean, hip drift off the ankle
/// base, uneven leg loading, and head offset, each normalized by torso
/// height. Requires both hips and both shoulders; other landmarks only
/// refine the score.
pub fn balance_score(pose: &Pose, config: &KinematicsConfig) -> MetricEstimate {
    let (Some(left_hip), Some(right_hip), Some(left_shoulder), Some(right_shoulder)) = (
        pose.get_keypoint(KeypointType::LeftHip),
        pose.get_keypoint(KeypointType::RightHip),
        pose.get_keypoint(KeypointType::LeftShoulder),
        pose.get_keypoint(KeypointType::RightShoulder),
    ) else {
        return MetricEstimate::unavailable();
    };

    let (Some(hip_center), Some(shoulder_center)) = (
        pose.weighted_midpoint(KeypointType::LeftHip, KeypointType::RightHip, 0.0),
        pose.weighted_midpoint(KeypointType::LeftShoulder, KeypointType::RightShoulder, 0.0),
    ) else {
        return MetricEstimate::unavailable();
    };

    let body_height = (shoulder_center.y - hip_center.y).abs();
    if body_height <= f64::EPSILON {
        return MetricEstimate::unavailable();
    }

    let threshold = config.joint_confidence_threshold;

    let vertical = (hip_center.x - shoulder_center.x).abs() / body_height;

    let head = pose
        .visible_keypoint(KeypointType::Nose, threshold)
        .map_or(0.0, |nose| (nose.x - shoulder_center.x).abs() / body_height);

    let sagittal = pose
        .weighted_midpoint(KeypointType::LeftAnkle, KeypointType::RightAnkle, threshold)
        .map_or(0.0, |ankle_center| {
            (hip_center.x - ankle_center.x).abs() / body_height
        });

    let mut weight_shift = 0.0;
    if let (Some(left_ankle), Some(right_ankle)) = (
        pose.visible_keypoint(KeypointType::LeftAnkle, threshold),
        pose.visible_keypoint(KeypointType::RightAnkle, threshold),
    ) {
        let left_load = hip_center.distance_to(&left_ankle.position())
            * f64::from(left_ankle.confidence.value());
        let right_load = hip_center.distance_to(&right_ankle.position())
            * f64::from(right_ankle.confidence.value());
        let total = left_load + right_load;
        let left_pct = if total > 0.0 {
            left_load / total * 100.0
        } else {
            50.0
        };
        weight_shift = (left_pct - 50.0).abs() / 25.0;
    }

    let weights = &config.balance_weights;
    let score = (100.0
        - vertical * weights.vertical
        - sagittal * weights.sagittal
        - weight_shift * weights.weight_shift
        - head * weights.head)
        .clamp(0.0, 100.0);

    let confidence = confidence_mean(&[left_hip, right_hip, left_shoulder, right_shoulder]);
    MetricEstimate::from_confidence(score, confidence)
}

// ===== Symmetry =====

fn length_symmetry(left: f64, right: f64) -> f64 {
    let average = (left + right) / 2.0;
    if average <= f64::EPSILON {
        return 100.0;
    }
    100.0 - (left - right).abs() / average * 100.0
}

fn angle_symmetry(left: f64, right: f64) -> f64 {
    100.0 - (left - right).abs() / 1.8
}

fn leg_symmetry(pose: &Pose, threshold: f32) -> Option<(f64, f64)> {
    let left_hip = pose.visible_keypoint(KeypointType::LeftHip, threshold)?;
    let right_hip = pose.visible_keypoint(KeypointType::RightHip, threshold)?;
    let left_knee = pose.visible_keypoint(KeypointType::LeftKnee, threshold)?;
    let right_knee = pose.visible_keypoint(KeypointType::RightKnee, threshold)?;
    let left_ankle = pose.visible_keypoint(KeypointType::LeftAnkle, threshold)?;
    let right_ankle = pose.visible_keypoint(KeypointType::RightAnkle, threshold)?;

    let thigh_lengths = length_symmetry(
        left_hip.distance_to(left_knee),
        right_hip.distance_to(right_knee),
    );
    let shin_lengths = length_symmetry(
        left_knee.distance_to(left_ankle),
        right_knee.distance_to(right_ankle),
    );

    let thigh_angles = angle_symmetry(
        angle_at(
            vertical_reference(left_hip),
            left_hip.position(),
            left_knee.position(),
        ),
        angle_at(
            vertical_reference(right_hip),
            right_hip.position(),
            right_knee.position(),
        ),
    );
    let knee_angles = angle_symmetry(
        angle_at(
            left_hip.position(),
            left_knee.position(),
            left_ankle.position(),
        ),
        angle_at(
            right_hip.position(),
            right_knee.position(),
            right_ankle.position(),
        ),
    );

    let raw =
        thigh_lengths * 0.15 + shin_lengths * 0.15 + thigh_angles * 0.35 + knee_angles * 0.35;
    let confidence = confidence_mean(&[
        left_hip,
        right_hip,
        left_knee,
        right_knee,
        left_ankle,
        right_ankle,
    ]);
    Some((raw, confidence))
}

fn arm_symmetry(pose: &Pose, threshold: f32) -> Option<(f64, f64)> {
    let left_shoulder = pose.visible_keypoint(KeypointType::LeftShoulder, threshold)?;
    let right_shoulder = pose.visible_keypoint(KeypointType::RightShoulder, threshold)?;
    let left_elbow = pose.visible_keypoint(KeypointType::LeftElbow, threshold)?;
    let right_elbow = pose.visible_keypoint(KeypointType::RightElbow, threshold)?;
    let left_wrist = pose.visible_keypoint(KeypointType::LeftWrist, threshold)?;
    let right_wrist = pose.visible_keypoint(KeypointType::RightWrist, threshold)?;

    let upper_arm_lengths = length_symmetry(
        left_shoulder.distance_to(left_elbow),
        right_shoulder.distance_to(right_elbow),
    );
    let forearm_lengths = length_symmetry(
        left_elbow.distance_to(left_wrist),
        right_elbow.distance_to(right_wrist),
    );

    let shoulder_angles = angle_symmetry(
        angle_at(
            vertical_reference(left_shoulder),
            left_shoulder.position(),
            left_elbow.position(),
        ),
        angle_at(
            vertical_reference(right_shoulder),
            right_shoulder.position(),
            right_elbow.position(),
        ),
    );
    let elbow_angles = angle_symmetry(
        angle_at(
            left_shoulder.position(),
            left_elbow.position(),
            left_wrist.position(),
        ),
        angle_at(
            right_shoulder.position(),
            right_elbow.position(),
            right_wrist.position(),
        ),
    );

    let raw = upper_arm_lengths * 0.1
        + forearm_lengths * 0.1
        + shoulder_angles * 0.4
        + elbow_angles * 0.4;
    let confidence = confidence_mean(&[
        left_shoulder,
        right_shoulder,
        left_elbow,
        right_elbow,
        left_wrist,
        right_wrist,
    ]);
    Some((raw, confidence))
}

/// Left/right movement symmetry for a single pose.
///
/// Legs carry 70% of the overall score and arms 30%. A body region
/// whose landmarks fail the confidence gate is reported unavailable and
/// contributes zero to the overall combination.
pub fn symmetry_scores(pose: &Pose, config: &KinematicsConfig) -> SymmetryScores {
    let leg = leg_symmetry(pose, config.joint_confidence_threshold);
    let arm = arm_symmetry(pose, config.arm_confidence_threshold);

    if leg.is_none() && arm.is_none() {
        return SymmetryScores::default();
    }

    let (leg_raw, leg_confidence) = leg.unwrap_or((0.0, 0.0));
    let (arm_raw, arm_confidence) = arm.unwrap_or((0.0, 0.0));
    let overall_raw = leg_raw * 0.7 + arm_raw * 0.3;
    let overall_confidence = leg_confidence * 0.7 + arm_confidence * 0.3;

    let to_estimate = |part: Option<(f64, f64)>| {
        part.map_or_else(MetricEstimate::unavailable, |(value, confidence)| {
            MetricEstimate::from_confidence(value.clamp(0.0, 100.0), confidence)
        })
    };

    SymmetryScores {
        overall: MetricEstimate::from_confidence(
            overall_raw.clamp(0.0, 100.0),
            overall_confidence,
        ),
        leg: to_estimate(leg),
        arm: to_estimate(arm),
    }
}

// ===== Joint angles =====

/// Sagittal joint angles for both sides of the body.
///
/// Each angle requires its full landmark chain to pass the confidence
/// gate, otherwise that angle is `None` for the frame.
pub fn joint_angles(pose: &Pose, config: &KinematicsConfig) -> JointAngles {
    let threshold = config.joint_confidence_threshold;
    let mut angles = JointAngles::default();

    for side in [FootSide::Left, FootSide::Right] {
        let shoulder = pose.visible_keypoint(side.shoulder(), threshold);
        let hip = pose.visible_keypoint(side.hip(), threshold);
        let knee = pose.visible_keypoint(side.knee(), threshold);
        let ankle = pose.visible_keypoint(side.ankle(), threshold);

        if let (Some(s), Some(h), Some(k)) = (shoulder, hip, knee) {
            *angles.hip.get_mut(side) = Some(angle_at(s.position(), h.position(), k.position()));
        }
        if let (Some(h), Some(k), Some(a)) = (hip, knee, ankle) {
            *angles.knee.get_mut(side) = Some(angle_at(h.position(), k.position(), a.position()));
        }
        if let (Some(k), Some(a)) = (knee, ankle) {
            let reference = Point2::new(a.x + config.ankle_reference_offset_px, a.y);
            *angles.ankle.get_mut(side) = Some(angle_at(k.position(), a.position(), reference));
        }
    }
    angles
}

/// Knee angle for one side, gated on the hip-knee-ankle chain.
pub(crate) fn knee_angle(pose: &Pose, side: FootSide, threshold: f32) -> Option<f64> {
    let hip = pose.visible_keypoint(side.hip(), threshold)?;
    let knee = pose.visible_keypoint(side.knee(), threshold)?;
    let ankle = pose.visible_keypoint(side.ankle(), threshold)?;
    Some(angle_at(hip.position(), knee.position(), ankle.position()))
}

// ===== Stability =====

fn path_smoothness(path: &[Point2]) -> f64 {
    if path.len() < 4 {
        return 1.0;
    }
    let mut total_turn = 0.0;
    for i in 1..path.len() - 1 {
        let prev = path[i - 1];
        let curr = path[i];
        let next = path[i + 1];
        let heading_in = (curr.y - prev.y).atan2(curr.x - prev.x);
        let heading_out = (next.y - curr.y).atan2(next.x - curr.x);
        let mut turn = (heading_in - heading_out).abs();
        if turn > std::f64::consts::PI {
            turn = 2.0 * std::f64::consts::PI - turn;
        }
        total_turn += turn;
    }
    let average_turn = total_turn / (path.len() - 2) as f64;
    (1.0 - average_turn / std::f64::consts::PI).max(0.0)
}

fn single_pose_stability(pose: &Pose, config: &KinematicsConfig) -> StabilityMetrics {
    let Some(nose) = pose.get_keypoint(KeypointType::Nose) else {
        return StabilityMetrics::neutral();
    };
    let Some(hip_mid) = pose.midpoint(KeypointType::LeftHip, KeypointType::RightHip, 0.0) else {
        return StabilityMetrics::neutral();
    };

    let lateral = (nose.x - hip_mid.x).abs() / config.sway_divisor;
    let vertical = pose
        .midpoint(KeypointType::LeftShoulder, KeypointType::RightShoulder, 0.0)
        .map_or(0.0, |shoulder_mid| {
            (nose.y - shoulder_mid.y).abs() / config.sway_divisor
        });
    let score = (100.0 - (lateral * 50.0 + vertical * 50.0)).clamp(0.0, 100.0);

    StabilityMetrics {
        score: MetricEstimate::from_confidence(score, 0.4),
        lateral_sway: lateral,
        vertical_sway: vertical,
        path_smoothness: None,
    }
}

/// Postural stability over a recent pose window.
///
/// With four or more poses the score combines head and hip sway
/// variability with head path smoothness. Shorter windows fall back to
/// a single-pose heuristic on the most recent pose, reported at reduced
/// confidence. Windows without usable landmarks produce the neutral
/// placeholder.
pub fn stability_metrics(window: &[&Pose], config: &KinematicsConfig) -> StabilityMetrics {
    let Some(last) = window.last() else {
        return StabilityMetrics::neutral();
    };
    if window.len() < 4 {
        return single_pose_stability(last, config);
    }

    let threshold = config.joint_confidence_threshold;
    let mut nose_points = Vec::with_capacity(window.len());
    let mut hip_xs = Vec::with_capacity(window.len());
    let mut shoulder_ys = Vec::with_capacity(window.len());

    for pose in window {
        if let Some(nose) = pose.visible_keypoint(KeypointType::Nose, threshold) {
            nose_points.push(nose.position());
        }
        if let Some(mid) = pose.midpoint(KeypointType::LeftHip, KeypointType::RightHip, threshold)
        {
            hip_xs.push(mid.x);
        }
        if let Some(mid) = pose.midpoint(
            KeypointType::LeftShoulder,
            KeypointType::RightShoulder,
            threshold,
        ) {
            shoulder_ys.push(mid.y);
        }
    }

    if nose_points.len() <= 3 || hip_xs.len() <= 3 {
        return StabilityMetrics::neutral();
    }

    let nose_xs: Vec<f64> = nose_points.iter().map(|p| p.x).collect();
    let nose_ys: Vec<f64> = nose_points.iter().map(|p| p.y).collect();

    let lateral =
        (std_deviation(&nose_xs) * 0.7 + std_deviation(&hip_xs) * 0.3) / config.sway_divisor;
    let shoulder_term = if shoulder_ys.len() > 3 {
        std_deviation(&shoulder_ys)
    } else {
        0.0
    };
    let vertical = (std_deviation(&nose_ys) * 0.7 + shoulder_term * 0.3) / config.sway_divisor;

    let smoothness = path_smoothness(&nose_points);
    let score = (100.0 - (lateral * 40.0 + vertical * 30.0 + (1.0 - smoothness) * 30.0))
        .clamp(0.0, 100.0);
    let confidence = nose_points.len() as f64 / window.len() as f64;

    StabilityMetrics {
        score: MetricEstimate::from_confidence(score, confidence),
        lateral_sway: lateral,
        vertical_sway: vertical,
        path_smoothness: Some(smoothness),
    }
}

// ===== Foot pressure =====

/// Foot load split estimated from how far each ankle sits below the
/// hip center. Requires both ankles to pass the confidence gate.
pub fn estimate_foot_pressure(pose: &Pose, ankle_threshold: f32) -> Option<FootPressure> {
    let hip_mid = pose.midpoint(KeypointType::LeftHip, KeypointType::RightHip, 0.0)?;
    let left_ankle = pose.visible_keypoint(KeypointType::LeftAnkle, ankle_threshold)?;
    let right_ankle = pose.visible_keypoint(KeypointType::RightAnkle, ankle_threshold)?;

    let left_drop = (left_ankle.y - hip_mid.y).abs();
    let right_drop = (right_ankle.y - hip_mid.y).abs();
    let total = left_drop + right_drop;
    if total <= f64::EPSILON {
        return None;
    }

    Some(FootPressure {
        left_pct: (left_drop / total * 100.0).clamp(0.0, 100.0),
        right_pct: (right_drop / total * 100.0).clamp(0.0, 100.0),
    })
}
