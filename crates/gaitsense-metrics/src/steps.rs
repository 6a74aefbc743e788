//! Step detection and gait phase classification.
//!
//! The [`StepDetector`] registers heel strikes from ankle velocity
//! reversals and knee extension patterns, maintains per-side stride
//! histories, tracks double support intervals, and derives the
//! spatiotemporal gait cycle metrics. The [`PhaseClassifier`] labels
//! each frame with a gait cycle phase from both ankles' vertical
//! velocities.

use std::collections::VecDeque;

use gaitsense_core::utils::mean;
use gaitsense_core::{KeypointType, Point2, Pose, Resettable, Timestamp, DEFAULT_CONFIDENCE_THRESHOLD};
use tracing::debug;

use crate::cadence::CadenceSource;
use crate::config::StepDetectorConfig;
use crate::kinematics::knee_angle;
use crate::types::{
    FootSide, GaitCycleMetrics, GaitPhase, MetricEstimate, SidePair, StepEvent, StrideSample,
};

/// Knee angle assumed when the leg landmarks are occluded, degrees.
const STRAIGHT_KNEE_DEG: f64 = 180.0;

/// Step count at which counted metrics reach full confidence.
pub(crate) const FULL_CONFIDENCE_STEP_COUNT: f64 = 10.0;

// ===== Phase classification =====

/// Per-frame gait phase classifier with dwell-frame hysteresis.
///
/// The raw classification compares both ankles' vertical velocities
/// against the phase velocity threshold. A new phase is published only
/// after it persists for the configured number of consecutive frames,
/// which suppresses single-frame flicker; a dwell of zero publishes the
/// raw classification immediately.
#[derive(Debug)]
pub struct PhaseClassifier {
    velocity_threshold: f64,
    min_dwell_frames: u32,
    published: GaitPhase,
    candidate: GaitPhase,
    candidate_frames: u32,
}

impl PhaseClassifier {
    /// Creates a classifier from the step detection configuration.
    pub fn new(config: &StepDetectorConfig) -> Self {
        Self {
            velocity_threshold: config.phase_velocity_threshold,
            min_dwell_frames: config.phase_min_dwell_frames,
            published: GaitPhase::Unknown,
            candidate: GaitPhase::Unknown,
            candidate_frames: 0,
        }
    }

    /// Classifies the current frame against the previous one and
    /// returns the published phase.
    pub fn classify(&mut self, current: &Pose, previous: &Pose) -> GaitPhase {
        let raw = self.raw_phase(current, previous);
        self.publish(raw)
    }

    /// The most recently published phase.
    pub fn current(&self) -> GaitPhase {
        self.published
    }

    fn raw_phase(&self, current: &Pose, previous: &Pose) -> GaitPhase {
        let (Some(left), Some(right), Some(prev_left), Some(prev_right)) = (
            current.get_keypoint(KeypointType::LeftAnkle),
            current.get_keypoint(KeypointType::RightAnkle),
            previous.get_keypoint(KeypointType::LeftAnkle),
            previous.get_keypoint(KeypointType::RightAnkle),
        ) else {
            return GaitPhase::Unknown;
        };

        // Image y grows downward, so a swinging foot has negative vy
        let left_vy = left.y - prev_left.y;
        let right_vy = right.y - prev_right.y;
        let threshold = self.velocity_threshold;

        if left_vy < -threshold && right_vy > threshold {
            GaitPhase::LeftSwing
        } else if right_vy < -threshold && left_vy > threshold {
            GaitPhase::RightSwing
        } else if left_vy.abs() < threshold && right_vy.abs() < threshold {
            GaitPhase::DoubleSupport
        } else {
            GaitPhase::Transition
        }
    }

    fn publish(&mut self, raw: GaitPhase) -> GaitPhase {
        if self.min_dwell_frames == 0 {
            if raw != self.published {
                debug!(from = %self.published, to = %raw, "gait phase changed");
            }
            self.published = raw;
            return raw;
        }

        if raw == self.published {
            self.candidate = raw;
            self.candidate_frames = 0;
            return self.published;
        }

        if raw == self.candidate {
            self.candidate_frames += 1;
        } else {
            self.candidate = raw;
            self.candidate_frames = 1;
        }

        if self.candidate_frames >= self.min_dwell_frames {
            debug!(from = %self.published, to = %raw, "gait phase changed");
            self.published = raw;
            self.candidate_frames = 0;
        }
        self.published
    }
}

impl Resettable for PhaseClassifier {
    fn reset(&mut self) {
        self.published = GaitPhase::Unknown;
        self.candidate = GaitPhase::Unknown;
        self.candidate_frames = 0;
    }
}

// ===== Step detection =====

fn mean_stride(steps: &[StepEvent], value: fn(&StrideSample) -> f64) -> f64 {
    let values: Vec<f64> = steps
        .iter()
        .filter_map(|step| step.stride.as_ref().map(value))
        .collect();
    mean(&values)
}

/// Detects foot strikes and accumulates per-side stride histories.
#[derive(Debug)]
pub struct StepDetector {
    config: StepDetectorConfig,
    stride_scale_m_per_px: f64,
    steps: SidePair<Vec<StepEvent>>,
    /// Upward ankle velocity per side from the previous frame, px/frame.
    previous_vy: SidePair<f64>,
    in_double_support: bool,
    double_support_since: Option<Timestamp>,
    double_support_ms: VecDeque<f64>,
    length_symmetry_ratio: Option<f64>,
    time_symmetry_ratio: Option<f64>,
    counted_cadence: Option<f64>,
}

impl StepDetector {
    /// Creates a detector with the given stride scale in meters per
    /// pixel.
    pub fn new(config: StepDetectorConfig, stride_scale_m_per_px: f64) -> Self {
        let history = config.double_support_history;
        Self {
            config,
            stride_scale_m_per_px,
            steps: SidePair::default(),
            previous_vy: SidePair::default(),
            in_double_support: false,
            double_support_since: None,
            double_support_ms: VecDeque::with_capacity(history),
            length_symmetry_ratio: None,
            time_symmetry_ratio: None,
            counted_cadence: None,
        }
    }

    /// Updates the stride scale, e.g. after height calibration.
    pub fn set_stride_scale(&mut self, m_per_px: f64) {
        self.stride_scale_m_per_px = m_per_px;
    }

    /// Evaluates one frame against the previous one and returns the
    /// number of steps registered on it.
    ///
    /// Requires ankles and knees of both frames to pass the confidence
    /// gate; frames failing the gate are skipped entirely and leave the
    /// detector state untouched.
    pub fn process(&mut self, current: &Pose, previous: &Pose) -> usize {
        let gate = self.config.keypoint_confidence_threshold;

        let (Some(left_ankle), Some(right_ankle), Some(prev_left_ankle), Some(prev_right_ankle)) = (
            current.visible_keypoint(KeypointType::LeftAnkle, gate),
            current.visible_keypoint(KeypointType::RightAnkle, gate),
            previous.visible_keypoint(KeypointType::LeftAnkle, gate),
            previous.visible_keypoint(KeypointType::RightAnkle, gate),
        ) else {
            return 0;
        };
        let knees_visible = current
            .visible_keypoint(KeypointType::LeftKnee, gate)
            .is_some()
            && current
                .visible_keypoint(KeypointType::RightKnee, gate)
                .is_some()
            && previous
                .visible_keypoint(KeypointType::LeftKnee, gate)
                .is_some()
            && previous
                .visible_keypoint(KeypointType::RightKnee, gate)
                .is_some();
        if !knees_visible {
            return 0;
        }

        // Positive = ankle moving up
        let left_vy = prev_left_ankle.y - left_ankle.y;
        let right_vy = prev_right_ankle.y - right_ankle.y;

        let left_knee = knee_angle(current, FootSide::Left, DEFAULT_CONFIDENCE_THRESHOLD)
            .unwrap_or(STRAIGHT_KNEE_DEG);
        let right_knee = knee_angle(current, FootSide::Right, DEFAULT_CONFIDENCE_THRESHOLD)
            .unwrap_or(STRAIGHT_KNEE_DEG);
        let prev_left_knee = knee_angle(previous, FootSide::Left, DEFAULT_CONFIDENCE_THRESHOLD)
            .unwrap_or(STRAIGHT_KNEE_DEG);
        let prev_right_knee = knee_angle(previous, FootSide::Right, DEFAULT_CONFIDENCE_THRESHOLD)
            .unwrap_or(STRAIGHT_KNEE_DEG);

        let timestamp = current.timestamp;
        let left_position = left_ankle.position();
        let right_position = right_ankle.position();

        let mut registered = 0;
        if self.try_register(
            FootSide::Left,
            left_vy,
            left_knee,
            left_knee - prev_left_knee,
            left_position,
            timestamp,
        ) {
            registered += 1;
        }
        if self.try_register(
            FootSide::Right,
            right_vy,
            right_knee,
            right_knee - prev_right_knee,
            right_position,
            timestamp,
        ) {
            registered += 1;
        }

        self.track_double_support(left_vy, right_vy, left_knee, right_knee, timestamp);

        self.previous_vy = SidePair::new(left_vy, right_vy);
        registered
    }

    /// All registered steps per side, oldest first.
    pub fn steps(&self) -> &SidePair<Vec<StepEvent>> {
        &self.steps
    }

    /// Number of registered steps per side.
    pub fn step_counts(&self) -> SidePair<usize> {
        SidePair::new(self.steps.left.len(), self.steps.right.len())
    }

    /// Stride length symmetry ratio in [0, 1], once both sides have
    /// measured strides.
    pub fn length_symmetry_ratio(&self) -> Option<f64> {
        self.length_symmetry_ratio
    }

    /// Stride time symmetry ratio in [0, 1], once both sides have
    /// measured strides.
    pub fn time_symmetry_ratio(&self) -> Option<f64> {
        self.time_symmetry_ratio
    }

    /// Cadence from step counting, steps per minute.
    pub fn counted_cadence(&self) -> Option<f64> {
        self.counted_cadence
    }

    /// Mean double support interval in milliseconds over the recent
    /// history.
    pub fn average_double_support_ms(&self) -> Option<f64> {
        if self.double_support_ms.is_empty() {
            return None;
        }
        let total: f64 = self.double_support_ms.iter().sum();
        Some(total / self.double_support_ms.len() as f64)
    }

    /// Gait cycle metrics derived from the accumulated step history.
    ///
    /// `session_cadence` is the caller's fused cadence estimate; it is
    /// reported directly and also drives the walking speed.
    #[allow(clippy::cast_precision_loss)]
    pub fn cycle_metrics(&self, session_cadence: &MetricEstimate) -> GaitCycleMetrics {
        let left = &self.steps.left;
        let right = &self.steps.right;
        if left.is_empty() && right.is_empty() {
            return GaitCycleMetrics::default();
        }

        // Sides with a single step have no strides to contribute
        let mut lengths = Vec::new();
        let mut times = Vec::new();
        for side_steps in [left, right] {
            if side_steps.len() > 1 {
                for step in side_steps.iter() {
                    if let Some(stride) = &step.stride {
                        lengths.push(stride.length_m);
                        times.push(stride.time_s);
                    }
                }
            }
        }

        let stride_confidence = (lengths.len() as f64 / FULL_CONFIDENCE_STEP_COUNT).clamp(0.0, 1.0);
        let stride_length = if lengths.is_empty() {
            MetricEstimate::unavailable()
        } else {
            MetricEstimate::from_confidence(mean(&lengths), stride_confidence)
        };
        let stride_time = if times.is_empty() {
            MetricEstimate::unavailable()
        } else {
            MetricEstimate::from_confidence(mean(&times), stride_confidence)
        };

        let total_steps = left.len() + right.len();
        let count_confidence = (total_steps as f64 / FULL_CONFIDENCE_STEP_COUNT).clamp(0.0, 1.0);
        let cadence = session_cadence.clone();

        let walking_speed = if cadence.is_usable() && stride_length.is_usable() {
            MetricEstimate::from_confidence(
                stride_length.value * cadence.value / 120.0,
                cadence.confidence.min(stride_length.confidence),
            )
        } else {
            MetricEstimate::unavailable()
        };

        let step_symmetry = self
            .length_symmetry_ratio
            .map_or_else(MetricEstimate::unavailable, |ratio| {
                MetricEstimate::from_confidence((ratio * 100.0).min(100.0), count_confidence)
            });

        let double_support_pct = match self.average_double_support_ms() {
            Some(avg_ms) if stride_time.is_usable() && stride_time.value > 0.0 => {
                let ds_confidence = (self.double_support_ms.len() as f64
                    / self.config.double_support_history as f64)
                    .clamp(0.0, 1.0);
                MetricEstimate::from_confidence(
                    avg_ms / (stride_time.value * 1000.0) * 100.0,
                    ds_confidence,
                )
            }
            _ => MetricEstimate::unavailable(),
        };

        GaitCycleMetrics {
            cadence,
            stride_length_m: stride_length,
            walking_speed_mps: walking_speed,
            stride_time_s: stride_time,
            step_symmetry,
            double_support_pct,
            step_counts: SidePair::new(left.len(), right.len()),
        }
    }

    fn try_register(
        &mut self,
        side: FootSide,
        upward_vy: f64,
        knee_angle_deg: f64,
        knee_rate: f64,
        position: Point2,
        timestamp: Timestamp,
    ) -> bool {
        let heel_strike = upward_vy > self.config.step_velocity_threshold
            && *self.previous_vy.get(side) < 0.0;
        let knee_extension = knee_rate < self.config.knee_rate_threshold
            && knee_angle_deg > self.config.knee_angle_min
            && knee_angle_deg < self.config.knee_angle_max;
        if !heel_strike && !knee_extension {
            return false;
        }

        let debounce_ms = self.config.debounce_ms;
        let scale = self.stride_scale_m_per_px;
        let events = self.steps.get_mut(side);

        if let Some(last) = events.last() {
            if timestamp.millis_since(&last.timestamp) <= debounce_ms {
                return false;
            }
        }

        let stride = events.last().map(|last| {
            let length_m = position.distance_to(&last.position) * scale;
            let time_s = timestamp.duration_since(&last.timestamp);
            StrideSample {
                length_m,
                time_s,
                velocity_mps: length_m / time_s,
            }
        });

        events.push(StepEvent {
            side,
            timestamp,
            position,
            stride,
        });
        debug!(side = side.label(), total = self.steps.get(side).len(), "step registered");

        self.update_symmetry_and_cadence();
        true
    }

    #[allow(clippy::cast_precision_loss)]
    fn update_symmetry_and_cadence(&mut self) {
        let left = &self.steps.left;
        let right = &self.steps.right;
        if left.is_empty() || right.is_empty() {
            return;
        }

        let window = self.config.symmetry_window;
        let left_recent = &left[left.len().saturating_sub(window)..];
        let right_recent = &right[right.len().saturating_sub(window)..];

        let left_length = mean_stride(left_recent, |stride| stride.length_m);
        let right_length = mean_stride(right_recent, |stride| stride.length_m);
        if left_length > 0.0 && right_length > 0.0 {
            self.length_symmetry_ratio =
                Some(left_length.min(right_length) / left_length.max(right_length));
        }

        let left_time = mean_stride(left_recent, |stride| stride.time_s);
        let right_time = mean_stride(right_recent, |stride| stride.time_s);
        if left_time > 0.0 && right_time > 0.0 {
            self.time_symmetry_ratio = Some(left_time.min(right_time) / left_time.max(right_time));
        }

        if left.len() >= 2 && right.len() >= 2 {
            let mut timestamps: Vec<Timestamp> = left
                .iter()
                .chain(right.iter())
                .map(|step| step.timestamp)
                .collect();
            timestamps.sort();
            let span_s = timestamps[timestamps.len() - 1].duration_since(&timestamps[0]);
            if span_s > 0.0 {
                self.counted_cadence = Some((timestamps.len() - 1) as f64 / span_s * 60.0);
            }
        }
    }

    fn track_double_support(
        &mut self,
        left_vy: f64,
        right_vy: f64,
        left_knee_deg: f64,
        right_knee_deg: f64,
        timestamp: Timestamp,
    ) {
        let left_stance = left_vy <= self.config.stance_velocity_max
            && left_knee_deg > self.config.stance_knee_min;
        let right_stance = right_vy <= self.config.stance_velocity_max
            && right_knee_deg > self.config.stance_knee_min;
        let in_double_support = left_stance && right_stance;

        if in_double_support != self.in_double_support {
            if in_double_support {
                self.double_support_since = Some(timestamp);
            } else if let Some(entered) = self.double_support_since.take() {
                let duration_ms = timestamp.millis_since(&entered);
                if self.double_support_ms.len() == self.config.double_support_history {
                    self.double_support_ms.pop_front();
                }
                self.double_support_ms.push_back(duration_ms);
                debug!(duration_ms, "double support interval recorded");
            }
        }
        self.in_double_support = in_double_support;
    }
}

impl CadenceSource for StepDetector {
    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self) -> MetricEstimate {
        match self.counted_cadence {
            Some(spm) => {
                let total = self.steps.left.len() + self.steps.right.len();
                let confidence = (total as f64 / FULL_CONFIDENCE_STEP_COUNT).clamp(0.0, 1.0);
                MetricEstimate::from_confidence(spm, confidence)
            }
            None => MetricEstimate::unavailable(),
        }
    }
}

impl Resettable for StepDetector {
    fn reset(&mut self) {
        self.steps = SidePair::default();
        self.previous_vy = SidePair::default();
        self.in_double_support = false;
        self.double_support_since = None;
        self.double_support_ms.clear();
        self.length_symmetry_ratio = None;
        self.time_symmetry_ratio = None;
        self.counted_cadence = None;
    }
}
