//! Gait metric domain types.

use gaitsense_core::{KeypointType, Point2, SessionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Status of a gait metric measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricStatus {
    /// Valid measurement with assessment-grade confidence.
    Valid,
    /// Measurement present but with reduced confidence.
    Degraded,
    /// Measurement unreliable (e.g., mostly occluded landmarks).
    Unreliable,
    /// No measurement possible.
    Unavailable,
}

/// A single gait metric estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEstimate {
    /// Estimated value in the metric's natural unit.
    pub value: f64,
    /// Confidence in the estimate [0.0, 1.0].
    pub confidence: f64,
    /// Measurement status.
    pub status: MetricStatus,
}

impl MetricEstimate {
    /// Create an estimate whose status is derived from its confidence.
    pub fn from_confidence(value: f64, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let status = if confidence >= 0.7 {
            MetricStatus::Valid
        } else if confidence >= 0.4 {
            MetricStatus::Degraded
        } else {
            MetricStatus::Unreliable
        };
        Self {
            value,
            confidence,
            status,
        }
    }

    /// Create an unavailable estimate (no measurement possible).
    pub fn unavailable() -> Self {
        Self {
            value: 0.0,
            confidence: 0.0,
            status: MetricStatus::Unavailable,
        }
    }

    /// Whether the estimate carries a real measurement.
    pub fn is_usable(&self) -> bool {
        self.status != MetricStatus::Unavailable
    }
}

impl Default for MetricEstimate {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Phase of the gait cycle for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitPhase {
    /// Left foot is swinging forward.
    LeftSwing,
    /// Right foot is swinging forward.
    RightSwing,
    /// Both feet are in ground contact.
    DoubleSupport,
    /// Ambiguous motion between recognizable phases.
    Transition,
    /// Landmarks insufficient to classify.
    #[default]
    Unknown,
}

impl GaitPhase {
    /// Snake-case phase label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LeftSwing => "left_swing",
            Self::RightSwing => "right_swing",
            Self::DoubleSupport => "double_support",
            Self::Transition => "transition",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GaitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which foot an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootSide {
    /// Left foot.
    Left,
    /// Right foot.
    Right,
}

impl FootSide {
    /// The other foot.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Lowercase side label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Hip keypoint for this side.
    pub fn hip(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftHip,
            Self::Right => KeypointType::RightHip,
        }
    }

    /// Knee keypoint for this side.
    pub fn knee(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftKnee,
            Self::Right => KeypointType::RightKnee,
        }
    }

    /// Ankle keypoint for this side.
    pub fn ankle(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftAnkle,
            Self::Right => KeypointType::RightAnkle,
        }
    }

    /// Shoulder keypoint for this side.
    pub fn shoulder(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftShoulder,
            Self::Right => KeypointType::RightShoulder,
        }
    }

    /// Elbow keypoint for this side.
    pub fn elbow(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftElbow,
            Self::Right => KeypointType::RightElbow,
        }
    }

    /// Wrist keypoint for this side.
    pub fn wrist(&self) -> KeypointType {
        match self {
            Self::Left => KeypointType::LeftWrist,
            Self::Right => KeypointType::RightWrist,
        }
    }
}

/// Left/right container indexed by [`FootSide`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SidePair<T> {
    /// Left-side value.
    pub left: T,
    /// Right-side value.
    pub right: T,
}

impl<T> SidePair<T> {
    /// Create a pair from explicit sides.
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Borrow the value for a side.
    pub fn get(&self, side: FootSide) -> &T {
        match side {
            FootSide::Left => &self.left,
            FootSide::Right => &self.right,
        }
    }

    /// Mutably borrow the value for a side.
    pub fn get_mut(&mut self, side: FootSide) -> &mut T {
        match side {
            FootSide::Left => &mut self.left,
            FootSide::Right => &mut self.right,
        }
    }
}

/// Stride measurement attached to a detected step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrideSample {
    /// Stride length in meters.
    pub length_m: f64,
    /// Time since the previous same-side step in seconds.
    pub time_s: f64,
    /// Stride velocity in meters per second.
    pub velocity_mps: f64,
}

/// A detected foot strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Foot that struck the ground.
    pub side: FootSide,
    /// Frame timestamp of the strike.
    pub timestamp: Timestamp,
    /// Ankle position at the strike, in pixels.
    pub position: Point2,
    /// Stride metrics, present once a previous same-side step exists.
    pub stride: Option<StrideSample>,
}

/// Per-joint sagittal angles for one frame, degrees.
///
/// An angle is `None` when its defining landmarks fail the confidence
/// gate for that frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    /// Hip flexion/extension angle per side.
    pub hip: SidePair<Option<f64>>,
    /// Knee flexion angle per side.
    pub knee: SidePair<Option<f64>>,
    /// Ankle angle relative to the horizontal per side.
    pub ankle: SidePair<Option<f64>>,
}

/// Observed range of motion per joint over a session, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointRanges {
    /// Hip range of motion per side.
    pub hip: SidePair<Option<f64>>,
    /// Knee range of motion per side.
    pub knee: SidePair<Option<f64>>,
    /// Ankle range of motion per side.
    pub ankle: SidePair<Option<f64>>,
}

/// Left/right movement symmetry scores, 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetryScores {
    /// Combined symmetry score.
    pub overall: MetricEstimate,
    /// Lower-body symmetry score.
    pub leg: MetricEstimate,
    /// Upper-body symmetry score.
    pub arm: MetricEstimate,
}

impl Default for SymmetryScores {
    fn default() -> Self {
        Self {
            overall: MetricEstimate::unavailable(),
            leg: MetricEstimate::unavailable(),
            arm: MetricEstimate::unavailable(),
        }
    }
}

/// Postural stability over a recent window of frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityMetrics {
    /// Stability score, 0-100.
    pub score: MetricEstimate,
    /// Normalized lateral sway.
    pub lateral_sway: f64,
    /// Normalized vertical sway.
    pub vertical_sway: f64,
    /// Head path smoothness [0.0, 1.0], when enough path points exist.
    pub path_smoothness: Option<f64>,
}

impl StabilityMetrics {
    /// Neutral placeholder used when landmarks are insufficient.
    pub fn neutral() -> Self {
        Self {
            score: MetricEstimate {
                value: 50.0,
                confidence: 0.0,
                status: MetricStatus::Unreliable,
            },
            lateral_sway: 0.5,
            vertical_sway: 0.5,
            path_smoothness: None,
        }
    }
}

impl Default for StabilityMetrics {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Foot load split estimated from ankle drop below the hips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootPressure {
    /// Left foot load percentage.
    pub left_pct: f64,
    /// Right foot load percentage.
    pub right_pct: f64,
}

/// Spatiotemporal gait cycle metrics derived from detected steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitCycleMetrics {
    /// Cadence in steps per minute.
    pub cadence: MetricEstimate,
    /// Mean stride length in meters.
    pub stride_length_m: MetricEstimate,
    /// Walking speed in meters per second.
    pub walking_speed_mps: MetricEstimate,
    /// Mean stride time in seconds.
    pub stride_time_s: MetricEstimate,
    /// Left/right stride length symmetry score, 0-100.
    pub step_symmetry: MetricEstimate,
    /// Double support share of the gait cycle, percent.
    pub double_support_pct: MetricEstimate,
    /// Detected step count per side.
    pub step_counts: SidePair<usize>,
}

impl GaitCycleMetrics {
    /// Total detected steps across both sides.
    pub fn total_steps(&self) -> usize {
        self.step_counts.left + self.step_counts.right
    }
}

impl Default for GaitCycleMetrics {
    fn default() -> Self {
        Self {
            cadence: MetricEstimate::unavailable(),
            stride_length_m: MetricEstimate::unavailable(),
            walking_speed_mps: MetricEstimate::unavailable(),
            stride_time_s: MetricEstimate::unavailable(),
            step_symmetry: MetricEstimate::unavailable(),
            double_support_pct: MetricEstimate::unavailable(),
            step_counts: SidePair::default(),
        }
    }
}

/// Per-frame analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitSnapshot {
    /// Capture time of the analyzed frame.
    pub timestamp: Timestamp,
    /// Zero-based index of the frame within the session.
    pub frame_index: u64,
    /// Filtered hip-center velocity in pixels per second.
    pub velocity: Point2,
    /// Balance score, 0-100.
    pub balance: MetricEstimate,
    /// Movement symmetry scores.
    pub symmetry: SymmetryScores,
    /// Postural stability over the recent window.
    pub stability: StabilityMetrics,
    /// Joint angles for this frame.
    pub joint_angles: JointAngles,
    /// Gait cycle phase for this frame.
    pub phase: GaitPhase,
    /// Cumulative gait cycle metrics.
    pub cycle: GaitCycleMetrics,
    /// Foot load split, when ankles are clearly visible.
    pub foot_pressure: Option<FootPressure>,
}

/// A clinical observation produced from session aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitNote {
    /// Metric the note refers to, e.g. `walking_speed`.
    pub metric: String,
    /// Short machine-readable note kind, e.g. `severely_reduced`.
    pub kind: String,
    /// Severity weight [0.0, 1.0].
    pub severity: f64,
    /// Human-readable observation.
    pub message: String,
}

impl GaitNote {
    /// Create a note.
    pub fn new(
        metric: impl Into<String>,
        kind: impl Into<String>,
        severity: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            metric: metric.into(),
            kind: kind.into(),
            severity,
            message: message.into(),
        }
    }
}

/// Whole-session gait assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    /// Session this summary was computed for.
    pub session_id: SessionId,
    /// Number of frames that contributed.
    pub frames_analyzed: usize,
    /// Weighted overall gait score, 0-100.
    pub overall_score: MetricEstimate,
    /// Mean walking speed in meters per second.
    pub walking_speed_mps: MetricEstimate,
    /// Cadence in steps per minute.
    pub cadence_spm: MetricEstimate,
    /// Mean stride length in meters.
    pub stride_length_m: MetricEstimate,
    /// Mean balance score, 0-100.
    pub balance: MetricEstimate,
    /// Mean stability score, 0-100.
    pub stability: MetricEstimate,
    /// Mean movement symmetry score, 0-100.
    pub symmetry: MetricEstimate,
    /// Stride symmetry score from step detection, 0-100.
    pub step_symmetry: MetricEstimate,
    /// Double support share of the gait cycle, percent.
    pub double_support_pct: MetricEstimate,
    /// Joint ranges of motion observed over the session.
    pub joint_ranges: JointRanges,
    /// Clinical observations derived from the aggregates.
    pub notes: Vec<GaitNote>,
}

/// Change of a session's aggregates against a stored baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineDelta {
    /// Walking speed change in percent of the baseline speed.
    pub speed_change_pct: Option<f64>,
    /// Balance score change in points.
    pub balance_change: Option<f64>,
    /// Stability score change in points.
    pub stability_change: Option<f64>,
    /// Symmetry score change in points.
    pub symmetry_change: Option<f64>,
    /// Overall score change in points.
    pub overall_change: f64,
    /// Whether the overall score regressed past the configured margin.
    pub regressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_status_from_confidence_tiers() {
        assert_eq!(
            MetricEstimate::from_confidence(1.0, 0.9).status,
            MetricStatus::Valid
        );
        assert_eq!(
            MetricEstimate::from_confidence(1.0, 0.5).status,
            MetricStatus::Degraded
        );
        assert_eq!(
            MetricEstimate::from_confidence(1.0, 0.1).status,
            MetricStatus::Unreliable
        );
    }

    #[test]
    fn metric_estimate_clamps_confidence() {
        let est = MetricEstimate::from_confidence(10.0, 1.5);
        assert!((est.confidence - 1.0).abs() < f64::EPSILON);
        let est = MetricEstimate::from_confidence(10.0, f64::NAN);
        assert!(est.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn metric_estimate_unavailable() {
        let est = MetricEstimate::unavailable();
        assert_eq!(est.status, MetricStatus::Unavailable);
        assert!(!est.is_usable());
        assert!(MetricEstimate::from_confidence(1.0, 0.0).is_usable());
    }

    #[test]
    fn gait_phase_labels() {
        assert_eq!(GaitPhase::LeftSwing.name(), "left_swing");
        assert_eq!(GaitPhase::DoubleSupport.to_string(), "double_support");
        assert_eq!(GaitPhase::default(), GaitPhase::Unknown);
    }

    #[test]
    fn foot_side_opposite() {
        assert_eq!(FootSide::Left.opposite(), FootSide::Right);
        assert_eq!(FootSide::Right.opposite(), FootSide::Left);
        assert_eq!(FootSide::Left.label(), "left");
    }

    #[test]
    fn side_pair_indexing() {
        let mut pair = SidePair::new(1, 2);
        assert_eq!(*pair.get(FootSide::Left), 1);
        *pair.get_mut(FootSide::Right) += 10;
        assert_eq!(pair.right, 12);
    }

    #[test]
    fn cycle_metrics_total_steps() {
        let mut cycle = GaitCycleMetrics::default();
        cycle.step_counts = SidePair::new(3, 4);
        assert_eq!(cycle.total_steps(), 7);
        assert_eq!(cycle.cadence.status, MetricStatus::Unavailable);
    }

    #[test]
    fn stability_neutral_placeholder() {
        let neutral = StabilityMetrics::neutral();
        assert!((neutral.score.value - 50.0).abs() < f64::EPSILON);
        assert_eq!(neutral.score.status, MetricStatus::Unreliable);
        assert!(neutral.path_smoothness.is_none());
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snapshot = GaitSnapshot {
            timestamp: Timestamp::from_millis(33),
            frame_index: 1,
            velocity: Point2::new(3.5, -0.2),
            balance: MetricEstimate::from_confidence(88.0, 0.9),
            symmetry: SymmetryScores::default(),
            stability: StabilityMetrics::neutral(),
            joint_angles: JointAngles::default(),
            phase: GaitPhase::LeftSwing,
            cycle: GaitCycleMetrics::default(),
            foot_pressure: Some(FootPressure {
                left_pct: 48.0,
                right_pct: 52.0,
            }),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GaitSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
        assert!(json.contains("left_swing"));
    }

    #[test]
    fn summary_serde_roundtrip() {
        let summary = AggregateSummary {
            session_id: SessionId::new(),
            frames_analyzed: 90,
            overall_score: MetricEstimate::from_confidence(87.0, 0.8),
            walking_speed_mps: MetricEstimate::from_confidence(1.2, 0.8),
            cadence_spm: MetricEstimate::from_confidence(112.0, 0.7),
            stride_length_m: MetricEstimate::from_confidence(0.7, 0.6),
            balance: MetricEstimate::from_confidence(91.0, 0.9),
            stability: MetricEstimate::from_confidence(89.0, 0.9),
            symmetry: MetricEstimate::from_confidence(94.0, 0.9),
            step_symmetry: MetricEstimate::from_confidence(96.0, 0.6),
            double_support_pct: MetricEstimate::unavailable(),
            joint_ranges: JointRanges::default(),
            notes: vec![GaitNote::new(
                "balance",
                "mildly_limited",
                0.5,
                "Mild to moderate balance limitations",
            )],
        };
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: AggregateSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
