//! Session orchestration.
//!
//! [`GaitAnalyzer`] owns the full pipeline state for one assessment
//! session: smoothing, kinematic calculators, step detection, the
//! cadence estimators and the snapshot log. Frames are processed
//! synchronously on the caller's thread; create one instance per
//! session and [`reset`](GaitAnalyzer::reset) it between subjects.

use std::collections::VecDeque;

use gaitsense_core::{
    Confidence, CoreResult, Point2, Pose, Resettable, SessionId, Validate,
};
use tracing::{info, instrument, warn};

use crate::cadence::{
    BlendedCadence, CadenceSource, PhaseTransitionCadence, SignalCadenceEstimator,
};
use crate::config::{CalibrationFactors, GaitAnalyzerConfig};
use crate::kinematics::{
    balance_score, estimate_foot_pressure, joint_angles, stability_metrics, symmetry_scores,
    VelocityFilter,
};
use crate::smoother::PoseSmoother;
use crate::steps::{PhaseClassifier, StepDetector};
use crate::summary;
use crate::types::{AggregateSummary, GaitPhase, GaitSnapshot, MetricEstimate, SidePair};

/// Frame-driven gait analysis session.
#[derive(Debug)]
pub struct GaitAnalyzer {
    config: GaitAnalyzerConfig,
    session_id: SessionId,
    smoother: PoseSmoother,
    velocity: VelocityFilter,
    phase: PhaseClassifier,
    steps: StepDetector,
    signal_cadence: SignalCadenceEstimator,
    transition_cadence: PhaseTransitionCadence,
    cadence: BlendedCadence,
    buffer: VecDeque<Pose>,
    snapshots: Vec<GaitSnapshot>,
    previous: Option<Pose>,
    frame_index: u64,
}

impl GaitAnalyzer {
    /// Creates an analyzer for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::Configuration`] when the configuration
    /// fails validation; this is the only fallible path.
    ///
    /// [`GaitError::Configuration`]: gaitsense_core::GaitError::Configuration
    pub fn new(config: GaitAnalyzerConfig) -> CoreResult<Self> {
        config.validate()?;
        let session_id = SessionId::new();
        let analyzer = Self {
            session_id,
            smoother: PoseSmoother::new(config.smoother.clone()),
            velocity: VelocityFilter::new(&config.kinematics),
            phase: PhaseClassifier::new(&config.steps),
            steps: StepDetector::new(
                config.steps.clone(),
                config.calibration.stride_scale_m_per_px,
            ),
            signal_cadence: SignalCadenceEstimator::new(config.cadence.clone()),
            transition_cadence: PhaseTransitionCadence::new(),
            cadence: BlendedCadence::new(&config.cadence),
            buffer: VecDeque::with_capacity(config.buffer_capacity),
            snapshots: Vec::new(),
            previous: None,
            frame_index: 0,
            config,
        };
        info!(session_id = %analyzer.session_id, "gait analyzer created");
        Ok(analyzer)
    }

    /// Processes one captured pose and returns the frame's snapshot.
    ///
    /// `delta_time_s` is the capture interval since the previous frame
    /// in seconds. The first frame of a session has no motion context,
    /// so its velocity is zero and its phase unknown. Degraded input
    /// never fails the frame; affected metrics come back
    /// `Unavailable`.
    #[instrument(skip(self, pose), fields(frame = self.frame_index))]
    pub fn process_frame(&mut self, pose: &Pose, delta_time_s: f64) -> GaitSnapshot {
        let floored = self.floor_confidence(pose);
        if floored.visible_count(self.config.keypoint_confidence_floor) == 0 {
            warn!("no keypoints above the confidence floor");
        }
        let smoothed = self.smoother.smooth(&floored);

        self.buffer.push_back(smoothed.clone());
        if self.buffer.len() > self.config.buffer_capacity {
            self.buffer.pop_front();
        }

        let (velocity, phase, new_steps) = match &self.previous {
            Some(previous) => (
                self.velocity.update(&smoothed, previous, delta_time_s),
                self.phase.classify(&smoothed, previous),
                self.steps.process(&smoothed, previous),
            ),
            None => (Point2::ZERO, self.phase.current(), 0),
        };
        self.transition_cadence.observe(phase, smoothed.timestamp);

        // Freshly counted steps overrule the running cadence; the
        // signal estimate only nudges it.
        if new_steps > 0 {
            self.cadence.load(&self.steps.estimate());
        }
        if self.buffer.len() >= self.config.cadence.window {
            let start = self.buffer.len() - self.config.cadence.window;
            let recent: Vec<&Pose> = self.buffer.iter().skip(start).collect();
            if let Some(estimate) = self.signal_cadence.update(&recent) {
                self.cadence.blend(&estimate);
            }
        }

        let balance = balance_score(&smoothed, &self.config.kinematics);
        let symmetry = symmetry_scores(&smoothed, &self.config.kinematics);
        let angles = joint_angles(&smoothed, &self.config.kinematics);
        let stability_start = self
            .buffer
            .len()
            .saturating_sub(self.config.kinematics.stability_window);
        let window: Vec<&Pose> = self.buffer.iter().skip(stability_start).collect();
        let stability = stability_metrics(&window, &self.config.kinematics);
        let foot_pressure = estimate_foot_pressure(
            &smoothed,
            self.config.steps.keypoint_confidence_threshold,
        );

        let snapshot = GaitSnapshot {
            timestamp: smoothed.timestamp,
            frame_index: self.frame_index,
            velocity,
            balance,
            symmetry,
            stability,
            joint_angles: angles,
            phase,
            cycle: self.steps.cycle_metrics(&self.cadence.estimate()),
            foot_pressure,
        };
        self.snapshots.push(snapshot.clone());
        self.previous = Some(smoothed);
        self.frame_index += 1;
        snapshot
    }

    /// Builds the whole-session assessment from the snapshot log.
    pub fn summarize(&self) -> AggregateSummary {
        summary::summarize(
            self.session_id,
            &self.snapshots,
            &self.steps.cycle_metrics(&self.cadence.estimate()),
            &self.config.summary,
        )
    }

    /// Re-derives pixel-to-world calibration from a subject height and
    /// applies it to subsequent stride measurements.
    pub fn calibrate_with_height(&mut self, height_cm: f64) -> CalibrationFactors {
        let factors = self.config.calibration.with_height(height_cm);
        self.config.calibration = factors;
        self.steps.set_stride_scale(factors.stride_scale_m_per_px);
        info!(
            height_cm = factors.height_estimate_cm,
            stride_scale_m_per_px = factors.stride_scale_m_per_px,
            "calibration updated"
        );
        factors
    }

    /// Clears every piece of session state and issues a new session ID.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.velocity.reset();
        self.phase.reset();
        self.steps.reset();
        self.signal_cadence.reset();
        self.transition_cadence.reset();
        self.cadence.reset();
        self.buffer.clear();
        self.snapshots.clear();
        self.previous = None;
        self.frame_index = 0;
        self.session_id = SessionId::new();
        info!(session_id = %self.session_id, "gait analyzer reset");
    }

    /// The current session's identifier.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// The active configuration.
    pub fn config(&self) -> &GaitAnalyzerConfig {
        &self.config
    }

    /// The full snapshot log for this session.
    pub fn snapshots(&self) -> &[GaitSnapshot] {
        &self.snapshots
    }

    /// The most recent `count` snapshots, oldest first.
    pub fn recent_snapshots(&self, count: usize) -> &[GaitSnapshot] {
        let start = self.snapshots.len().saturating_sub(count);
        &self.snapshots[start..]
    }

    /// Number of frames processed so far.
    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    /// Detected step counts per side.
    pub fn step_counts(&self) -> SidePair<usize> {
        self.steps.step_counts()
    }

    /// The currently published gait phase.
    pub fn current_phase(&self) -> GaitPhase {
        self.phase.current()
    }

    /// The fused session cadence in steps per minute.
    pub fn cadence(&self) -> MetricEstimate {
        self.cadence.estimate()
    }

    /// Cadence from counted swing-phase entries, independent of the
    /// fused estimate.
    pub fn phase_transition_cadence(&self) -> MetricEstimate {
        self.transition_cadence.estimate()
    }

    fn floor_confidence(&self, pose: &Pose) -> Pose {
        let mut floored = Pose::new(pose.timestamp);
        for keypoint in pose.keypoints() {
            let mut cleaned = *keypoint;
            if !keypoint
                .confidence
                .exceeds(self.config.keypoint_confidence_floor)
            {
                cleaned.confidence = Confidence::clamped(0.0);
            }
            floored.set_keypoint(cleaned);
        }
        floored
    }
}

impl Resettable for GaitAnalyzer {
    fn reset(&mut self) {
        GaitAnalyzer::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricStatus;
    use gaitsense_core::{Keypoint, KeypointType, Timestamp};

    fn standing_pose(ts_ms: i64, confidence: f32) -> Pose {
        let mut pose = Pose::new(Timestamp::from_millis(ts_ms));
        for (kind, x, y) in [
            (KeypointType::Nose, 100.0, 50.0),
            (KeypointType::LeftShoulder, 80.0, 100.0),
            (KeypointType::RightShoulder, 120.0, 100.0),
            (KeypointType::LeftHip, 85.0, 200.0),
            (KeypointType::RightHip, 115.0, 200.0),
            (KeypointType::LeftKnee, 85.0, 250.0),
            (KeypointType::RightKnee, 115.0, 250.0),
            (KeypointType::LeftAnkle, 85.0, 300.0),
            (KeypointType::RightAnkle, 115.0, 300.0),
        ] {
            pose.set_keypoint(Keypoint::new(kind, x, y, Confidence::clamped(confidence)));
        }
        pose
    }

    fn analyzer() -> GaitAnalyzer {
        GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn construction_rejects_invalid_config() {
        let config = GaitAnalyzerConfig {
            buffer_capacity: 10,
            ..GaitAnalyzerConfig::default()
        };
        assert!(GaitAnalyzer::new(config).is_err());
    }

    #[test]
    fn first_frame_has_no_motion_context() {
        let mut analyzer = analyzer();
        let snapshot = analyzer.process_frame(&standing_pose(0, 0.9), 1.0 / 30.0);

        assert_eq!(snapshot.frame_index, 0);
        assert_eq!(snapshot.velocity, Point2::ZERO);
        assert_eq!(snapshot.phase, GaitPhase::Unknown);
        assert_eq!(snapshot.cycle.cadence.status, MetricStatus::Unavailable);
        assert_eq!(analyzer.snapshots().len(), 1);
    }

    #[test]
    fn dim_keypoints_are_floored_before_analysis() {
        let mut analyzer = analyzer();
        let snapshot = analyzer.process_frame(&standing_pose(0, 0.3), 1.0 / 30.0);

        assert_eq!(snapshot.balance.status, MetricStatus::Unavailable);
        assert!(snapshot.foot_pressure.is_none());
        assert!(snapshot.joint_angles.knee.left.is_none());
    }

    #[test]
    fn buffer_stays_within_capacity() {
        let mut analyzer = analyzer();
        let capacity = analyzer.config().buffer_capacity;
        for i in 0..capacity + 10 {
            analyzer.process_frame(&standing_pose(i as i64 * 33, 0.9), 1.0 / 30.0);
        }

        assert_eq!(analyzer.buffer.len(), capacity);
        assert_eq!(analyzer.snapshots().len(), capacity + 10);
        assert_eq!(analyzer.frames_processed(), (capacity + 10) as u64);
    }

    #[test]
    fn recent_snapshots_returns_tail() {
        let mut analyzer = analyzer();
        for i in 0..5i64 {
            analyzer.process_frame(&standing_pose(i * 33, 0.9), 1.0 / 30.0);
        }

        assert_eq!(analyzer.recent_snapshots(2).len(), 2);
        assert_eq!(analyzer.recent_snapshots(2)[0].frame_index, 3);
        assert_eq!(analyzer.recent_snapshots(99).len(), 5);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut analyzer = analyzer();
        for i in 0..10i64 {
            analyzer.process_frame(&standing_pose(i * 33, 0.9), 1.0 / 30.0);
        }
        let old_session = analyzer.session_id();

        analyzer.reset();

        assert_ne!(analyzer.session_id(), old_session);
        assert!(analyzer.snapshots().is_empty());
        assert!(analyzer.buffer.is_empty());
        assert!(analyzer.previous.is_none());
        assert_eq!(analyzer.frames_processed(), 0);
        assert_eq!(analyzer.current_phase(), GaitPhase::Unknown);
        assert_eq!(analyzer.cadence().status, MetricStatus::Unavailable);
        assert_eq!(
            analyzer.phase_transition_cadence().status,
            MetricStatus::Unavailable
        );
        assert_eq!(analyzer.step_counts(), SidePair::new(0, 0));
        assert_eq!(analyzer.smoother.history_len(), 0);
    }

    #[test]
    fn calibration_updates_stride_scale() {
        let mut analyzer = analyzer();
        let factors = analyzer.calibrate_with_height(180.0);

        // Leg length 81 cm
        assert!((factors.stride_scale_m_per_px - 0.0151).abs() < 1e-9);
        assert!((factors.velocity_scale - 1.081).abs() < 1e-9);
        assert!((factors.height_estimate_cm - 180.0).abs() < 1e-9);
        assert_eq!(analyzer.config().calibration, factors);

        // Implausible heights keep the previous estimate
        let fallback = analyzer.calibrate_with_height(50.0);
        assert!((fallback.height_estimate_cm - 180.0).abs() < 1e-9);
    }

    #[test]
    fn static_pose_yields_no_steps() {
        let mut analyzer = analyzer();
        for i in 0..60i64 {
            analyzer.process_frame(&standing_pose(i * 33, 0.9), 1.0 / 30.0);
        }

        assert_eq!(analyzer.step_counts(), SidePair::new(0, 0));
        assert_eq!(analyzer.cadence().status, MetricStatus::Unavailable);
        let last = analyzer.recent_snapshots(1);
        assert_eq!(last[0].cycle.cadence.status, MetricStatus::Unavailable);
    }
}
