//! Markerless gait analysis over 2D pose streams.
//!
//! Turns per-frame COCO-17 landmark detections into clinically oriented
//! gait metrics: balance, movement symmetry, postural stability, steps
//! and strides, cadence, double support, and a whole-session assessment
//! with threshold-driven observations.
//!
//! # Architecture
//!
//! Each frame flows through five stages:
//!
//! 1. **Smoothing** ([`PoseSmoother`]): recency-weighted averaging with
//!    per-joint scalar Kalman filtering to suppress landmark jitter.
//! 2. **Kinematics** ([`kinematics`]): per-frame balance, symmetry,
//!    stability, joint angles, filtered hip-center velocity, and foot
//!    load estimation.
//! 3. **Step detection** ([`StepDetector`]): vertical ankle velocity
//!    reversal and knee extension triggers with debouncing, feeding
//!    stride history, symmetry ratios and double-support tracking.
//! 4. **Cadence** ([`SignalCadenceEstimator`], [`BlendedCadence`]):
//!    step-counted cadence fused with an autocorrelation estimate of
//!    the ankle height signal.
//! 5. **Aggregation** ([`summary::summarize`]): the session summary
//!    with an overall score, joint ranges of motion and clinical notes.
//!
//! [`GaitAnalyzer`] orchestrates all five and owns the session state.
//!
//! # Example
//!
//! ```
//! use gaitsense_core::{Confidence, Keypoint, KeypointType, Pose, Timestamp};
//! use gaitsense_metrics::{GaitAnalyzer, GaitAnalyzerConfig};
//!
//! let mut analyzer = GaitAnalyzer::new(GaitAnalyzerConfig::default()).unwrap();
//!
//! // Feed frames as they arrive from the pose model, ~30 fps
//! for (ts_ms, left_ankle_y) in [(0, 400.0), (33, 396.0), (66, 393.0)] {
//!     let mut pose = Pose::new(Timestamp::from_millis(ts_ms));
//!     pose.set_keypoint(Keypoint::new(
//!         KeypointType::LeftAnkle,
//!         120.0,
//!         left_ankle_y,
//!         Confidence::clamped(0.9),
//!     ));
//!     pose.set_keypoint(Keypoint::new(
//!         KeypointType::RightAnkle,
//!         180.0,
//!         400.0,
//!         Confidence::clamped(0.9),
//!     ));
//!     let snapshot = analyzer.process_frame(&pose, 1.0 / 30.0);
//!     println!("phase: {}", snapshot.phase);
//! }
//!
//! let summary = analyzer.summarize();
//! assert_eq!(summary.frames_analyzed, 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod cadence;
pub mod config;
pub mod kinematics;
pub mod smoother;
pub mod steps;
pub mod summary;
pub mod types;

pub use analyzer::GaitAnalyzer;
pub use cadence::{
    BlendedCadence, CadenceSource, PhaseTransitionCadence, SignalCadenceEstimator,
};
pub use config::{
    CadenceConfig, CalibrationFactors, GaitAnalyzerConfig, GaitAnalyzerConfigBuilder,
    KinematicsConfig, MetricRange, NormalRanges, NoteThresholds, ScoreWeights, SmootherConfig,
    StepDetectorConfig, SummaryConfig,
};
pub use kinematics::VelocityFilter;
pub use smoother::PoseSmoother;
pub use steps::{PhaseClassifier, StepDetector};
pub use summary::{compare_to_baseline, summarize};
pub use types::{
    AggregateSummary, BaselineDelta, FootPressure, FootSide, GaitCycleMetrics, GaitNote,
    GaitPhase, GaitSnapshot, JointAngles, JointRanges, MetricEstimate, MetricStatus, SidePair,
    StabilityMetrics, StepEvent, StrideSample, SymmetryScores,
};
