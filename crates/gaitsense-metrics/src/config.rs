//! Configuration for the gait analysis pipeline.
//!
//! All thresholds and windows are tunable. Defaults match the values the
//! pipeline was calibrated with for 30 fps webcam footage of a frontal or
//! slightly oblique walking view.

use gaitsense_core::{GaitError, Validate};
use serde::{Deserialize, Serialize};

/// Inclusive value range for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    /// Lower bound of the normal range.
    pub min: f64,
    /// Upper bound of the normal range.
    pub max: f64,
}

impl MetricRange {
    /// Create a range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Pose smoothing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmootherConfig {
    /// Number of recent poses in the smoothing window.
    pub window_size: usize,
    /// Minimum poses required before smoothing engages.
    pub min_history: usize,
    /// Confidence required before a joint's Kalman filter engages.
    pub kalman_confidence_threshold: f32,
    /// Kalman process noise.
    pub process_noise: f64,
    /// Kalman measurement noise.
    pub measurement_noise: f64,
    /// Initial Kalman error estimate.
    pub initial_error: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            min_history: 3,
            kalman_confidence_threshold: 0.65,
            process_noise: 0.01,
            measurement_noise: 0.1,
            initial_error: 1.0,
        }
    }
}

/// Weights for the balance score deductions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceWeights {
    /// Deduction per unit of vertical alignment deviation.
    pub vertical: f64,
    /// Deduction per unit of sagittal (hip over ankle) deviation.
    pub sagittal: f64,
    /// Deduction per unit of left/right weight shift.
    pub weight_shift: f64,
    /// Deduction per unit of head alignment deviation.
    pub head: f64,
}

impl Default for BalanceWeights {
    fn default() -> Self {
        Self {
            vertical: 25.0,
            sagittal: 20.0,
            weight_shift: 15.0,
            head: 15.0,
        }
    }
}

/// Kinematic measurement configuration (balance, symmetry, stability,
/// joint angles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicsConfig {
    /// Confidence gate for leg joint measurements.
    pub joint_confidence_threshold: f32,
    /// Confidence gate for arm joint measurements.
    pub arm_confidence_threshold: f32,
    /// Exponential blend factor for velocity filtering (weight of the
    /// instantaneous sample).
    pub velocity_blend_alpha: f64,
    /// Number of recent poses used for the stability window.
    pub stability_window: usize,
    /// Pixel divisor that normalizes sway magnitudes.
    pub sway_divisor: f64,
    /// Horizontal offset in pixels for the ankle angle reference point.
    pub ankle_reference_offset_px: f64,
    /// Balance score deduction weights.
    pub balance_weights: BalanceWeights,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            joint_confidence_threshold: 0.5,
            arm_confidence_threshold: 0.3,
            velocity_blend_alpha: 0.7,
            stability_window: 15,
            sway_divisor: 100.0,
            ankle_reference_offset_px: 20.0,
            balance_weights: BalanceWeights::default(),
        }
    }
}

/// Step detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDetectorConfig {
    /// Confidence gate on ankles and knees for step detection.
    pub keypoint_confidence_threshold: f32,
    /// Upward ankle velocity (px/frame) that triggers a step on
    /// direction reversal.
    pub step_velocity_threshold: f64,
    /// Knee extension rate (deg/frame) that triggers a step, negative
    /// for extension.
    pub knee_rate_threshold: f64,
    /// Lower knee angle bound for the extension trigger, degrees.
    pub knee_angle_min: f64,
    /// Upper knee angle bound for the extension trigger, degrees.
    pub knee_angle_max: f64,
    /// Minimum time between steps of the same foot, milliseconds.
    pub debounce_ms: f64,
    /// Ankle velocity magnitude below which the foot counts as planted.
    pub stance_velocity_max: f64,
    /// Knee angle above which the leg counts as extended in stance.
    pub stance_knee_min: f64,
    /// Number of double support durations kept for averaging.
    pub double_support_history: usize,
    /// Number of recent strides per side used for symmetry ratios.
    pub symmetry_window: usize,
    /// Ankle velocity (px/frame) separating swing from stance when
    /// classifying the gait phase.
    pub phase_velocity_threshold: f64,
    /// Frames a new phase must persist before it is published. Zero
    /// publishes immediately.
    pub phase_min_dwell_frames: u32,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            keypoint_confidence_threshold: 0.6,
            step_velocity_threshold: 3.0,
            knee_rate_threshold: -8.0,
            knee_angle_min: 140.0,
            knee_angle_max: 160.0,
            debounce_ms: 300.0,
            stance_velocity_max: 1.0,
            stance_knee_min: 165.0,
            double_support_history: 10,
            symmetry_window: 3,
            phase_velocity_threshold: 0.5,
            phase_min_dwell_frames: 2,
        }
    }
}

/// Frequency-domain cadence estimation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Number of recent frames analyzed per estimate. Lags up to half
    /// the window are searched, so the window must span two periods of
    /// the slowest gait of interest.
    pub window: usize,
    /// Minimum valid samples required for an estimate.
    pub min_signal_len: usize,
    /// Smallest autocorrelation lag considered, in frames.
    pub min_lag: usize,
    /// Confidence gate for ankle samples entering the signal.
    pub ankle_confidence_threshold: f32,
    /// Weight of a fresh signal estimate when blending into the running
    /// cadence.
    pub blend_alpha: f64,
    /// Assumed capture rate in frames per second.
    pub fps: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            window: 90,
            min_signal_len: 30,
            min_lag: 5,
            ankle_confidence_threshold: 0.6,
            blend_alpha: 0.3,
            fps: 30.0,
        }
    }
}

/// Normal ranges used for scoring session aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalRanges {
    /// Normal walking speed, m/s.
    pub walking_speed: MetricRange,
    /// Normal stride length, meters.
    pub stride_length: MetricRange,
    /// Normal step symmetry score.
    pub step_symmetry: MetricRange,
    /// Normal balance score.
    pub balance: MetricRange,
}

impl Default for NormalRanges {
    fn default() -> Self {
        Self {
            walking_speed: MetricRange::new(1.0, 1.4),
            stride_length: MetricRange::new(0.5, 0.8),
            step_symmetry: MetricRange::new(90.0, 100.0),
            balance: MetricRange::new(85.0, 100.0),
        }
    }
}

/// Thresholds that trigger clinical notes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteThresholds {
    /// Walking speed below which mobility is flagged as significantly
    /// limited, m/s.
    pub severe_speed_mps: f64,
    /// Cadence below which step frequency is flagged as reduced, spm.
    pub cadence_low_spm: f64,
    /// Cadence above which step frequency is flagged as increased, spm.
    pub cadence_high_spm: f64,
    /// Balance score below which impairment is flagged.
    pub balance_impaired: f64,
    /// Balance score below which mild limitation is flagged.
    pub balance_mild: f64,
    /// Stability score below which fall risk is flagged.
    pub stability_low: f64,
    /// Symmetry score below which asymmetry is flagged.
    pub symmetry_low: f64,
    /// Double support percentage above which cautious gait is flagged.
    pub double_support_high_pct: f64,
    /// Normal knee flexion during the gait cycle, degrees.
    pub normal_knee_flexion_deg: f64,
    /// Range-of-motion difference between sides flagged as asymmetric,
    /// degrees.
    pub rom_asymmetry_deg: f64,
    /// Ratio of one side's combined range of motion to the other below
    /// which that side is flagged as limited.
    pub side_rom_ratio: f64,
    /// Number of notes at which a comprehensive evaluation is
    /// recommended.
    pub comprehensive_note_count: usize,
}

impl Default for NoteThresholds {
    fn default() -> Self {
        Self {
            severe_speed_mps: 0.8,
            cadence_low_spm: 90.0,
            cadence_high_spm: 130.0,
            balance_impaired: 70.0,
            balance_mild: 85.0,
            stability_low: 70.0,
            symmetry_low: 80.0,
            double_support_high_pct: 30.0,
            normal_knee_flexion_deg: 60.0,
            rom_asymmetry_deg: 15.0,
            side_rom_ratio: 0.8,
            comprehensive_note_count: 3,
        }
    }
}

/// Component weights for the overall gait score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of the walking speed score.
    pub speed: f64,
    /// Weight of the balance score.
    pub balance: f64,
    /// Weight of the stability score.
    pub stability: f64,
    /// Weight of the movement symmetry score.
    pub symmetry: f64,
    /// Weight of the stride symmetry score.
    pub step_symmetry: f64,
}

impl ScoreWeights {
    /// Sum of all component weights.
    pub fn sum(&self) -> f64 {
        self.speed + self.balance + self.stability + self.symmetry + self.step_symmetry
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            speed: 0.25,
            balance: 0.2,
            stability: 0.2,
            symmetry: 0.2,
            step_symmetry: 0.15,
        }
    }
}

/// Session summary configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Normal metric ranges for scoring.
    pub normal_ranges: NormalRanges,
    /// Clinical note thresholds.
    pub thresholds: NoteThresholds,
    /// Overall score component weights.
    pub weights: ScoreWeights,
    /// Minimum samples per joint before a range of motion is reported.
    pub min_rom_samples: usize,
    /// Overall score drop against a baseline that counts as regression,
    /// points.
    pub baseline_regression_margin: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            normal_ranges: NormalRanges::default(),
            thresholds: NoteThresholds::default(),
            weights: ScoreWeights::default(),
            min_rom_samples: 5,
            baseline_regression_margin: 10.0,
        }
    }
}

/// Pixel-to-world calibration factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFactors {
    /// Multiplier applied to pixel velocities.
    pub velocity_scale: f64,
    /// Meters per pixel for stride lengths.
    pub stride_scale_m_per_px: f64,
    /// Subject height estimate, centimeters.
    pub height_estimate_cm: f64,
}

impl CalibrationFactors {
    /// Derive calibration factors from a subject height.
    ///
    /// Heights outside the plausible 100-220 cm range fall back to the
    /// current height estimate. Scale factors follow an anthropometric
    /// leg length of 45% of body height.
    pub fn with_height(&self, height_cm: f64) -> Self {
        let height = if height_cm.is_finite() && (100.0..=220.0).contains(&height_cm) {
            height_cm
        } else {
            self.height_estimate_cm
        };
        let leg_length_cm = height * 0.45;
        Self {
            velocity_scale: 1.0 + leg_length_cm / 1000.0,
            stride_scale_m_per_px: 0.007 + leg_length_cm / 10_000.0,
            height_estimate_cm: height,
        }
    }
}

impl Default for CalibrationFactors {
    fn default() -> Self {
        Self {
            velocity_scale: 1.2,
            stride_scale_m_per_px: 0.01,
            height_estimate_cm: 170.0,
        }
    }
}

/// Top-level analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitAnalyzerConfig {
    /// Keypoints below this confidence are zeroed before analysis.
    pub keypoint_confidence_floor: f32,
    /// Number of smoothed poses retained for windowed analysis.
    pub buffer_capacity: usize,
    /// Pose smoothing settings.
    pub smoother: SmootherConfig,
    /// Kinematic measurement settings.
    pub kinematics: KinematicsConfig,
    /// Step detection settings.
    pub steps: StepDetectorConfig,
    /// Frequency-domain cadence settings.
    pub cadence: CadenceConfig,
    /// Session summary settings.
    pub summary: SummaryConfig,
    /// Pixel-to-world calibration.
    pub calibration: CalibrationFactors,
}

impl GaitAnalyzerConfig {
    /// Create a configuration builder.
    pub fn builder() -> GaitAnalyzerConfigBuilder {
        GaitAnalyzerConfigBuilder::default()
    }
}

/// Builder for [`GaitAnalyzerConfig`].
#[derive(Debug, Default)]
pub struct GaitAnalyzerConfigBuilder {
    config: GaitAnalyzerConfig,
}

impl GaitAnalyzerConfigBuilder {
    /// Set the keypoint confidence floor.
    pub fn keypoint_confidence_floor(mut self, floor: f32) -> Self {
        self.config.keypoint_confidence_floor = floor.clamp(0.0, 1.0);
        self
    }

    /// Set the pose buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity.max(1);
        self
    }

    /// Set the smoothing window size.
    pub fn smoothing_window(mut self, window: usize) -> Self {
        self.config.smoother.window_size = window.max(1);
        self
    }

    /// Set the same-foot step debounce interval.
    pub fn step_debounce_ms(mut self, debounce: f64) -> Self {
        self.config.steps.debounce_ms = debounce.max(0.0);
        self
    }

    /// Set the assumed capture rate for cadence estimation.
    pub fn fps(mut self, fps: f64) -> Self {
        self.config.cadence.fps = fps.max(1.0);
        self
    }

    /// Replace the smoothing settings.
    pub fn smoother(mut self, smoother: SmootherConfig) -> Self {
        self.config.smoother = smoother;
        self
    }

    /// Replace the kinematic settings.
    pub fn kinematics(mut self, kinematics: KinematicsConfig) -> Self {
        self.config.kinematics = kinematics;
        self
    }

    /// Replace the step detection settings.
    pub fn steps(mut self, steps: StepDetectorConfig) -> Self {
        self.config.steps = steps;
        self
    }

    /// Replace the cadence settings.
    pub fn cadence(mut self, cadence: CadenceConfig) -> Self {
        self.config.cadence = cadence;
        self
    }

    /// Replace the summary settings.
    pub fn summary(mut self, summary: SummaryConfig) -> Self {
        self.config.summary = summary;
        self
    }

    /// Replace the calibration factors.
    pub fn calibration(mut self, calibration: CalibrationFactors) -> Self {
        self.config.calibration = calibration;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> GaitAnalyzerConfig {
        self.config
    }
}

impl Default for GaitAnalyzerConfig {
    fn default() -> Self {
        Self {
            keypoint_confidence_floor: 0.4,
            buffer_capacity: 90,
            smoother: SmootherConfig::default(),
            kinematics: KinematicsConfig::default(),
            steps: StepDetectorConfig::default(),
            cadence: CadenceConfig::default(),
            summary: SummaryConfig::default(),
            calibration: CalibrationFactors::default(),
        }
    }
}

impl Validate for GaitAnalyzerConfig {
    fn validate(&self) -> gaitsense_core::CoreResult<()> {
        if !(0.0..=1.0).contains(&self.keypoint_confidence_floor) {
            return Err(GaitError::configuration(
                "keypoint confidence floor must be within [0, 1]",
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(GaitError::configuration("buffer capacity must be positive"));
        }
        if self.smoother.window_size == 0 {
            return Err(GaitError::configuration("smoothing window must be positive"));
        }
        if self.smoother.min_history == 0 || self.smoother.min_history > self.smoother.window_size {
            return Err(GaitError::configuration(
                "smoothing history must be within [1, window_size]",
            ));
        }
        if self.smoother.process_noise <= 0.0 || self.smoother.measurement_noise <= 0.0 {
            return Err(GaitError::configuration("Kalman noise must be positive"));
        }
        if !(0.0..=1.0).contains(&self.kinematics.velocity_blend_alpha) {
            return Err(GaitError::configuration(
                "velocity blend alpha must be within [0, 1]",
            ));
        }
        if self.kinematics.stability_window == 0 {
            return Err(GaitError::configuration("stability window must be positive"));
        }
        if self.kinematics.sway_divisor <= 0.0 {
            return Err(GaitError::configuration("sway divisor must be positive"));
        }
        if self.steps.knee_angle_min >= self.steps.knee_angle_max {
            return Err(GaitError::configuration(
                "knee angle band must satisfy min < max",
            ));
        }
        if self.steps.debounce_ms < 0.0 {
            return Err(GaitError::configuration("step debounce must be non-negative"));
        }
        if self.cadence.min_lag == 0 {
            return Err(GaitError::configuration("cadence minimum lag must be positive"));
        }
        if self.cadence.min_signal_len <= self.cadence.min_lag * 2 {
            return Err(GaitError::configuration(
                "cadence signal length must exceed twice the minimum lag",
            ));
        }
        if self.cadence.window < self.cadence.min_signal_len {
            return Err(GaitError::configuration(
                "cadence window must cover the minimum signal length",
            ));
        }
        if !(0.0..=1.0).contains(&self.cadence.blend_alpha) {
            return Err(GaitError::configuration(
                "cadence blend alpha must be within [0, 1]",
            ));
        }
        if self.cadence.fps <= 0.0 {
            return Err(GaitError::configuration("fps must be positive"));
        }
        if self.buffer_capacity < self.cadence.window {
            return Err(GaitError::configuration(
                "buffer capacity must cover the cadence window",
            ));
        }
        if (self.summary.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(GaitError::configuration("score weights must sum to 1.0"));
        }
        if self.summary.normal_ranges.walking_speed.min >= self.summary.normal_ranges.walking_speed.max
            || self.summary.normal_ranges.stride_length.min
                >= self.summary.normal_ranges.stride_length.max
        {
            return Err(GaitError::configuration(
                "normal ranges must satisfy min < max",
            ));
        }
        if self.calibration.stride_scale_m_per_px <= 0.0 || self.calibration.velocity_scale <= 0.0 {
            return Err(GaitError::configuration(
                "calibration scales must be positive",
            ));
        }
        Ok(())
    }
}
