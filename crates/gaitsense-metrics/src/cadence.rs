//! Cadence estimation.
//!
//! Two estimators feed the session cadence: the [`StepDetector`]'s
//! step-counted value and the [`SignalCadenceEstimator`], which finds
//! the dominant period of the vertical ankle motion by autocorrelation.
//! [`BlendedCadence`] fuses them: counted values load directly while
//! signal estimates blend in exponentially. [`PhaseTransitionCadence`]
//! is an alternative counter driven by published gait phases.
//!
//! [`StepDetector`]: crate::steps::StepDetector

use gaitsense_core::utils::mean;
use gaitsense_core::{KeypointType, Pose, Resettable, Timestamp};
use tracing::debug;

use crate::config::CadenceConfig;
use crate::steps::FULL_CONFIDENCE_STEP_COUNT;
use crate::types::{GaitPhase, MetricEstimate};

/// A source of cadence estimates.
pub trait CadenceSource {
    /// Latest cadence estimate in steps per minute.
    fn estimate(&self) -> MetricEstimate;
}

/// Fills missing samples in place.
///
/// Interior gaps are linearly interpolated between their neighbors;
/// leading and trailing gaps repeat the nearest observation. A signal
/// with no observations at all is left untouched.
pub(crate) fn fill_gaps(signal: &mut [Option<f64>]) {
    let mut last_valid: Option<(usize, f64)> = None;
    for i in 0..signal.len() {
        if let Some(end) = signal[i] {
            if let Some((prev_idx, start)) = last_valid {
                let gap = i - prev_idx;
                if gap > 1 {
                    for j in 1..gap {
                        #[allow(clippy::cast_precision_loss)]
                        let fraction = j as f64 / gap as f64;
                        signal[prev_idx + j] = Some(start + (end - start) * fraction);
                    }
                }
            }
            last_valid = Some((i, end));
        }
    }

    if let Some((last_idx, value)) = last_valid {
        for slot in &mut signal[last_idx + 1..] {
            *slot = Some(value);
        }
    }
    if let Some(first_idx) = signal.iter().position(Option::is_some) {
        let first = signal[first_idx];
        for slot in &mut signal[..first_idx] {
            *slot = first;
        }
    }
}

/// Finds the lag with the strongest positive autocorrelation.
///
/// The signal is mean-subtracted and lags `[min_lag, len/2)` are
/// searched. A candidate must be a local maximum: smooth signals stay
/// positively correlated at small lags, and a plain argmax would lock
/// onto that shoulder instead of the period. Returns the best lag and
/// its correlation normalized by the zero-lag autocorrelation, or
/// `None` when the signal has no energy or no periodic structure.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn autocorrelation_peak(samples: &[f64], min_lag: usize) -> Option<(usize, f64)> {
    let len = samples.len();
    let average = mean(samples);
    let centered: Vec<f64> = samples.iter().map(|v| v - average).collect();
    let energy = centered.iter().map(|v| v * v).sum::<f64>() / len as f64;
    if energy <= f64::EPSILON {
        return None;
    }

    let max_lag = len / 2;
    if min_lag == 0 || min_lag >= max_lag {
        return None;
    }
    let correlation = |lag: usize| -> f64 {
        let products: f64 = centered[..len - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        products / (len - lag) as f64 / energy
    };

    let mut best: Option<(usize, f64)> = None;
    let mut previous = correlation(min_lag - 1);
    let mut current = correlation(min_lag);
    for lag in min_lag..max_lag {
        let next = correlation(lag + 1);
        let local_max = current > previous && current >= next;
        if local_max && current > best.map_or(0.0, |(_, value)| value) {
            best = Some((lag, current));
        }
        previous = current;
        current = next;
    }
    best
}

/// Cadence from the periodicity of vertical ankle motion.
#[derive(Debug)]
pub struct SignalCadenceEstimator {
    config: CadenceConfig,
    latest: Option<MetricEstimate>,
}

impl SignalCadenceEstimator {
    /// Creates an estimator.
    pub fn new(config: CadenceConfig) -> Self {
        Self {
            config,
            latest: None,
        }
    }

    /// Analyzes a window of recent poses and returns the fresh
    /// estimate, if the window was periodic.
    ///
    /// Each side's ankle height series is gap-filled and searched for
    /// its autocorrelation peak independently; estimates from both
    /// sides are averaged. The estimate confidence is the normalized
    /// peak correlation.
    pub fn update(&mut self, recent: &[&Pose]) -> Option<MetricEstimate> {
        let left = self.side_cadence(recent, KeypointType::LeftAnkle);
        let right = self.side_cadence(recent, KeypointType::RightAnkle);

        let estimate = match (left, right) {
            (Some((left_spm, left_peak)), Some((right_spm, right_peak))) => {
                MetricEstimate::from_confidence(
                    (left_spm + right_spm) / 2.0,
                    (left_peak + right_peak) / 2.0,
                )
            }
            (Some((spm, peak)), None) | (None, Some((spm, peak))) => {
                MetricEstimate::from_confidence(spm, peak)
            }
            (None, None) => return None,
        };

        debug!(
            cadence_spm = estimate.value,
            confidence = estimate.confidence,
            "signal cadence estimated"
        );
        self.latest = Some(estimate.clone());
        Some(estimate)
    }

    #[allow(clippy::cast_precision_loss)]
    fn side_cadence(&self, recent: &[&Pose], ankle: KeypointType) -> Option<(f64, f64)> {
        let mut signal: Vec<Option<f64>> = recent
            .iter()
            .map(|pose| {
                pose.visible_keypoint(ankle, self.config.ankle_confidence_threshold)
                    .map(|kp| kp.y)
            })
            .collect();
        fill_gaps(&mut signal);

        let samples: Vec<f64> = signal.into_iter().collect::<Option<Vec<f64>>>()?;
        if samples.len() < self.config.min_signal_len {
            return None;
        }

        let (lag, peak) = autocorrelation_peak(&samples, self.config.min_lag)?;
        let period_s = lag as f64 / self.config.fps;
        // One gait cycle carries a step of each foot
        Some((60.0 / period_s * 2.0, peak.clamp(0.0, 1.0)))
    }
}

impl CadenceSource for SignalCadenceEstimator {
    fn estimate(&self) -> MetricEstimate {
        self.latest
            .clone()
            .unwrap_or_else(MetricEstimate::unavailable)
    }
}

impl Resettable for SignalCadenceEstimator {
    fn reset(&mut self) {
        self.latest = None;
    }
}

/// Running cadence fused from multiple sources.
///
/// Step-counted values replace the running value directly; signal
/// estimates blend in exponentially so a momentary misdetection cannot
/// drag the cadence far.
#[derive(Debug)]
pub struct BlendedCadence {
    blend_alpha: f64,
    current: Option<f64>,
    confidence: f64,
}

impl BlendedCadence {
    /// Creates an empty fusion state.
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            blend_alpha: config.blend_alpha,
            current: None,
            confidence: 0.0,
        }
    }

    /// Loads an authoritative estimate, replacing the running value.
    pub fn load(&mut self, estimate: &MetricEstimate) {
        if !estimate.is_usable() {
            return;
        }
        self.current = Some(estimate.value);
        self.confidence = estimate.confidence;
    }

    /// Blends an estimate into the running value. The first usable
    /// estimate loads directly.
    pub fn blend(&mut self, estimate: &MetricEstimate) {
        if !estimate.is_usable() {
            return;
        }
        match self.current {
            Some(previous) => {
                self.current =
                    Some(self.blend_alpha * estimate.value + (1.0 - self.blend_alpha) * previous);
                self.confidence = self.blend_alpha * estimate.confidence
                    + (1.0 - self.blend_alpha) * self.confidence;
            }
            None => {
                self.current = Some(estimate.value);
                self.confidence = estimate.confidence;
            }
        }
    }
}

impl CadenceSource for BlendedCadence {
    fn estimate(&self) -> MetricEstimate {
        match self.current {
            Some(spm) => MetricEstimate::from_confidence(spm, self.confidence),
            None => MetricEstimate::unavailable(),
        }
    }
}

impl Resettable for BlendedCadence {
    fn reset(&mut self) {
        self.current = None;
        self.confidence = 0.0;
    }
}

/// Cadence from counting entries into swing phases.
///
/// Each entry into a left or right swing counts one step; double
/// support re-arms both sides. The rate is taken over the full span of
/// observed frames.
#[derive(Debug, Default)]
pub struct PhaseTransitionCadence {
    in_left_swing: bool,
    in_right_swing: bool,
    step_count: usize,
    window_start: Option<Timestamp>,
    latest: Option<Timestamp>,
}

impl PhaseTransitionCadence {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one classified frame.
    pub fn observe(&mut self, phase: GaitPhase, timestamp: Timestamp) {
        if self.window_start.is_none() {
            self.window_start = Some(timestamp);
        }
        self.latest = Some(timestamp);

        match phase {
            GaitPhase::LeftSwing => {
                if !self.in_left_swing {
                    self.step_count += 1;
                    self.in_left_swing = true;
                    self.in_right_swing = false;
                }
            }
            GaitPhase::RightSwing => {
                if !self.in_right_swing {
                    self.step_count += 1;
                    self.in_right_swing = true;
                    self.in_left_swing = false;
                }
            }
            GaitPhase::DoubleSupport => {
                self.in_left_swing = false;
                self.in_right_swing = false;
            }
            GaitPhase::Transition | GaitPhase::Unknown => {}
        }
    }

    /// Steps counted so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }
}

impl CadenceSource for PhaseTransitionCadence {
    #[allow(clippy::cast_precision_loss)]
    fn estimate(&self) -> MetricEstimate {
        let (Some(start), Some(end)) = (self.window_start, self.latest) else {
            return MetricEstimate::unavailable();
        };
        let minutes = end.duration_since(&start) / 60.0;
        if minutes <= 0.0 || self.step_count == 0 {
            return MetricEstimate::unavailable();
        }
        let confidence = (self.step_count as f64 / FULL_CONFIDENCE_STEP_COUNT).clamp(0.0, 1.0);
        MetricEstimate::from_confidence(self.step_count as f64 / minutes, confidence)
    }
}

impl Resettable for PhaseTransitionCadence {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricStatus;
    use gaitsense_core::{Confidence, Keypoint};

    fn ankle_pose(ts_ms: i64, left_y: f64, right_y: f64, confidence: f32) -> Pose {
        let mut pose = Pose::new(Timestamp::from_millis(ts_ms));
        pose.set_keypoint(Keypoint::new(
            KeypointType::LeftAnkle,
            100.0,
            left_y,
            Confidence::clamped(confidence),
        ));
        pose.set_keypoint(Keypoint::new(
            KeypointType::RightAnkle,
            200.0,
            right_y,
            Confidence::clamped(confidence),
        ));
        pose
    }

    #[test]
    fn fill_gaps_interpolates_interior() {
        let mut signal = vec![Some(0.0), None, None, Some(3.0)];
        fill_gaps(&mut signal);
        assert_eq!(signal, vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn fill_gaps_extends_edges() {
        let mut signal = vec![None, Some(5.0), None];
        fill_gaps(&mut signal);
        assert_eq!(signal, vec![Some(5.0), Some(5.0), Some(5.0)]);
    }

    #[test]
    fn fill_gaps_leaves_empty_signal() {
        let mut signal: Vec<Option<f64>> = vec![None, None, None];
        fill_gaps(&mut signal);
        assert!(signal.iter().all(Option::is_none));
    }

    #[test]
    fn autocorrelation_finds_period() {
        let signal: Vec<f64> = (0..40)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 10.0).sin())
            .collect();
        let (lag, peak) = autocorrelation_peak(&signal, 5).unwrap();
        assert_eq!(lag, 10);
        assert!(peak > 0.99);
    }

    #[test]
    fn autocorrelation_rejects_flat_signal() {
        assert!(autocorrelation_peak(&[7.0; 40], 5).is_none());
    }

    #[test]
    fn signal_estimator_recovers_sinusoid_cadence() {
        // Half-second gait cycle at 30 fps: 15 frames per period
        let poses: Vec<Pose> = (0..45)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * f64::from(i) / 15.0;
                ankle_pose(
                    i64::from(i) * 33,
                    400.0 + 20.0 * phase.sin(),
                    400.0 - 20.0 * phase.sin(),
                    0.9,
                )
            })
            .collect();
        let refs: Vec<&Pose> = poses.iter().collect();

        let mut estimator = SignalCadenceEstimator::new(CadenceConfig::default());
        let estimate = estimator.update(&refs).unwrap();
        assert!((estimate.value - 240.0).abs() < 1e-9);
        assert_eq!(estimate.status, MetricStatus::Valid);
        assert_eq!(estimator.estimate().status, MetricStatus::Valid);
    }

    #[test]
    fn signal_estimator_skips_gated_ankles() {
        let poses: Vec<Pose> = (0..45i64)
            .map(|i| ankle_pose(i * 33, 400.0, 400.0, 0.3))
            .collect();
        let refs: Vec<&Pose> = poses.iter().collect();

        let mut estimator = SignalCadenceEstimator::new(CadenceConfig::default());
        assert!(estimator.update(&refs).is_none());
        assert_eq!(estimator.estimate().status, MetricStatus::Unavailable);
    }

    #[test]
    fn blended_cadence_loads_then_blends() {
        let mut blended = BlendedCadence::new(&CadenceConfig::default());
        assert_eq!(blended.estimate().status, MetricStatus::Unavailable);

        blended.blend(&MetricEstimate::from_confidence(120.0, 0.8));
        assert!((blended.estimate().value - 120.0).abs() < 1e-9);

        blended.blend(&MetricEstimate::from_confidence(100.0, 0.8));
        assert!((blended.estimate().value - 114.0).abs() < 1e-9);

        blended.load(&MetricEstimate::from_confidence(130.0, 0.9));
        assert!((blended.estimate().value - 130.0).abs() < 1e-9);
    }

    #[test]
    fn blended_cadence_ignores_unavailable() {
        let mut blended = BlendedCadence::new(&CadenceConfig::default());
        blended.load(&MetricEstimate::from_confidence(110.0, 0.9));
        blended.blend(&MetricEstimate::unavailable());
        blended.load(&MetricEstimate::unavailable());
        assert!((blended.estimate().value - 110.0).abs() < 1e-9);
    }

    #[test]
    fn phase_transition_cadence_counts_swing_entries() {
        let mut counter = PhaseTransitionCadence::new();
        let phases = [
            GaitPhase::DoubleSupport,
            GaitPhase::LeftSwing,
            GaitPhase::LeftSwing,
            GaitPhase::DoubleSupport,
            GaitPhase::RightSwing,
            GaitPhase::RightSwing,
            GaitPhase::LeftSwing,
        ];
        for (i, phase) in phases.iter().enumerate() {
            counter.observe(*phase, Timestamp::from_millis(i as i64 * 500));
        }

        assert_eq!(counter.step_count(), 3);
        // Three steps over three seconds
        let estimate = counter.estimate();
        assert!((estimate.value - 60.0).abs() < 1e-9);
    }

    #[test]
    fn phase_transition_cadence_needs_elapsed_time() {
        let mut counter = PhaseTransitionCadence::new();
        counter.observe(GaitPhase::LeftSwing, Timestamp::from_millis(0));
        assert_eq!(counter.estimate().status, MetricStatus::Unavailable);

        counter.reset();
        assert_eq!(counter.step_count(), 0);
    }

    #[test]
    fn sources_are_object_safe() {
        let sources: Vec<Box<dyn CadenceSource>> = vec![
            Box::new(BlendedCadence::new(&CadenceConfig::default())),
            Box::new(PhaseTransitionCadence::new()),
        ];
        for source in &sources {
            assert_eq!(source.estimate().status, MetricStatus::Unavailable);
        }
    }
}
