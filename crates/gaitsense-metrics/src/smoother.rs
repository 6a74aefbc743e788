//! Pose smoothing.
//!
//! Landmark detections from video frames jitter by a few pixels between
//! frames. The smoother conditions each pose with a weighted moving
//! average over a short window, then runs the load-bearing joints through
//! per-axis scalar Kalman filters once their confidence is high enough.
//! Confidence values pass through untouched.

use std::collections::VecDeque;

use gaitsense_core::utils::linear_weighted_mean;
use gaitsense_core::{Keypoint, KeypointType, Pose, PoseFilter, Resettable, KEYPOINT_COUNT};

use crate::config::SmootherConfig;

/// Joints stabilized with Kalman filtering in addition to the moving
/// average. These drive step detection and angle measurements.
const TRACKED_JOINTS: [KeypointType; 8] = [
    KeypointType::LeftHip,
    KeypointType::RightHip,
    KeypointType::LeftKnee,
    KeypointType::RightKnee,
    KeypointType::LeftAnkle,
    KeypointType::RightAnkle,
    KeypointType::LeftShoulder,
    KeypointType::RightShoulder,
];

/// One-dimensional Kalman filter with constant noise parameters.
#[derive(Debug, Clone)]
struct ScalarKalman {
    process_noise: f64,
    measurement_noise: f64,
    error: f64,
    estimate: f64,
    initialized: bool,
}

impl ScalarKalman {
    fn new(config: &SmootherConfig) -> Self {
        Self {
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            error: config.initial_error,
            estimate: 0.0,
            initialized: false,
        }
    }

    /// Folds a measurement into the estimate. The first measurement
    /// seeds the state and is returned unchanged.
    fn update(&mut self, measurement: f64) -> f64 {
        if !self.initialized {
            self.estimate = measurement;
            self.initialized = true;
            return measurement;
        }
        let gain = self.error / (self.error + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error = (1.0 - gain) * self.error + self.process_noise;
        self.estimate
    }
}

#[derive(Debug, Clone)]
struct JointFilter {
    x: ScalarKalman,
    y: ScalarKalman,
}

impl JointFilter {
    fn new(config: &SmootherConfig) -> Self {
        Self {
            x: ScalarKalman::new(config),
            y: ScalarKalman::new(config),
        }
    }
}

/// Stateful pose smoother.
///
/// Keeps a short window of recent poses and per-joint filter state.
/// Until the window holds `min_history` poses, input passes through
/// unchanged.
#[derive(Debug)]
pub struct PoseSmoother {
    config: SmootherConfig,
    window: VecDeque<Pose>,
    filters: [Option<JointFilter>; KEYPOINT_COUNT],
}

impl PoseSmoother {
    /// Creates a smoother with the given configuration.
    pub fn new(config: SmootherConfig) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            window: VecDeque::with_capacity(capacity),
            filters: std::array::from_fn(|_| None),
        }
    }

    /// Number of poses currently in the smoothing window.
    pub fn history_len(&self) -> usize {
        self.window.len()
    }

    /// Smooths a pose against the recent window.
    ///
    /// The input pose joins the window first, so a keypoint's own raw
    /// position always contributes the heaviest weight to its average.
    /// Keypoints absent from the input stay absent in the output, and
    /// keypoints with too little history pass through raw.
    pub fn smooth(&mut self, pose: &Pose) -> Pose {
        self.window.push_back(pose.clone());
        if self.window.len() > self.config.window_size {
            self.window.pop_front();
        }
        if self.window.len() < self.config.min_history {
            return pose.clone();
        }

        let mut smoothed = Pose::new(pose.timestamp);
        for kind in KeypointType::all() {
            let Some(current) = pose.get_keypoint(*kind) else {
                continue;
            };

            let mut xs = Vec::with_capacity(self.window.len());
            let mut ys = Vec::with_capacity(self.window.len());
            for past in &self.window {
                if let Some(kp) = past.get_keypoint(*kind) {
                    xs.push(kp.x);
                    ys.push(kp.y);
                }
            }
            if xs.len() < self.config.min_history {
                smoothed.set_keypoint(*current);
                continue;
            }

            let mut x = linear_weighted_mean(&xs);
            let mut y = linear_weighted_mean(&ys);

            if TRACKED_JOINTS.contains(kind)
                && current
                    .confidence
                    .exceeds(self.config.kalman_confidence_threshold)
            {
                let filter = self.filters[kind.index()]
                    .get_or_insert_with(|| JointFilter::new(&self.config));
                x = filter.x.update(x);
                y = filter.y.update(y);
            }

            let mut kp = Keypoint::new(*kind, x, y, current.confidence);
            if let Some(z) = current.z {
                kp = kp.with_z(z);
            }
            smoothed.set_keypoint(kp);
        }
        smoothed
    }
}

impl PoseFilter for PoseSmoother {
    fn apply(&mut self, pose: &Pose) -> Pose {
        self.smooth(pose)
    }
}

impl Resettable for PoseSmoother {
    fn reset(&mut self) {
        self.window.clear();
        self.filters = std::array::from_fn(|_| None);
    }
}
