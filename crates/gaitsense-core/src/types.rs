//! Core data types for the gaitsense pipeline.
//!
//! This module defines the fundamental data structures used throughout the
//! gaitsense ecosystem for representing detected poses and the landmarks
//! they are built from.
//!
//! # Type Categories
//!
//! - **Pose Types**: [`Pose`], [`Keypoint`], [`KeypointType`]
//! - **Geometry Types**: [`Point2`]
//! - **Common Types**: [`Confidence`], [`Timestamp`], [`SessionId`]

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, PoseError};

/// Number of keypoints in the COCO-17 pose format.
pub const KEYPOINT_COUNT: usize = 17;

// =============================================================================
// Common Types
// =============================================================================

/// Unique identifier for an assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new unique session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a session ID from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp attached to a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp {
    /// Seconds since Unix epoch
    pub seconds: i64,
    /// Nanoseconds within the second
    pub nanos: u32,
}

impl Timestamp {
    /// Creates a new timestamp from seconds and nanoseconds.
    #[must_use]
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Creates a timestamp from the current time.
    #[must_use]
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos(),
        }
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        let seconds = millis.div_euclid(1000);
        let nanos = (millis.rem_euclid(1000) as u32) * 1_000_000;
        Self { seconds, nanos }
    }

    /// Creates a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }

    /// Converts to `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// Returns the timestamp as total milliseconds since epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanos / 1_000_000)
    }

    /// Returns the timestamp as total nanoseconds since epoch.
    #[must_use]
    pub fn as_nanos(&self) -> i128 {
        i128::from(self.seconds) * 1_000_000_000 + i128::from(self.nanos)
    }

    /// Returns the duration between two timestamps in seconds.
    #[must_use]
    pub fn duration_since(&self, earlier: &Self) -> f64 {
        let diff_nanos = self.as_nanos() - earlier.as_nanos();
        diff_nanos as f64 / 1_000_000_000.0
    }

    /// Returns the duration between two timestamps in milliseconds.
    #[must_use]
    pub fn millis_since(&self, earlier: &Self) -> f64 {
        self.duration_since(earlier) * 1000.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

/// Confidence score in the range [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Confidence(f32);

impl Confidence {
    /// Creates a new confidence value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range [0.0, 1.0].
    pub fn new(value: f32) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(PoseError::ConfidenceOutOfRange { value }.into());
        }
        Ok(Self(value))
    }

    /// Creates a confidence value, clamping into [0.0, 1.0].
    ///
    /// Non-finite input maps to 0.0.
    #[must_use]
    pub fn clamped(value: f32) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    /// Returns the raw confidence value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Returns `true` if the confidence meets the given threshold.
    #[must_use]
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.0 >= threshold
    }

    /// Maximum confidence (1.0).
    pub const MAX: Self = Self(1.0);

    /// Minimum confidence (0.0).
    pub const MIN: Self = Self(0.0);
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.0)
    }
}

// =============================================================================
// Geometry Types
// =============================================================================

/// A 2-D point or vector in image coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    /// X coordinate in pixels
    pub x: f64,
    /// Y coordinate in pixels
    pub y: f64,
}

impl Point2 {
    /// Origin point.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Vector magnitude.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

// =============================================================================
// Pose Types
// =============================================================================

/// COCO-17 keypoint identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KeypointType {
    /// Nose
    Nose = 0,
    /// Left eye
    LeftEye = 1,
    /// Right eye
    RightEye = 2,
    /// Left ear
    LeftEar = 3,
    /// Right ear
    RightEar = 4,
    /// Left shoulder
    LeftShoulder = 5,
    /// Right shoulder
    RightShoulder = 6,
    /// Left elbow
    LeftElbow = 7,
    /// Right elbow
    RightElbow = 8,
    /// Left wrist
    LeftWrist = 9,
    /// Right wrist
    RightWrist = 10,
    /// Left hip
    LeftHip = 11,
    /// Right hip
    RightHip = 12,
    /// Left knee
    LeftKnee = 13,
    /// Right knee
    RightKnee = 14,
    /// Left ankle
    LeftAnkle = 15,
    /// Right ankle
    RightAnkle = 16,
}

impl KeypointType {
    /// Returns all keypoint types in index order.
    #[must_use]
    pub fn all() -> &'static [Self; KEYPOINT_COUNT] {
        &[
            Self::Nose,
            Self::LeftEye,
            Self::RightEye,
            Self::LeftEar,
            Self::RightEar,
            Self::LeftShoulder,
            Self::RightShoulder,
            Self::LeftElbow,
            Self::RightElbow,
            Self::LeftWrist,
            Self::RightWrist,
            Self::LeftHip,
            Self::RightHip,
            Self::LeftKnee,
            Self::RightKnee,
            Self::LeftAnkle,
            Self::RightAnkle,
        ]
    }

    /// Returns the keypoint name as used in landmark model output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Returns the array index for this keypoint.
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns `true` if this is a face keypoint.
    #[must_use]
    pub fn is_face(&self) -> bool {
        matches!(
            self,
            Self::Nose | Self::LeftEye | Self::RightEye | Self::LeftEar | Self::RightEar
        )
    }

    /// Returns `true` if this is an upper body keypoint.
    #[must_use]
    pub fn is_upper_body(&self) -> bool {
        matches!(
            self,
            Self::LeftShoulder
                | Self::RightShoulder
                | Self::LeftElbow
                | Self::RightElbow
                | Self::LeftWrist
                | Self::RightWrist
        )
    }

    /// Returns `true` if this is a lower body keypoint.
    #[must_use]
    pub fn is_lower_body(&self) -> bool {
        matches!(
            self,
            Self::LeftHip
                | Self::RightHip
                | Self::LeftKnee
                | Self::RightKnee
                | Self::LeftAnkle
                | Self::RightAnkle
        )
    }

    /// Returns `true` for left-side keypoints.
    #[must_use]
    pub fn is_left(&self) -> bool {
        matches!(
            self,
            Self::LeftEye
                | Self::LeftEar
                | Self::LeftShoulder
                | Self::LeftElbow
                | Self::LeftWrist
                | Self::LeftHip
                | Self::LeftKnee
                | Self::LeftAnkle
        )
    }

    /// Returns `true` for right-side keypoints.
    #[must_use]
    pub fn is_right(&self) -> bool {
        !self.is_left() && !matches!(self, Self::Nose)
    }
}

impl TryFrom<u8> for KeypointType {
    type Error = PoseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Nose),
            1 => Ok(Self::LeftEye),
            2 => Ok(Self::RightEye),
            3 => Ok(Self::LeftEar),
            4 => Ok(Self::RightEar),
            5 => Ok(Self::LeftShoulder),
            6 => Ok(Self::RightShoulder),
            7 => Ok(Self::LeftElbow),
            8 => Ok(Self::RightElbow),
            9 => Ok(Self::LeftWrist),
            10 => Ok(Self::RightWrist),
            11 => Ok(Self::LeftHip),
            12 => Ok(Self::RightHip),
            13 => Ok(Self::LeftKnee),
            14 => Ok(Self::RightKnee),
            15 => Ok(Self::LeftAnkle),
            16 => Ok(Self::RightAnkle),
            _ => Err(PoseError::InvalidKeypointIndex { index: value }),
        }
    }
}

impl std::fmt::Display for KeypointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single body keypoint with position and confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    /// Type of keypoint
    pub keypoint_type: KeypointType,
    /// X coordinate in pixels
    pub x: f64,
    /// Y coordinate in pixels
    pub y: f64,
    /// Z coordinate (depth, if the landmark model provides it)
    pub z: Option<f64>,
    /// Detection confidence
    pub confidence: Confidence,
}

impl Keypoint {
    /// Creates a new 2D keypoint.
    #[must_use]
    pub fn new(keypoint_type: KeypointType, x: f64, y: f64, confidence: Confidence) -> Self {
        Self {
            keypoint_type,
            x,
            y,
            z: None,
            confidence,
        }
    }

    /// Attaches a depth coordinate.
    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Returns `true` if the keypoint meets the given confidence threshold.
    #[must_use]
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence.exceeds(threshold)
    }

    /// Returns the 2D position.
    #[must_use]
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    /// Calculates the Euclidean distance to another keypoint.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// All keypoints detected in one video frame.
///
/// Slots for undetected keypoints stay `None`; detected keypoints keep
/// whatever confidence the landmark model reported. Midpoint helpers apply
/// the confidence gating used throughout the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// All detected keypoints, indexed by [`KeypointType`]
    keypoints: [Option<Keypoint>; KEYPOINT_COUNT],
    /// Capture time of the frame this pose was detected in
    pub timestamp: Timestamp,
}

impl Pose {
    /// Creates a new empty pose.
    #[must_use]
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            keypoints: [None; KEYPOINT_COUNT],
            timestamp,
        }
    }

    /// Sets a keypoint, replacing any previous value in its slot.
    pub fn set_keypoint(&mut self, keypoint: Keypoint) {
        self.keypoints[keypoint.keypoint_type.index()] = Some(keypoint);
    }

    /// Gets a keypoint by type.
    #[must_use]
    pub fn get_keypoint(&self, keypoint_type: KeypointType) -> Option<&Keypoint> {
        self.keypoints[keypoint_type.index()].as_ref()
    }

    /// Removes a keypoint, returning it if it was present.
    pub fn remove_keypoint(&mut self, keypoint_type: KeypointType) -> Option<Keypoint> {
        self.keypoints[keypoint_type.index()].take()
    }

    /// Iterates over all present keypoints.
    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().filter_map(|kp| kp.as_ref())
    }

    /// Returns the number of keypoints meeting the confidence threshold.
    #[must_use]
    pub fn visible_count(&self, threshold: f32) -> usize {
        self.keypoints()
            .filter(|kp| kp.is_visible(threshold))
            .count()
    }

    /// Returns the keypoint if it meets the confidence threshold.
    #[must_use]
    pub fn visible_keypoint(&self, keypoint_type: KeypointType, threshold: f32) -> Option<&Keypoint> {
        self.get_keypoint(keypoint_type)
            .filter(|kp| kp.is_visible(threshold))
    }

    /// Plain midpoint of two keypoints, requiring both to meet the threshold.
    #[must_use]
    pub fn midpoint(&self, a: KeypointType, b: KeypointType, threshold: f32) -> Option<Point2> {
        let ka = self.visible_keypoint(a, threshold)?;
        let kb = self.visible_keypoint(b, threshold)?;
        Some(Point2::new((ka.x + kb.x) / 2.0, (ka.y + kb.y) / 2.0))
    }

    /// Confidence-weighted midpoint, requiring both keypoints to meet the
    /// threshold and a non-degenerate weight sum.
    #[must_use]
    pub fn weighted_midpoint(
        &self,
        a: KeypointType,
        b: KeypointType,
        threshold: f32,
    ) -> Option<Point2> {
        let ka = self.visible_keypoint(a, threshold)?;
        let kb = self.visible_keypoint(b, threshold)?;
        let wa = f64::from(ka.confidence.value());
        let wb = f64::from(kb.confidence.value());
        let total = wa + wb;
        if total <= f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            (ka.x * wa + kb.x * wb) / total,
            (ka.y * wa + kb.y * wb) / total,
        ))
    }

    /// Midpoint when both keypoints pass the threshold, otherwise the
    /// position of whichever single keypoint passes.
    #[must_use]
    pub fn midpoint_or_better(
        &self,
        a: KeypointType,
        b: KeypointType,
        threshold: f32,
    ) -> Option<Point2> {
        match (
            self.visible_keypoint(a, threshold),
            self.visible_keypoint(b, threshold),
        ) {
            (Some(ka), Some(kb)) => Some(Point2::new((ka.x + kb.x) / 2.0, (ka.y + kb.y) / 2.0)),
            (Some(ka), None) => Some(ka.position()),
            (None, Some(kb)) => Some(kb.position()),
            (None, None) => None,
        }
    }
}
