//! Core trait definitions for the gaitsense pipeline.
//!
//! This module defines the small abstractions shared across the analysis
//! crates, enabling a modular and testable architecture.
//!
//! # Traits
//!
//! - [`PoseFilter`]: Transform a raw pose into a conditioned pose
//! - [`Validate`]: Self-validation for configuration types
//! - [`Resettable`]: Return stateful components to their initial state

use crate::error::CoreResult;
use crate::types::Pose;

/// A stateful filter stage that conditions poses before analysis.
///
/// Implementations typically smooth landmark jitter across frames and may
/// keep per-joint state between calls.
///
/// # Example
///
/// ```
/// use gaitsense_core::{Pose, PoseFilter, Timestamp};
///
/// struct Passthrough;
///
/// impl PoseFilter for Passthrough {
///     fn apply(&mut self, pose: &Pose) -> Pose {
///         pose.clone()
///     }
/// }
///
/// let mut filter = Passthrough;
/// let pose = Pose::new(Timestamp::from_millis(0));
/// let filtered = filter.apply(&pose);
/// assert_eq!(filtered, pose);
/// ```
pub trait PoseFilter: Send {
    /// Produces a conditioned copy of the input pose.
    fn apply(&mut self, pose: &Pose) -> Pose;
}

/// Trait for types that can validate themselves.
pub trait Validate {
    /// Validates the instance.
    ///
    /// # Errors
    ///
    /// Returns an error describing validation failures.
    fn validate(&self) -> CoreResult<()>;
}

/// Trait for types that can be reset to a default state.
pub trait Resettable {
    /// Resets the instance to its initial state.
    fn reset(&mut self);
}
