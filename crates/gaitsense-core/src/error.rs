//! Error types for the gaitsense pipeline.
//!
//! This module provides error handling using [`thiserror`] for automatic
//! `Display` and `Error` trait implementations.
//!
//! # Error Hierarchy
//!
//! - [`GaitError`]: Top-level error type that encompasses all pipeline errors
//! - [`PoseError`]: Errors related to pose and keypoint construction
//!
//! # Example
//!
//! ```rust
//! use gaitsense_core::error::{GaitError, PoseError};
//!
//! fn check_confidence(value: f32) -> Result<(), GaitError> {
//!     if !(0.0..=1.0).contains(&value) {
//!         return Err(PoseError::ConfidenceOutOfRange { value }.into());
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, GaitError>;

/// Top-level error type for the gaitsense pipeline.
///
/// Frame processing itself never fails; these errors surface from
/// construction, configuration, and data validation paths.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GaitError {
    /// Pose or keypoint construction error
    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// Validation error for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what validation failed
        message: String,
    },

    /// Insufficient samples for the requested computation
    #[error("Insufficient data: need at least {required}, got {available}")]
    InsufficientData {
        /// Minimum required samples
        required: usize,
        /// Available samples
        available: usize,
    },

    /// Invalid state for the requested operation
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl GaitError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new insufficient data error.
    #[must_use]
    pub fn insufficient_data(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Creates a new invalid state error.
    #[must_use]
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Insufficient data clears up as more frames arrive; configuration and
    /// validation errors require caller intervention.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Pose(e) => e.is_recoverable(),
            Self::InsufficientData { .. } => true,
            Self::Configuration { .. }
            | Self::Validation { .. }
            | Self::InvalidState { .. }
            | Self::Internal { .. } => false,
        }
    }
}

/// Errors related to pose and keypoint construction.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PoseError {
    /// Keypoint index outside the COCO-17 range
    #[error("Invalid keypoint index: {index}, maximum is 16")]
    InvalidKeypointIndex {
        /// The out-of-range index
        index: u8,
    },

    /// Confidence value outside [0, 1]
    #[error("Confidence {value} out of range [0, 1]")]
    ConfidenceOutOfRange {
        /// The invalid confidence value
        value: f32,
    },

    /// A required keypoint is absent from the pose
    #[error("Missing keypoint: {name}")]
    MissingKeypoint {
        /// Name of the absent keypoint
        name: &'static str,
    },
}

impl PoseError {
    /// Returns `true` if this error is recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::MissingKeypoint { .. } => true,
            Self::InvalidKeypointIndex { .. } | Self::ConfidenceOutOfRange { .. } => false,
        }
    }
}
