//! # gaitsense-core
//!
//! Core types, traits, and utilities for the gaitsense gait analysis system.
//!
//! This crate provides the foundational building blocks used throughout the
//! gaitsense ecosystem, including:
//!
//! - **Pose Data Types**: [`Pose`], [`Keypoint`], and [`KeypointType`] for
//!   representing COCO-17 landmark detections from a video frame.
//!
//! - **Error Types**: Comprehensive error handling via the [`error`] module.
//!
//! - **Traits**: Core abstractions like [`PoseFilter`], [`Validate`], and
//!   [`Resettable`] that define the contracts between pipeline stages.
//!
//! - **Utilities**: Common numeric helpers used across the codebase.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization via serde
//!
//! ## Example
//!
//! ```rust
//! use gaitsense_core::{Keypoint, KeypointType, Confidence};
//!
//! // Create a keypoint with high confidence
//! let keypoint = Keypoint::new(
//!     KeypointType::LeftAnkle,
//!     210.0,
//!     415.0,
//!     Confidence::new(0.95).unwrap(),
//! );
//!
//! assert!(keypoint.is_visible(0.5));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{CoreResult, GaitError, PoseError};
pub use traits::{PoseFilter, Resettable, Validate};
pub use types::{
    // Pose types
    Keypoint, KeypointType, Pose,
    // Geometry types
    Point2,
    // Common types
    Confidence, SessionId, Timestamp,
    KEYPOINT_COUNT,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default confidence threshold for keypoint visibility
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Prelude module for convenient imports.
///
/// Convenient re-exports of commonly used types and traits.
///
/// ```rust
/// use gaitsense_core::prelude::*;
/// ```
pub mod prelude {

    pub use crate::error::{CoreResult, GaitError, PoseError};
    pub use crate::traits::{PoseFilter, Resettable, Validate};
    pub use crate::types::{
        Confidence, Keypoint, KeypointType, Point2, Pose, SessionId, Timestamp, KEYPOINT_COUNT,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_valid() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_constants() {
        assert_eq!(KEYPOINT_COUNT, 17);
        assert!(DEFAULT_CONFIDENCE_THRESHOLD > 0.0);
        assert!(DEFAULT_CONFIDENCE_THRESHOLD < 1.0);
    }
}
