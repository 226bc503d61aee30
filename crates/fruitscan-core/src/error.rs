//! Error types for the detection engine.

use std::fmt;

// ── Error type ──────────────────────────────────────────────────────────────

/// Failures that can occur while ingesting an image.
///
/// These never cross the public API: [`crate::FruitDetector`] converts them
/// into a fallback [`crate::DetectionReport`] whose `error` field records
/// what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The input bytes could not be decoded as an image.
    DecodeFailure(String),
    /// The decoded image has zero pixels.
    EmptyImage,
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::DecodeFailure(detail) => {
                write!(f, "image decode failed: {detail}")
            }
            DetectError::EmptyImage => write!(f, "image has zero pixels"),
        }
    }
}

impl std::error::Error for DetectError {}
