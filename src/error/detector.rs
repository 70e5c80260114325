// Detector configuration error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Detector error code constants
///
/// Error code range: 1001-1001
pub struct DetectorErrorCodes {}

impl DetectorErrorCodes {
    /// Threshold or duration was zero, negative or not finite
    pub const INVALID_CONFIGURATION: i32 = 1001;
}

/// Errors raised while building a detector configuration
///
/// The detector itself never fails once constructed; every loudness value
/// is a valid input. Only construction can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// A threshold or duration parameter was not strictly positive
    InvalidConfiguration { field: &'static str, value: f64 },
}

impl ErrorCode for DetectorError {
    fn code(&self) -> i32 {
        match self {
            DetectorError::InvalidConfiguration { .. } => {
                DetectorErrorCodes::INVALID_CONFIGURATION
            }
        }
    }

    fn message(&self) -> String {
        match self {
            DetectorError::InvalidConfiguration { field, value } => {
                format!("Invalid configuration: {} must be positive, got {}", field, value)
            }
        }
    }
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DetectorError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DetectorError {}
