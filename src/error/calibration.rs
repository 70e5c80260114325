// Calibration error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Calibration error code constants
///
/// These constants provide a single source of truth for error codes
/// reported by the calibration engine and the microphone test.
///
/// Error code range: 2001-2002
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Fewer samples than the analysis floor were recorded
    pub const INSUFFICIENT_SAMPLES: i32 = 2001;

    /// Nothing was recorded at all
    pub const NOT_STARTED: i32 = 2002;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=Calibrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// Statistical fallbacks are not errors; they are reported through the
/// confidence flag of a successful report. Only missing data is fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Session shorter than the minimum sample floor; the caller must re-record
    InsufficientSamples { required: usize, collected: usize },

    /// No samples were recorded
    NotStarted,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::NotStarted => CalibrationErrorCodes::NOT_STARTED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            CalibrationError::NotStarted => "No samples recorded".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
