// Error types for the clap detection core
//
// This module defines custom error types for detector configuration,
// calibration analysis and loudness capture, providing structured error
// handling with stable numeric codes for CLI exit reporting and logs.

mod audio;
mod calibration;
mod detector;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use detector::{DetectorError, DetectorErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent reporting across the
/// library and the command line front end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
