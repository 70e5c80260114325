// Audio capture error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Audio error code constants
///
/// Error code range: 3001-3006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// No default input device is available
    pub const NO_INPUT_DEVICE: i32 = 3001;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 3002;

    /// Device offers a sample format the capture path cannot read
    pub const UNSUPPORTED_FORMAT: i32 = 3003;

    /// Audio stream disconnected or stopped delivering frames
    pub const STREAM_FAILURE: i32 = 3004;

    /// Recorded WAV input could not be read
    pub const WAV_READ_FAILED: i32 = 3005;

    /// Loudness source parameters were invalid
    pub const INVALID_SOURCE: i32 = 3006;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=LoudnessSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the loudness sources feeding the detector and the
/// calibrator: microphone capture and recorded WAV input.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No default input device found
    NoInputDevice,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Sample format not supported by the capture callback
    UnsupportedFormat { format: String },

    /// Stream channel disconnected unexpectedly
    StreamFailure { reason: String },

    /// WAV file could not be opened or decoded
    WavReadFailed { reason: String },

    /// Chunk size, sample rate or channel count was zero
    InvalidSource { reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::NoInputDevice => AudioErrorCodes::NO_INPUT_DEVICE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::WavReadFailed { .. } => AudioErrorCodes::WAV_READ_FAILED,
            AudioError::InvalidSource { .. } => AudioErrorCodes::INVALID_SOURCE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::NoInputDevice => {
                "No input device found. Check microphone permissions and connection.".to_string()
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported input sample format: {}", format)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::WavReadFailed { reason } => {
                format!("Failed to read WAV input: {}", reason)
            }
            AudioError::InvalidSource { reason } => {
                format!("Invalid loudness source: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::WavReadFailed {
            reason: err.to_string(),
        }
    }
}
