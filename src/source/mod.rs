// Loudness sources - one scalar loudness value per fixed-size audio frame
//
// The detector and the calibrator only ever see LoudnessSample values.
// Sources here produce them from the microphone (cpal), a recorded WAV
// file (hound) or a seeded synthetic session (rand).

pub mod level;
pub mod microphone;
pub mod synthetic;
pub mod wav;

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

pub use level::{frame_rms, FrameAccumulator, PCM_SCALE};
pub use microphone::MicrophoneSource;
pub use synthetic::{SyntheticSession, SyntheticSource};
pub use wav::WavLoudnessSource;

/// Loudness of one audio frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessSample {
    /// RMS in 16-bit PCM units, never negative
    pub value: f64,
    /// Seconds since the source started
    pub timestamp: f64,
}

/// Producer of loudness samples in timestamp order
pub trait LoudnessSource {
    /// Next frame's loudness
    ///
    /// # Returns
    /// * `Ok(Some(sample))` - Next frame
    /// * `Ok(None)` - Source exhausted (recorded input only)
    /// * `Err(AudioError)` - Capture failed; the caller may `restart()`
    fn next_sample(&mut self) -> Result<Option<LoudnessSample>, AudioError>;

    /// Reopen the underlying input after repeated failures
    fn restart(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

impl<S: LoudnessSource + ?Sized> LoudnessSource for Box<S> {
    fn next_sample(&mut self) -> Result<Option<LoudnessSample>, AudioError> {
        (**self).next_sample()
    }

    fn restart(&mut self) -> Result<(), AudioError> {
        (**self).restart()
    }
}
