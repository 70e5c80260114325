// Microphone test - verifies the input reacts to sound before calibrating
//
// The operator stays quiet for the first `quiet_seconds`, then makes a
// sound. A post-quiet sample louder than three times the quiet ceiling
// (and above an absolute floor) proves the microphone is live. The loudest
// sample becomes the calibrator's reference ceiling.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Peak loudness below this means the input is effectively dead
pub const DEAD_INPUT_MAX: f64 = 5.0;

/// Peak loudness below this means the input is alive but very quiet
pub const QUIET_INPUT_MAX: f64 = 20.0;

/// Outcome of a microphone test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MicTestVerdict {
    /// Loudness never rose above the dead-input level
    NotWorking,
    /// Input responds but peaks are very low
    TooQuiet,
    /// Input responds but no distinct sound spike was heard
    NoSoundSpike,
    Working,
}

impl MicTestVerdict {
    /// Whether calibration can reasonably proceed
    pub fn can_continue(&self) -> bool {
        !matches!(self, MicTestVerdict::NotWorking)
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            MicTestVerdict::NotWorking => "MICROPHONE NOT WORKING",
            MicTestVerdict::TooQuiet => "MICROPHONE SEEMS QUIET",
            MicTestVerdict::NoSoundSpike => "NO SIGNIFICANT SOUND DETECTED",
            MicTestVerdict::Working => "MICROPHONE WORKING",
        }
    }
}

/// Aggregated microphone test results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicTestSummary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub quiet_max: f64,
    pub sound_detected: bool,
    pub samples: usize,
    pub verdict: MicTestVerdict,
}

/// Streaming microphone test accumulator
#[derive(Debug, Clone)]
pub struct MicTest {
    quiet_seconds: f64,
    start: Option<f64>,
    samples: usize,
    sum: f64,
    min: f64,
    max: f64,
    quiet_max: f64,
    sound_detected: bool,
}

impl MicTest {
    /// # Arguments
    /// * `quiet_seconds` - Length of the leading quiet period
    pub fn new(quiet_seconds: f64) -> Self {
        Self {
            quiet_seconds,
            start: None,
            samples: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: 0.0,
            quiet_max: 0.0,
            sound_detected: false,
        }
    }

    /// Record one loudness value
    pub fn add_sample(&mut self, loudness: f64, timestamp: f64) {
        let start = *self.start.get_or_insert(timestamp);
        let elapsed = timestamp - start;

        self.samples += 1;
        self.sum += loudness;
        self.min = self.min.min(loudness);
        self.max = self.max.max(loudness);

        if elapsed < self.quiet_seconds {
            self.quiet_max = self.quiet_max.max(loudness);
        } else if loudness > 3.0 * self.quiet_max && loudness > QUIET_INPUT_MAX {
            self.sound_detected = true;
        }
    }

    /// Whether a distinct sound has been heard after the quiet period
    pub fn sound_detected(&self) -> bool {
        self.sound_detected
    }

    /// Loudest sample so far, if any sample was recorded
    pub fn peak(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.max)
    }

    /// Summarise the test
    ///
    /// # Returns
    /// * `Ok(MicTestSummary)` - At least one sample was recorded
    /// * `Err(CalibrationError::NotStarted)` - Nothing was recorded
    pub fn summary(&self) -> Result<MicTestSummary, CalibrationError> {
        if self.samples == 0 {
            return Err(CalibrationError::NotStarted);
        }

        let verdict = if self.max < DEAD_INPUT_MAX {
            MicTestVerdict::NotWorking
        } else if self.max < QUIET_INPUT_MAX {
            MicTestVerdict::TooQuiet
        } else if !self.sound_detected {
            MicTestVerdict::NoSoundSpike
        } else {
            MicTestVerdict::Working
        };

        Ok(MicTestSummary {
            min: self.min,
            max: self.max,
            average: self.sum / self.samples as f64,
            quiet_max: self.quiet_max,
            sound_detected: self.sound_detected,
            samples: self.samples,
            verdict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `values` at 100ms cadence
    fn run_test(values: &[f64]) -> MicTest {
        let mut test = MicTest::new(2.0);
        for (i, value) in values.iter().enumerate() {
            test.add_sample(*value, i as f64 * 0.1);
        }
        test
    }

    #[test]
    fn test_empty_test_is_an_error() {
        let test = MicTest::new(2.0);
        assert_eq!(test.summary(), Err(CalibrationError::NotStarted));
        assert_eq!(test.peak(), None);
    }

    #[test]
    fn test_dead_input() {
        let summary = run_test(&[1.0; 50]).summary().unwrap();
        assert_eq!(summary.verdict, MicTestVerdict::NotWorking);
        assert!(!summary.verdict.can_continue());
    }

    #[test]
    fn test_quiet_input() {
        let summary = run_test(&[12.0; 50]).summary().unwrap();
        assert_eq!(summary.verdict, MicTestVerdict::TooQuiet);
        assert!(summary.verdict.can_continue());
    }

    #[test]
    fn test_no_spike_after_quiet_period() {
        // Loud but steady: nothing exceeds 3x the quiet ceiling
        let summary = run_test(&[40.0; 50]).summary().unwrap();
        assert_eq!(summary.verdict, MicTestVerdict::NoSoundSpike);
    }

    #[test]
    fn test_working_microphone() {
        let mut values = vec![10.0; 50];
        values[35] = 900.0;
        let test = run_test(&values);
        assert!(test.sound_detected());
        assert_eq!(test.peak(), Some(900.0));

        let summary = test.summary().unwrap();
        assert_eq!(summary.verdict, MicTestVerdict::Working);
        assert_eq!(summary.quiet_max, 10.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.samples, 50);
    }

    #[test]
    fn test_spike_during_quiet_period_only_raises_ceiling() {
        let mut values = vec![10.0; 50];
        values[5] = 900.0;
        let summary = run_test(&values).summary().unwrap();
        assert_eq!(summary.quiet_max, 900.0);
        assert!(!summary.sound_detected);
        assert_eq!(summary.verdict, MicTestVerdict::NoSoundSpike);
    }
}
