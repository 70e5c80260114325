// Progress tracking for the calibration recording
//
// This module provides the phase and progress types the calibration front
// end polls while a session is being recorded.

use serde::{Deserialize, Serialize};

/// Live recording phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPhase {
    /// Step 1: Measuring ambient noise level (operator stays quiet)
    Baseline,
    /// Step 2: Recording deliberate claps
    Gestures,
}

impl CalibrationPhase {
    /// Get the next phase in the recording sequence
    pub fn next(&self) -> Option<CalibrationPhase> {
        match self {
            CalibrationPhase::Baseline => Some(CalibrationPhase::Gestures),
            CalibrationPhase::Gestures => None,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationPhase::Baseline => "Baseline",
            CalibrationPhase::Gestures => "Clapping",
        }
    }
}

/// Snapshot of a running calibration session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub phase: CalibrationPhase,
    /// Samples recorded so far
    pub samples: usize,
    /// Peaks confirmed by the live preview
    pub claps_detected: usize,
    pub target_claps: usize,
    /// Seconds since the first sample
    pub elapsed: f64,
    /// Seconds left in the current phase
    pub phase_remaining: f64,
    /// Mean of the most recent samples
    pub recent_average: f64,
    /// Threshold currently applied by the live preview
    pub working_threshold: f64,
}

impl CalibrationProgress {
    /// Get clap progress percentage (0-100)
    pub fn percentage(&self) -> u8 {
        if self.target_claps == 0 {
            return 0;
        }
        let ratio = self.claps_detected as f64 / self.target_claps as f64;
        (ratio.min(1.0) * 100.0) as u8
    }
}
