// Peak extraction - local maxima of the loudness envelope
//
// A sample is a peak when it exceeds the threshold supplied for its index
// and is strictly louder than every other sample within ±PEAK_WINDOW
// samples. Peaks within MIN_PEAK_SPACING_SECS (inclusive) of the previously
// accepted one are dropped: claps cannot repeat faster than that.
//
// The same PeakExtractor drives the live preview (one candidate per new
// sample, as soon as its right-hand window is complete) and the offline
// pass in Calibrator::finalize.

use serde::{Deserialize, Serialize};

/// Half-width of the local-maximum window, in samples
pub const PEAK_WINDOW: usize = 5;

/// Minimum spacing between two accepted peaks (seconds)
pub const MIN_PEAK_SPACING_SECS: f64 = 0.3;

/// A detected clap peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Seconds since session start
    pub timestamp: f64,
    pub loudness: f64,
}

/// Supplies the detection threshold for a sample index
pub trait ThresholdSupplier {
    fn threshold_at(&self, index: usize) -> f64;
}

/// Same threshold for every sample
impl ThresholdSupplier for f64 {
    fn threshold_at(&self, _index: usize) -> f64 {
        *self
    }
}

/// Per-sample thresholds recorded while the session was running
impl ThresholdSupplier for [f64] {
    fn threshold_at(&self, index: usize) -> f64 {
        self.get(index).copied().unwrap_or(f64::INFINITY)
    }
}

impl ThresholdSupplier for Vec<f64> {
    fn threshold_at(&self, index: usize) -> f64 {
        self.as_slice().threshold_at(index)
    }
}

/// Incremental peak picker with temporal deduplication
#[derive(Debug, Clone, Default)]
pub struct PeakExtractor {
    last_accepted: Option<f64>,
}

impl PeakExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the candidate at `index`
    ///
    /// Requires a complete ±PEAK_WINDOW neighbourhood inside `values`;
    /// candidates near either edge are never peaks.
    ///
    /// # Returns
    /// * `Some(Peak)` - Candidate accepted (and remembered for deduplication)
    /// * `None` - Below threshold, not a strict local maximum, or too close
    pub fn consider<T: ThresholdSupplier + ?Sized>(
        &mut self,
        values: &[f64],
        timestamps: &[f64],
        index: usize,
        thresholds: &T,
    ) -> Option<Peak> {
        if index < PEAK_WINDOW || index + PEAK_WINDOW >= values.len() {
            return None;
        }

        let current = values[index];
        if current <= thresholds.threshold_at(index) {
            return None;
        }

        let is_peak = (index - PEAK_WINDOW..=index + PEAK_WINDOW)
            .filter(|&j| j != index)
            .all(|j| values[j] < current);
        if !is_peak {
            return None;
        }

        let timestamp = timestamps[index];
        if let Some(last) = self.last_accepted {
            if timestamp - last <= MIN_PEAK_SPACING_SECS {
                return None;
            }
        }

        self.last_accepted = Some(timestamp);
        Some(Peak {
            timestamp,
            loudness: current,
        })
    }
}

/// Extract every peak of a recorded segment
///
/// # Arguments
/// * `values` - Loudness values of the segment
/// * `timestamps` - Matching timestamps (same length as `values`)
/// * `thresholds` - Fixed threshold or per-index supplier
pub fn extract_peaks<T: ThresholdSupplier + ?Sized>(
    values: &[f64],
    timestamps: &[f64],
    thresholds: &T,
) -> Vec<Peak> {
    debug_assert_eq!(values.len(), timestamps.len());
    let mut extractor = PeakExtractor::new();
    (0..values.len())
        .filter_map(|index| extractor.consider(values, timestamps, index, thresholds))
        .collect()
}
