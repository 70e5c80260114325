// Calibrator - two-phase recording and threshold analysis
//
// The session is recorded in two phases:
// 1. Baseline: the operator stays quiet while ambient loudness is measured
// 2. Gestures: the operator claps; a live preview confirms peaks as they
//    happen, using an adaptive threshold
//
// finalize() re-segments the recording, recomputes the statistics and runs
// the peak extraction again (adaptive first, then fixed fallbacks) before
// deriving the threshold tiers.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::adaptive::{preview_threshold, AdaptiveThreshold, PREVIEW_FLOOR};
use super::peaks::{extract_peaks, Peak, PeakExtractor, PEAK_WINDOW};
use super::progress::{CalibrationPhase, CalibrationProgress};
use super::recommendation::{
    recommend, CalibrationAdvisory, Confidence, ThresholdRecommendation,
};
use super::stats::{BaselineStats, PeakStats, RollingWindow};
use crate::error::{log_calibration_error, CalibrationError};

/// Sessions shorter than this cannot be analysed
pub const MIN_SESSION_SAMPLES: usize = 20;

/// Baseline never covers more than this share of the session (percent)
pub const MAX_BASELINE_PERCENT: usize = 30;

/// Number of recent values averaged for display
pub const RECENT_WINDOW: usize = 50;

/// Multiplier of the baseline max used for the pre-transition display estimate
const BASELINE_DISPLAY_MULTIPLIER: f64 = 2.5;

/// Parameters of a live recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Length of the baseline phase (seconds)
    pub baseline_seconds: f64,
    /// Gesture phase ends after this long (seconds)
    pub gesture_max_seconds: f64,
    /// Gesture phase ends once this many live peaks were confirmed
    pub target_claps: usize,
    /// Loudest sample of the microphone test, if one ran
    pub mic_test_peak: Option<f64>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            baseline_seconds: 10.0,
            gesture_max_seconds: 45.0,
            target_claps: 6,
            mic_test_peak: None,
        }
    }
}

/// Which extraction pass produced the report's peaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakSource {
    /// Adaptive gesture-phase threshold (same as the live preview)
    Adaptive,
    /// Fixed threshold from baseline statistics
    Fixed,
    /// Lowered fixed threshold, tried when the session clearly had activity
    Relaxed,
}

/// Whole-session summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub samples: usize,
    /// Seconds between first and last sample
    pub duration: f64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Result of a successful calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub recommendation: ThresholdRecommendation,
    pub confidence: Confidence,
    pub advisories: Vec<CalibrationAdvisory>,
    pub baseline: BaselineStats,
    pub claps: Option<PeakStats>,
    pub peaks: Vec<Peak>,
    pub peak_source: Option<PeakSource>,
    /// Static threshold at the start of the gesture phase
    pub preview_threshold: f64,
    pub session: SessionSummary,
}

impl CalibrationReport {
    pub fn is_degraded(&self) -> bool {
        self.confidence == Confidence::Degraded
    }
}

/// Live state of the recording
#[derive(Debug, Clone)]
enum LivePhase {
    Baseline,
    Gestures {
        /// Index of the first gesture-phase sample
        start: usize,
        started_at: f64,
        adaptive: AdaptiveThreshold,
        extractor: PeakExtractor,
    },
}

/// Calibration session recorder and analyser
#[derive(Debug, Clone)]
pub struct Calibrator {
    settings: CalibrationSettings,
    values: Vec<f64>,
    timestamps: Vec<f64>,
    baseline_sum: f64,
    baseline_count: usize,
    baseline_max: f64,
    session_min: f64,
    session_max: f64,
    session_sum: f64,
    recent: RollingWindow,
    phase: LivePhase,
    /// Threshold applied to each gesture-phase sample, indexed from `start`
    live_thresholds: Vec<f64>,
    live_peaks: Vec<Peak>,
}

impl Calibrator {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            settings,
            values: Vec::new(),
            timestamps: Vec::new(),
            baseline_sum: 0.0,
            baseline_count: 0,
            baseline_max: 0.0,
            session_min: f64::INFINITY,
            session_max: 0.0,
            session_sum: 0.0,
            recent: RollingWindow::new(RECENT_WINDOW),
            phase: LivePhase::Baseline,
            live_thresholds: Vec::new(),
            live_peaks: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn phase(&self) -> CalibrationPhase {
        match self.phase {
            LivePhase::Baseline => CalibrationPhase::Baseline,
            LivePhase::Gestures { .. } => CalibrationPhase::Gestures,
        }
    }

    /// Peaks confirmed by the live preview so far
    pub fn live_peaks(&self) -> &[Peak] {
        &self.live_peaks
    }

    /// Append one sample
    ///
    /// Samples must arrive in timestamp order. Negative and non-finite
    /// loudness values are recorded as silence.
    ///
    /// # Returns
    /// * `Some(Peak)` - The live preview just confirmed a clap (its window
    ///   closes `PEAK_WINDOW` samples after the peak itself)
    /// * `None` - Nothing new to report
    pub fn add_sample(&mut self, loudness: f64, timestamp: f64) -> Option<Peak> {
        let value = if loudness.is_finite() {
            loudness.max(0.0)
        } else {
            0.0
        };
        let elapsed = self
            .timestamps
            .first()
            .map_or(0.0, |first| timestamp - first);

        self.values.push(value);
        self.timestamps.push(timestamp);
        self.session_min = self.session_min.min(value);
        self.session_max = self.session_max.max(value);
        self.session_sum += value;
        self.recent.push(value);

        if matches!(self.phase, LivePhase::Baseline) {
            if elapsed < self.settings.baseline_seconds {
                self.baseline_sum += value;
                self.baseline_count += 1;
                self.baseline_max = self.baseline_max.max(value);
                return None;
            }
            self.begin_gestures(timestamp);
        }

        self.observe_gesture_sample(value)
    }

    fn baseline_average(&self) -> f64 {
        if self.baseline_count == 0 {
            0.0
        } else {
            self.baseline_sum / self.baseline_count as f64
        }
    }

    fn begin_gestures(&mut self, started_at: f64) {
        let preview = preview_threshold(
            self.baseline_average(),
            self.baseline_max,
            self.settings.mic_test_peak,
        );
        info!(
            "[Calibrator] Baseline established: avg={:.0}, max={:.0}, samples={}; detection threshold {:.0}",
            self.baseline_average(),
            self.baseline_max,
            self.baseline_count,
            preview
        );
        self.phase = LivePhase::Gestures {
            start: self.values.len() - 1,
            started_at,
            adaptive: AdaptiveThreshold::new(preview, self.baseline_max),
            extractor: PeakExtractor::new(),
        };
    }

    fn observe_gesture_sample(&mut self, value: f64) -> Option<Peak> {
        let LivePhase::Gestures {
            start,
            adaptive,
            extractor,
            ..
        } = &mut self.phase
        else {
            return None;
        };

        let threshold = adaptive.observe(value, self.session_max);
        self.live_thresholds.push(threshold);

        let segment = &self.values[*start..];
        if segment.len() <= PEAK_WINDOW {
            return None;
        }
        let candidate = segment.len() - 1 - PEAK_WINDOW;
        let peak = extractor.consider(
            segment,
            &self.timestamps[*start..],
            candidate,
            self.live_thresholds.as_slice(),
        )?;

        self.live_peaks.push(peak);
        info!(
            "[Calibrator] Clap #{} detected at {:.2}s (loudness {:.0}, threshold {:.0})",
            self.live_peaks.len(),
            peak.timestamp,
            peak.loudness,
            self.live_thresholds[candidate]
        );
        Some(peak)
    }

    /// Live detection threshold for operator display
    ///
    /// # Arguments
    /// * `after_baseline` - `false` asks for the rough estimate shown while
    ///   the baseline is still being measured; `true` asks for the threshold
    ///   the gesture phase applies (or will start with)
    pub fn preview_threshold(&self, after_baseline: bool) -> f64 {
        if !after_baseline {
            return self.baseline_max * BASELINE_DISPLAY_MULTIPLIER;
        }
        match &self.phase {
            LivePhase::Gestures { adaptive, .. } => adaptive.current(),
            LivePhase::Baseline => preview_threshold(
                self.baseline_average(),
                self.baseline_max,
                self.settings.mic_test_peak,
            ),
        }
    }

    /// Whether the gesture phase reached its clap target or time limit
    pub fn is_complete(&self) -> bool {
        match &self.phase {
            LivePhase::Baseline => false,
            LivePhase::Gestures { started_at, .. } => {
                let last = self.timestamps.last().copied().unwrap_or(*started_at);
                self.live_peaks.len() >= self.settings.target_claps
                    || last - started_at >= self.settings.gesture_max_seconds
            }
        }
    }

    pub fn progress(&self) -> CalibrationProgress {
        let first = self.timestamps.first().copied().unwrap_or(0.0);
        let last = self.timestamps.last().copied().unwrap_or(first);
        let elapsed = last - first;

        let phase_remaining = match &self.phase {
            LivePhase::Baseline => self.settings.baseline_seconds - elapsed,
            LivePhase::Gestures { started_at, .. } => {
                self.settings.gesture_max_seconds - (last - started_at)
            }
        };

        CalibrationProgress {
            phase: self.phase(),
            samples: self.values.len(),
            claps_detected: self.live_peaks.len(),
            target_claps: self.settings.target_claps,
            elapsed,
            phase_remaining: phase_remaining.max(0.0),
            recent_average: self.recent.average(),
            working_threshold: self.preview_threshold(self.phase() == CalibrationPhase::Gestures),
        }
    }

    /// Analyse the recorded session
    ///
    /// # Arguments
    /// * `baseline_seconds` - Baseline length used for segmentation; the
    ///   baseline is further capped at 30% of the samples
    /// * `mic_test_peak` - Loudest microphone-test sample, if known
    ///
    /// # Returns
    /// * `Ok(CalibrationReport)` - Recommendation with its confidence flag
    /// * `Err(CalibrationError::InsufficientSamples)` - Fewer than 20 samples
    pub fn finalize(
        &self,
        baseline_seconds: f64,
        mic_test_peak: Option<f64>,
    ) -> Result<CalibrationReport, CalibrationError> {
        let total = self.values.len();
        if total < MIN_SESSION_SAMPLES {
            let err = CalibrationError::InsufficientSamples {
                required: MIN_SESSION_SAMPLES,
                collected: total,
            };
            log_calibration_error(&err, "Calibrator::finalize");
            return Err(err);
        }

        let first = self.timestamps[0];
        let by_time = self
            .timestamps
            .iter()
            .take_while(|t| **t - first < baseline_seconds)
            .count();
        let by_fraction = total * MAX_BASELINE_PERCENT / 100;
        let baseline_len = by_time.min(by_fraction);

        let session = SessionSummary {
            samples: total,
            duration: self.timestamps[total - 1] - first,
            min: self.session_min,
            max: self.session_max,
            average: self.session_sum / total as f64,
        };

        let baseline = BaselineStats::from_values(&self.values[..baseline_len]).unwrap_or(
            BaselineStats {
                average: session.average,
                max: 0.0,
                std_dev: 0.0,
                samples: 0,
            },
        );

        let gesture_values = &self.values[baseline_len..];
        let gesture_timestamps = &self.timestamps[baseline_len..];

        let preview = preview_threshold(baseline.average, baseline.max, mic_test_peak);
        let (peaks, peak_source) = self.extract_session_peaks(
            &baseline,
            baseline_len,
            preview,
            gesture_values,
            gesture_timestamps,
        );

        let claps = PeakStats::from_peaks(&peaks);
        let recommendation = recommend(&baseline, claps.map(|c| c.average), session.max);

        info!(
            "[Calibrator] Analysis complete: {} samples, {} claps, moderate threshold {}",
            total,
            peaks.len(),
            recommendation.thresholds.moderate
        );

        Ok(CalibrationReport {
            recommendation: recommendation.thresholds,
            confidence: recommendation.confidence,
            advisories: recommendation.advisories,
            baseline,
            claps,
            peaks,
            peak_source,
            preview_threshold: preview,
            session,
        })
    }

    fn extract_session_peaks(
        &self,
        baseline: &BaselineStats,
        baseline_len: usize,
        preview: f64,
        values: &[f64],
        timestamps: &[f64],
    ) -> (Vec<Peak>, Option<PeakSource>) {
        // Replay the live adaptive threshold over the gesture segment
        let mut adaptive = AdaptiveThreshold::new(preview, baseline.max);
        let mut running_max = self.values[..baseline_len]
            .iter()
            .copied()
            .fold(0.0, f64::max);
        let thresholds: Vec<f64> = values
            .iter()
            .map(|&value| {
                running_max = running_max.max(value);
                adaptive.observe(value, running_max)
            })
            .collect();

        let peaks = extract_peaks(values, timestamps, &thresholds);
        if !peaks.is_empty() {
            return (peaks, Some(PeakSource::Adaptive));
        }

        let fixed = (baseline.average + 3.0 * baseline.std_dev)
            .max(2.0 * baseline.max)
            .max(PREVIEW_FLOOR);
        debug!(
            "[Calibrator] Adaptive pass found no peaks, retrying at fixed threshold {:.0}",
            fixed
        );
        let peaks = extract_peaks(values, timestamps, &fixed);
        if !peaks.is_empty() {
            return (peaks, Some(PeakSource::Fixed));
        }

        if self.session_max > 1.5 * baseline.max {
            let relaxed = (1.3 * baseline.max).max(20.0);
            warn!(
                "[Calibrator] No peaks at {:.0}, retrying at relaxed threshold {:.0}",
                fixed, relaxed
            );
            let peaks = extract_peaks(values, timestamps, &relaxed);
            if !peaks.is_empty() {
                return (peaks, Some(PeakSource::Relaxed));
            }
        }

        (Vec::new(), None)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
