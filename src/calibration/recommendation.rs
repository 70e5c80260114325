// Threshold recommendations derived from calibration statistics
//
// Three tiers are produced from the mean clap peak, each floored by a
// multiple of the ambient noise margin:
// - Conservative: 60% of average clap (fewer false positives)
// - Moderate: 50% of average clap (balanced, the default choice)
// - Sensitive: 40% of average clap (catches quiet claps)
//
// Without any detected peak the tiers fall back to the session maximum,
// or to the baseline maximum when nothing louder than the room was heard.
// Both fallbacks degrade the report's confidence.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::stats::BaselineStats;

/// Moderate thresholds below this usually pick up ambient sounds
pub const LOW_THRESHOLD_WARNING: u32 = 500;

/// Moderate thresholds above this usually miss normal claps
pub const HIGH_THRESHOLD_WARNING: u32 = 5000;

/// Recommended detector thresholds, in loudness units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRecommendation {
    pub conservative: u32,
    pub moderate: u32,
    pub sensitive: u32,
}

impl ThresholdRecommendation {
    /// The tier to write into the configuration by default
    pub fn recommended(&self) -> u32 {
        self.moderate
    }
}

/// How far the recommendation can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Derived from detected clap peaks
    Normal,
    /// Derived from a statistical fallback; re-running calibration is advised
    Degraded,
}

/// Operator-facing notes attached to a calibration report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationAdvisory {
    /// No clap peak was found; thresholds follow the loudest sample heard
    NoPeaksUsedSessionMax { session_max: f64 },
    /// Nothing louder than the room was heard; thresholds follow the baseline
    NoGestureSignal { baseline_max: f64 },
    /// Moderate threshold is low enough to trigger on ambient sounds
    ThresholdLow { moderate: u32 },
    /// Moderate threshold is high enough to miss ordinary claps
    ThresholdHigh { moderate: u32 },
}

impl CalibrationAdvisory {
    /// Whether this advisory lowers the report's confidence
    pub fn degrades_confidence(&self) -> bool {
        matches!(
            self,
            CalibrationAdvisory::NoPeaksUsedSessionMax { .. }
                | CalibrationAdvisory::NoGestureSignal { .. }
        )
    }

    /// Get human-readable description for display
    pub fn describe(&self) -> String {
        match self {
            CalibrationAdvisory::NoPeaksUsedSessionMax { session_max } => format!(
                "No claps detected automatically; using peak loudness {:.0}. Try clapping louder or closer to the microphone.",
                session_max
            ),
            CalibrationAdvisory::NoGestureSignal { baseline_max } => format!(
                "No claps detected; nothing louder than the room (max {:.0}) was heard. Using baseline-based fallback.",
                baseline_max
            ),
            CalibrationAdvisory::ThresholdLow { moderate } => format!(
                "Recommended threshold {} is quite low. If you see false positives, use the conservative value.",
                moderate
            ),
            CalibrationAdvisory::ThresholdHigh { moderate } => format!(
                "Recommended threshold {} is quite high. Clap louder, or use the sensitive value.",
                moderate
            ),
        }
    }
}

/// Recommendation plus the confidence it was derived with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub thresholds: ThresholdRecommendation,
    pub confidence: Confidence,
    pub advisories: Vec<CalibrationAdvisory>,
}

/// Truncate a non-negative product to a threshold value
fn tier(value: f64) -> u32 {
    value.max(0.0) as u32
}

/// Derive threshold tiers
///
/// # Arguments
/// * `baseline` - Ambient statistics
/// * `clap_average` - Mean loudness of detected peaks, `None` without peaks
/// * `session_max` - Loudest sample of the whole session
pub fn recommend(
    baseline: &BaselineStats,
    clap_average: Option<f64>,
    session_max: f64,
) -> Recommendation {
    let mut advisories = Vec::new();

    let thresholds = match clap_average.filter(|avg| *avg > 0.0) {
        Some(clap_avg) => {
            let noise_margin = baseline.noise_margin();
            ThresholdRecommendation {
                conservative: tier(0.6 * clap_avg).max(tier(2.0 * noise_margin)),
                moderate: tier(0.5 * clap_avg).max(tier(1.5 * noise_margin)),
                sensitive: tier(0.4 * clap_avg).max(tier(1.2 * noise_margin)),
            }
        }
        None if session_max > 1.2 * baseline.max => {
            warn!(
                "[Calibration] No claps detected, falling back to session peak {:.0}",
                session_max
            );
            advisories.push(CalibrationAdvisory::NoPeaksUsedSessionMax { session_max });
            ThresholdRecommendation {
                conservative: tier(0.7 * session_max),
                moderate: tier(0.6 * session_max),
                sensitive: tier(0.5 * session_max),
            }
        }
        None => {
            warn!(
                "[Calibration] No gesture signal above baseline max {:.0}, using baseline fallback",
                baseline.max
            );
            advisories.push(CalibrationAdvisory::NoGestureSignal {
                baseline_max: baseline.max,
            });
            ThresholdRecommendation {
                conservative: tier(2.5 * baseline.max),
                moderate: tier(2.0 * baseline.max),
                sensitive: tier(1.5 * baseline.max),
            }
        }
    };

    if thresholds.moderate < LOW_THRESHOLD_WARNING {
        advisories.push(CalibrationAdvisory::ThresholdLow {
            moderate: thresholds.moderate,
        });
    } else if thresholds.moderate > HIGH_THRESHOLD_WARNING {
        advisories.push(CalibrationAdvisory::ThresholdHigh {
            moderate: thresholds.moderate,
        });
    }

    let confidence = if advisories.iter().any(|a| a.degrades_confidence()) {
        Confidence::Degraded
    } else {
        Confidence::Normal
    };

    Recommendation {
        thresholds,
        confidence,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_baseline(average: f64, max: f64, std_dev: f64) -> BaselineStats {
        BaselineStats {
            average,
            max,
            std_dev,
            samples: 100,
        }
    }

    #[test]
    fn test_recommend_from_clap_average() {
        let baseline = create_baseline(10.0, 14.0, 1.0);
        let rec = recommend(&baseline, Some(2000.0), 2100.0);

        assert_eq!(rec.thresholds.conservative, 1200);
        assert_eq!(rec.thresholds.moderate, 1000);
        assert_eq!(rec.thresholds.sensitive, 800);
        assert_eq!(rec.thresholds.recommended(), 1000);
        assert_eq!(rec.confidence, Confidence::Normal);
        assert!(rec.advisories.is_empty());
    }

    #[test]
    fn test_noise_margin_floors_quiet_claps() {
        // noise margin = 300 + 2 * 50 = 400
        let baseline = create_baseline(300.0, 450.0, 50.0);
        let rec = recommend(&baseline, Some(600.0), 700.0);

        assert_eq!(rec.thresholds.conservative, 800);
        assert_eq!(rec.thresholds.moderate, 600);
        assert_eq!(rec.thresholds.sensitive, 480);
        assert_eq!(rec.confidence, Confidence::Normal);
    }

    #[test]
    fn test_session_max_fallback_is_degraded() {
        let baseline = create_baseline(10.0, 100.0, 2.0);
        let rec = recommend(&baseline, None, 1000.0);

        assert_eq!(rec.thresholds.conservative, 700);
        assert_eq!(rec.thresholds.moderate, 600);
        assert_eq!(rec.thresholds.sensitive, 500);
        assert_eq!(rec.confidence, Confidence::Degraded);
        assert!(matches!(
            rec.advisories[0],
            CalibrationAdvisory::NoPeaksUsedSessionMax { .. }
        ));
    }

    #[test]
    fn test_baseline_fallback_is_degraded() {
        let baseline = create_baseline(10.0, 100.0, 2.0);
        let rec = recommend(&baseline, None, 110.0);

        assert_eq!(rec.thresholds.conservative, 250);
        assert_eq!(rec.thresholds.moderate, 200);
        assert_eq!(rec.thresholds.sensitive, 150);
        assert_eq!(rec.confidence, Confidence::Degraded);
        assert!(rec
            .advisories
            .contains(&CalibrationAdvisory::NoGestureSignal { baseline_max: 100.0 }));
        assert!(rec
            .advisories
            .contains(&CalibrationAdvisory::ThresholdLow { moderate: 200 }));
    }

    #[test]
    fn test_high_threshold_advisory_keeps_confidence() {
        let baseline = create_baseline(10.0, 14.0, 1.0);
        let rec = recommend(&baseline, Some(12000.0), 12500.0);
        assert_eq!(rec.thresholds.moderate, 6000);
        assert_eq!(rec.confidence, Confidence::Normal);
        assert_eq!(
            rec.advisories,
            vec![CalibrationAdvisory::ThresholdHigh { moderate: 6000 }]
        );
    }

    #[test]
    fn test_tiers_are_ordered() {
        let cases = [
            (create_baseline(10.0, 14.0, 1.0), Some(2000.0), 2000.0),
            (create_baseline(300.0, 450.0, 50.0), Some(600.0), 700.0),
            (create_baseline(900.0, 1200.0, 400.0), Some(1000.0), 1500.0),
            (create_baseline(10.0, 100.0, 2.0), None, 1000.0),
            (create_baseline(10.0, 100.0, 2.0), None, 100.0),
            (create_baseline(0.0, 0.0, 0.0), None, 0.0),
        ];
        for (baseline, clap_avg, session_max) in cases {
            let t = recommend(&baseline, clap_avg, session_max).thresholds;
            assert!(
                t.conservative >= t.moderate && t.moderate >= t.sensitive,
                "Tiers out of order: {:?}",
                t
            );
        }
    }
}
