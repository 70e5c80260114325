// Adaptive gesture-phase threshold
//
// At the baseline → gesture transition a static preview threshold is fixed
// from the ambient statistics (and the microphone test peak when known).
// While claps are being recorded the working threshold drops toward a
// fraction of the loudest sample seen as soon as activity above the ambient
// ceiling appears, and snaps back to the preview on quiet samples.

/// Lower bound of any preview threshold
pub const PREVIEW_FLOOR: f64 = 30.0;

/// Compute the static threshold used when the gesture phase begins
///
/// # Arguments
/// * `baseline_average` - Mean ambient loudness
/// * `baseline_max` - Loudest ambient sample
/// * `mic_test_peak` - Loudest sample of the microphone test, if one ran
pub fn preview_threshold(baseline_average: f64, baseline_max: f64, mic_test_peak: Option<f64>) -> f64 {
    let mic_peak = mic_test_peak.filter(|peak| *peak > 0.0);
    let reference_max = match mic_peak {
        Some(peak) => baseline_max.max(0.8 * peak),
        None => baseline_max,
    };

    let preview = (1.3 * reference_max).max(2.0 * baseline_average).max(PREVIEW_FLOOR);
    match mic_peak {
        Some(peak) => preview.min(0.7 * peak),
        None => preview,
    }
}

/// Working threshold tracker for the gesture phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveThreshold {
    preview: f64,
    baseline_max: f64,
    current: f64,
}

impl AdaptiveThreshold {
    pub fn new(preview: f64, baseline_max: f64) -> Self {
        Self {
            preview,
            baseline_max,
            current: preview,
        }
    }

    pub fn preview(&self) -> f64 {
        self.preview
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Update with the newest sample and the loudest sample seen so far
    ///
    /// Returns the threshold that applies to this sample.
    pub fn observe(&mut self, value: f64, running_max: f64) -> f64 {
        self.current = if value > 1.15 * self.baseline_max {
            let target = (0.55 * running_max).max(1.1 * self.baseline_max);
            target.min(self.preview)
        } else {
            self.preview
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "Expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_preview_without_mic_test() {
        // 1.3 * 100 = 130 beats 2 * 40 = 80 and the floor
        assert_close(preview_threshold(40.0, 100.0, None), 130.0);
        // Quiet room: floor wins
        assert_close(preview_threshold(5.0, 10.0, None), PREVIEW_FLOOR);
        // Average dominates
        assert_close(preview_threshold(80.0, 100.0, None), 160.0);
    }

    #[test]
    fn test_preview_with_mic_test_peak() {
        // reference = max(100, 0.8 * 1000) = 800 -> 1040, capped at 0.7 * 1000
        assert_close(preview_threshold(40.0, 100.0, Some(1000.0)), 700.0);
        // reference = 120 -> 156, capped at 0.7 * 150
        assert_close(preview_threshold(40.0, 100.0, Some(150.0)), 105.0);
        // Zero peak is treated as unknown
        assert_close(preview_threshold(40.0, 100.0, Some(0.0)), 130.0);
    }

    #[test]
    fn test_adaptive_drops_on_activity() {
        let mut adaptive = AdaptiveThreshold::new(500.0, 100.0);
        assert_eq!(adaptive.current(), 500.0);

        // Quiet sample keeps the preview
        assert_eq!(adaptive.observe(90.0, 100.0), 500.0);

        // Activity: max(0.55 * 400, 110) = 220
        assert_close(adaptive.observe(400.0, 400.0), 220.0);

        // Very loud running max is capped by the preview
        assert_eq!(adaptive.observe(2000.0, 2000.0), 500.0);

        // Activity with small running max is floored at 1.1 * baseline max
        let mut adaptive = AdaptiveThreshold::new(500.0, 100.0);
        assert_close(adaptive.observe(120.0, 120.0), 110.0);

        // Back to quiet restores the preview
        assert_eq!(adaptive.observe(50.0, 2000.0), 500.0);
        assert_eq!(adaptive.preview(), 500.0);
    }
}
