// Descriptive statistics for calibration sessions

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::peaks::Peak;

/// Ambient noise statistics over the baseline prefix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub average: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub samples: usize,
}

impl BaselineStats {
    /// Compute statistics over `values`
    ///
    /// Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len() as f64;
        let average = values.iter().sum::<f64>() / count;
        let max = values.iter().copied().fold(0.0, f64::max);
        let std_dev = if values.len() > 1 {
            let variance = values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / count;
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            average,
            max,
            std_dev,
            samples: values.len(),
        })
    }

    /// Upper bound of ambient loudness: mean + 2 standard deviations
    pub fn noise_margin(&self) -> f64 {
        self.average + 2.0 * self.std_dev
    }
}

/// Statistics over detected clap peaks only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakStats {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl PeakStats {
    pub fn from_peaks(peaks: &[Peak]) -> Option<Self> {
        if peaks.is_empty() {
            return None;
        }

        let sum: f64 = peaks.iter().map(|p| p.loudness).sum();
        let min = peaks.iter().map(|p| p.loudness).fold(f64::INFINITY, f64::min);
        let max = peaks.iter().map(|p| p.loudness).fold(0.0, f64::max);

        Some(Self {
            count: peaks.len(),
            average: sum / peaks.len() as f64,
            min,
            max,
        })
    }
}

/// Bounded window of the most recent loudness values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_stats() {
        let stats = BaselineStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.average, 5.0);
        assert_eq!(stats.max, 9.0);
        assert!((stats.std_dev - 2.0).abs() < 1e-12, "Population std-dev");
        assert_eq!(stats.samples, 8);
        assert!((stats.noise_margin() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_baseline_stats_single_value_has_zero_spread() {
        let stats = BaselineStats::from_values(&[12.0]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.noise_margin(), 12.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(BaselineStats::from_values(&[]).is_none());
        assert!(PeakStats::from_peaks(&[]).is_none());
    }

    #[test]
    fn test_peak_stats() {
        let peaks = [
            Peak {
                timestamp: 1.0,
                loudness: 1800.0,
            },
            Peak {
                timestamp: 4.0,
                loudness: 2200.0,
            },
            Peak {
                timestamp: 7.0,
                loudness: 2000.0,
            },
        ];
        let stats = PeakStats::from_peaks(&peaks).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average, 2000.0);
        assert_eq!(stats.min, 1800.0);
        assert_eq!(stats.max, 2200.0);
    }

    #[test]
    fn test_rolling_window_is_bounded() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.average(), 0.0);

        for value in [1.0, 2.0, 3.0, 10.0] {
            window.push(value);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), 5.0);
    }
}
