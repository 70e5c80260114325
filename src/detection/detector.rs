// ClapDetector - edge-triggered single/double clap state machine
//
// Each call consumes one loudness value. The per-sample transition is:
// 1. Inside the action cooldown: ignore the sample entirely
// 2. Pending single whose window has expired: emit Single
// 3. Rising edge above threshold: either completes a Double or starts a
//    new pending single
// 4. At or below threshold: re-arm edge detection
//
// Singles are resolved lazily on the first sample after the window expires,
// so a Single is reported up to one frame late. The cooldown check always
// runs before the expiry check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{Clock, MonotonicClock};
use crate::error::DetectorError;

/// Validated detector parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    threshold: f64,
    double_clap_window: Duration,
    min_clap_gap: Duration,
    action_cooldown: Duration,
}

impl DetectorConfig {
    /// Build a configuration, rejecting any non-positive parameter
    ///
    /// # Arguments
    /// * `threshold` - Loudness a frame must exceed to count as a clap edge
    /// * `double_clap_window_ms` - Longest gap between the two claps of a Double
    /// * `min_clap_gap_ms` - Shortest gap between the two claps of a Double
    /// * `action_cooldown_ms` - Quiet period after any emitted gesture
    ///
    /// # Returns
    /// * `Ok(DetectorConfig)` - All parameters strictly positive and finite
    /// * `Err(DetectorError::InvalidConfiguration)` - First offending field
    pub fn new(
        threshold: f64,
        double_clap_window_ms: u64,
        min_clap_gap_ms: u64,
        action_cooldown_ms: f64,
    ) -> Result<Self, DetectorError> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(DetectorError::InvalidConfiguration {
                field: "threshold",
                value: threshold,
            });
        }
        if double_clap_window_ms == 0 {
            return Err(DetectorError::InvalidConfiguration {
                field: "double_clap_window_ms",
                value: 0.0,
            });
        }
        if min_clap_gap_ms == 0 {
            return Err(DetectorError::InvalidConfiguration {
                field: "min_clap_gap_ms",
                value: 0.0,
            });
        }
        if !(action_cooldown_ms.is_finite() && action_cooldown_ms > 0.0) {
            return Err(DetectorError::InvalidConfiguration {
                field: "action_cooldown_ms",
                value: action_cooldown_ms,
            });
        }
        if min_clap_gap_ms > double_clap_window_ms {
            tracing::warn!(
                "[ClapDetector] min_clap_gap_ms {} exceeds double_clap_window_ms {}; doubles can never fire",
                min_clap_gap_ms,
                double_clap_window_ms
            );
        }

        Ok(Self {
            threshold,
            double_clap_window: Duration::from_millis(double_clap_window_ms),
            min_clap_gap: Duration::from_millis(min_clap_gap_ms),
            action_cooldown: Duration::from_secs_f64(action_cooldown_ms / 1000.0),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn double_clap_window(&self) -> Duration {
        self.double_clap_window
    }

    pub fn min_clap_gap(&self) -> Duration {
        self.min_clap_gap
    }

    pub fn action_cooldown(&self) -> Duration {
        self.action_cooldown
    }
}

/// Detected gesture type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureKind {
    Single,
    Double,
}

impl GestureKind {
    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            GestureKind::Single => "Single Clap",
            GestureKind::Double => "Double Clap",
        }
    }
}

/// A completed gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    /// Time of the sample on which the gesture was emitted (seconds)
    pub timestamp: f64,
    /// Loudness of the clap that opened a Single, or the second clap of a Double
    pub loudness: f64,
}

/// Position of the signal relative to the threshold on the previous sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLevel {
    Below,
    Above,
}

/// First clap waiting for a possible second one
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingClap {
    at: f64,
    loudness: f64,
}

/// Streaming single/double clap detector
///
/// Owns all of its state; one instance per audio stream.
#[derive(Debug)]
pub struct ClapDetector<C: Clock = MonotonicClock> {
    config: DetectorConfig,
    clock: C,
    level: SignalLevel,
    pending: Option<PendingClap>,
    last_action: Option<f64>,
}

impl ClapDetector<MonotonicClock> {
    /// Create a detector that reads the wall clock on every `process` call
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> ClapDetector<C> {
    pub fn with_clock(config: DetectorConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            level: SignalLevel::Below,
            pending: None,
            last_action: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn level(&self) -> SignalLevel {
        self.level
    }

    /// Timestamp of the clap currently waiting for a second one
    pub fn pending_since(&self) -> Option<f64> {
        self.pending.map(|pending| pending.at)
    }

    pub fn last_action_time(&self) -> Option<f64> {
        self.last_action
    }

    /// Process one loudness value stamped with the detector's clock
    pub fn process(&mut self, loudness: f64) -> Option<GestureEvent> {
        let now = self.clock.now();
        self.process_at(loudness, now)
    }

    /// Process one loudness value observed at `now` (seconds)
    ///
    /// Timestamps must be non-decreasing across calls. Returns at most one
    /// event; never fails.
    pub fn process_at(&mut self, loudness: f64, now: f64) -> Option<GestureEvent> {
        if let Some(last_action) = self.last_action {
            if now - last_action < self.config.action_cooldown.as_secs_f64() {
                return None;
            }
        }

        let window = self.config.double_clap_window.as_secs_f64();
        let min_gap = self.config.min_clap_gap.as_secs_f64();
        let mut event = None;

        if let Some(pending) = self.pending {
            if now - pending.at > window {
                self.pending = None;
                event = Some(self.emit(GestureKind::Single, now, pending.loudness));
            }
        }

        if loudness > self.config.threshold {
            if self.level == SignalLevel::Below {
                self.level = SignalLevel::Above;
                match self.pending {
                    Some(pending) if (min_gap..=window).contains(&(now - pending.at)) => {
                        self.pending = None;
                        event = Some(self.emit(GestureKind::Double, now, loudness));
                    }
                    _ => {
                        debug!(
                            "[ClapDetector] Clap edge at {:.3}s (loudness {:.0}), waiting for a second clap",
                            now, loudness
                        );
                        self.pending = Some(PendingClap { at: now, loudness });
                    }
                }
            }
        } else {
            self.level = SignalLevel::Below;
        }

        event
    }

    fn emit(&mut self, kind: GestureKind, now: f64, loudness: f64) -> GestureEvent {
        self.last_action = Some(self.last_action.map_or(now, |last| last.max(now)));
        debug!("[ClapDetector] {} at {:.3}s", kind.display_name(), now);
        GestureEvent {
            kind,
            timestamp: now,
            loudness,
        }
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
