// Listener - drives loudness source → clap detector → actions
//
// Runs until the source is exhausted or the stop flag is raised. Capture
// errors are tolerated: after MAX_CONSECUTIVE_ERRORS failures in a row the
// source is restarted. A failed restart is logged, followed by a back-off,
// and the loop keeps going until stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::ActionSink;
use crate::detection::{ClapDetector, GestureKind};
use crate::error::log_audio_error;
use crate::source::LoudnessSource;

/// Source failures in a row before the source is restarted
pub const MAX_CONSECUTIVE_ERRORS: usize = 5;

/// Pause after a failed restart before reading again
pub const RESTART_BACKOFF: Duration = Duration::from_secs(2);

/// Granularity at which the back-off checks the stop flag
const BACKOFF_POLL: Duration = Duration::from_millis(50);

/// Shared switches for a running listener
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl ListenerHandle {
    /// Ask the loop to return after the current sample
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Enable or pause action dispatch; gestures are still detected and logged
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenSummary {
    pub frames: u64,
    pub singles: u64,
    pub doubles: u64,
    /// Gestures handed to the action sink
    pub dispatched: u64,
    pub source_errors: u64,
    pub restarts: u64,
    pub failed_restarts: u64,
}

pub struct Listener<S, A> {
    source: S,
    detector: ClapDetector,
    actions: A,
    handle: ListenerHandle,
    log_rms_values: bool,
    restart_backoff: Duration,
}

impl<S: LoudnessSource, A: ActionSink> Listener<S, A> {
    pub fn new(source: S, detector: ClapDetector, actions: A) -> Self {
        Self {
            source,
            detector,
            actions,
            handle: ListenerHandle {
                stop: Arc::new(AtomicBool::new(false)),
                active: Arc::new(AtomicBool::new(true)),
            },
            log_rms_values: false,
            restart_backoff: RESTART_BACKOFF,
        }
    }

    /// Whether actions run from the start
    pub fn start_active(self, active: bool) -> Self {
        self.handle.set_active(active);
        self
    }

    /// Log every frame's loudness at debug level
    pub fn log_rms_values(mut self, enabled: bool) -> Self {
        self.log_rms_values = enabled;
        self
    }

    /// Pause after a failed restart (default [`RESTART_BACKOFF`])
    pub fn restart_backoff(mut self, backoff: Duration) -> Self {
        self.restart_backoff = backoff;
        self
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    /// Run the loop until the source is exhausted or stop is requested
    ///
    /// Source errors never end the loop; a source that cannot be restarted
    /// is retried after the back-off.
    pub fn run(&mut self) -> ListenSummary {
        let mut summary = ListenSummary::default();
        let mut consecutive_errors = 0;

        info!(
            "[Listener] Listening (threshold {:.0}, actions {})",
            self.detector.config().threshold(),
            if self.handle.is_active() { "active" } else { "paused" }
        );

        while !self.handle.is_stopped() {
            let sample = match self.source.next_sample() {
                Ok(Some(sample)) => sample,
                Ok(None) => {
                    info!("[Listener] Loudness source exhausted");
                    break;
                }
                Err(err) => {
                    summary.source_errors += 1;
                    consecutive_errors += 1;
                    log_audio_error(&err, "Listener::run");
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        warn!(
                            "[Listener] {} consecutive source errors, restarting",
                            consecutive_errors
                        );
                        match self.source.restart() {
                            Ok(()) => summary.restarts += 1,
                            Err(err) => {
                                summary.failed_restarts += 1;
                                log_audio_error(&err, "Listener::restart");
                                warn!(
                                    "[Listener] Restart failed, retrying in {:.1}s",
                                    self.restart_backoff.as_secs_f64()
                                );
                                self.back_off();
                            }
                        }
                        consecutive_errors = 0;
                    }
                    continue;
                }
            };
            consecutive_errors = 0;
            summary.frames += 1;

            if self.log_rms_values {
                debug!(
                    "[Listener] t={:.3}s rms={:.0}",
                    sample.timestamp, sample.value
                );
            }

            let Some(event) = self.detector.process_at(sample.value, sample.timestamp) else {
                continue;
            };

            match event.kind {
                GestureKind::Single => summary.singles += 1,
                GestureKind::Double => summary.doubles += 1,
            }
            info!(
                "[Listener] {} detected at {:.2}s (loudness {:.0})",
                event.kind.display_name(),
                event.timestamp,
                event.loudness
            );

            if !self.handle.is_active() {
                continue;
            }
            summary.dispatched += 1;
            if let Err(err) = self.actions.dispatch(&event) {
                warn!(
                    "[Listener] Action for {} failed: {}",
                    event.kind.display_name(),
                    err
                );
            }
        }

        summary
    }

    /// Sleep for the restart back-off, returning early on stop
    fn back_off(&self) {
        let until = Instant::now() + self.restart_backoff;
        while !self.handle.is_stopped() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep(BACKOFF_POLL.min(until - now));
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
