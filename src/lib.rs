// clapwake core - clap gesture detection and threshold calibration
// Loudness frames in, debounced single/double clap gestures out

// Module declarations
pub mod actions;
pub mod calibration;
pub mod config;
pub mod detection;
pub mod error;
pub mod listener;
pub mod source;

// Re-exports for convenience
pub use calibration::{CalibrationReport, CalibrationSettings, Calibrator};
pub use config::AppConfig;
pub use detection::{ClapDetector, DetectorConfig, GestureEvent, GestureKind};
pub use listener::{Listener, ListenerHandle};
pub use source::{LoudnessSample, LoudnessSource};

/// Install the global tracing subscriber
///
/// `verbose` lowers the level to debug (per-frame loudness logging needs
/// it). Calling this twice is harmless: the second call does nothing.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
