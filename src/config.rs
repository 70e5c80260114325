//! Configuration management for the clap listener and calibration tool
//!
//! Settings are stored as JSON so the detection threshold written by a
//! calibration run can be picked up by the listener on its next start.
//! A missing or malformed file never stops the program: defaults apply.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::calibration::CalibrationSettings;
use crate::detection::DetectorConfig;
use crate::error::DetectorError;

/// Default configuration file name, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "clapwake_config.json";

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub detection: DetectionConfig,
    pub calibration: CalibrationConfig,
    pub actions: ActionsConfig,
    /// Log every frame's loudness at debug level
    pub log_rms_values: bool,
}

/// Capture parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per loudness frame
    pub chunk_size: usize,
    /// Requested capture rate in Hz
    pub sample_rate: u32,
    /// Requested channel count (only the first channel is analysed)
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            sample_rate: 44100,
            channels: 1,
        }
    }
}

impl AudioConfig {
    /// Duration of one loudness frame in seconds
    pub fn frame_seconds(&self) -> f64 {
        self.chunk_size as f64 / self.sample_rate.max(1) as f64
    }
}

/// Clap detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Loudness a frame must exceed to count as a clap
    pub threshold: f64,
    pub double_clap_window_ms: u64,
    pub min_clap_gap_ms: u64,
    pub action_cooldown_ms: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 3000.0,
            double_clap_window_ms: 500,
            min_clap_gap_ms: 100,
            action_cooldown_ms: 1500.0,
        }
    }
}

/// Calibration session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Quiet baseline phase length
    pub baseline_seconds: f64,
    /// Clapping phase ends after this long even without enough claps
    pub gesture_max_seconds: f64,
    /// Clapping phase ends once this many claps were confirmed
    pub target_claps: usize,
    /// Total microphone test length
    pub mic_test_seconds: f64,
    /// Leading quiet period of the microphone test
    pub mic_test_quiet_seconds: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            baseline_seconds: 10.0,
            gesture_max_seconds: 45.0,
            target_claps: 6,
            mic_test_seconds: 5.0,
            mic_test_quiet_seconds: 2.0,
        }
    }
}

impl CalibrationConfig {
    /// Settings for a live calibration session
    pub fn settings(&self, mic_test_peak: Option<f64>) -> CalibrationSettings {
        CalibrationSettings {
            baseline_seconds: self.baseline_seconds,
            gesture_max_seconds: self.gesture_max_seconds,
            target_claps: self.target_claps,
            mic_test_peak,
        }
    }
}

/// Commands run for each gesture
///
/// Each command is an argv list; `None` leaves the gesture unbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Run on a single clap
    pub wake_command: Option<Vec<String>>,
    /// Run on a double clap
    pub lock_command: Option<Vec<String>>,
    /// Dispatch actions from the start; when false gestures are only logged
    pub start_active: bool,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            wake_command: None,
            lock_command: None,
            start_active: true,
        }
    }
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            detection: DetectionConfig::default(),
            calibration: CalibrationConfig::default(),
            actions: ActionsConfig::default(),
            log_rms_values: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration; defaults if the file doesn't exist or its
    /// JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration, writing the defaults first if no file exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            return Self::load_from_file(path);
        }

        let config = Self::default();
        match config.save_to_file(path) {
            Ok(()) => log::info!("[Config] Created default configuration at {:?}", path),
            Err(err) => log::warn!(
                "[Config] Could not create default configuration at {:?}: {}",
                path,
                err
            ),
        }
        config
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(path, json)
    }

    /// Validated detector parameters from the `detection` section
    pub fn detector_config(&self) -> Result<DetectorConfig, DetectorError> {
        DetectorConfig::new(
            self.detection.threshold,
            self.detection.double_clap_window_ms,
            self.detection.min_clap_gap_ms,
            self.detection.action_cooldown_ms,
        )
    }

    /// Copy of this configuration with a new detection threshold
    pub fn with_threshold(&self, threshold: f64) -> Self {
        let mut config = self.clone();
        config.detection.threshold = threshold;
        config
    }

    /// Like [`with_threshold`](Self::with_threshold), but only when the
    /// result still builds a detector
    pub fn tuned(&self, threshold: f64) -> Result<Self, DetectorError> {
        let config = self.with_threshold(threshold);
        config.detector_config()?;
        Ok(config)
    }
}
