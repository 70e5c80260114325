// Calibration module - derives the detector threshold from a recorded session
//
// The calibration workflow:
// 1. Optionally run a MicTest to confirm the input reacts to sound
// 2. Create a Calibrator and feed it the baseline (quiet) samples
// 3. Keep feeding gesture samples until is_complete()
// 4. Finalize to get a CalibrationReport with three threshold tiers
//
// finalize() never fails for a long enough session; statistical fallbacks
// are reported through Confidence::Degraded and the report's advisories.

pub mod adaptive;
pub mod mic_test;
pub mod peaks;
pub mod progress;
pub mod recommendation;
pub mod session;
pub mod stats;

pub use adaptive::{preview_threshold, AdaptiveThreshold};
pub use mic_test::{MicTest, MicTestSummary, MicTestVerdict};
pub use peaks::{extract_peaks, Peak, PeakExtractor, ThresholdSupplier};
pub use progress::{CalibrationPhase, CalibrationProgress};
pub use recommendation::{
    recommend, CalibrationAdvisory, Confidence, Recommendation, ThresholdRecommendation,
};
pub use session::{
    CalibrationReport, CalibrationSettings, Calibrator, PeakSource, SessionSummary,
    MIN_SESSION_SAMPLES,
};
pub use stats::{BaselineStats, PeakStats, RollingWindow};
