// Detection module - online clap gesture detection
//
// Turns a stream of per-frame loudness values into debounced gesture
// events. The detector is edge-triggered: one clap is one excursion of the
// signal above the threshold, however many frames it spans.
//
// Gestures:
// - Single: one clap with no qualifying second clap inside the window
// - Double: two claps between min_clap_gap and double_clap_window apart

pub mod clock;
pub mod detector;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use detector::{ClapDetector, DetectorConfig, GestureEvent, GestureKind, SignalLevel};
