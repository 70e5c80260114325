//! Integration tests for the detection pipeline
//!
//! These tests drive the public API end to end:
//! - ClapDetector timing scenarios with injected timestamps
//! - Listener over synthetic sessions (single and double claps)
//! - Configuration → detector wiring

use clapwake::actions::LogActions;
use clapwake::config::AppConfig;
use clapwake::detection::{ClapDetector, DetectorConfig, GestureKind, ManualClock};
use clapwake::listener::Listener;
use clapwake::source::SyntheticSession;

fn create_detector() -> ClapDetector {
    ClapDetector::new(DetectorConfig::new(3000.0, 500, 100, 1500.0).unwrap())
}

/// Feed (timestamp, loudness) pairs and collect emitted kinds with their times
fn run_timeline(detector: &mut ClapDetector, timeline: &[(f64, f64)]) -> Vec<(GestureKind, f64)> {
    timeline
        .iter()
        .filter_map(|&(t, v)| detector.process_at(v, t))
        .map(|event| (event.kind, event.timestamp))
        .collect()
}

/// 10ms frames from 0 to `end`, loud (4000) at the listed times
fn create_timeline(end: f64, loud_at: &[f64]) -> Vec<(f64, f64)> {
    let frames = (end / 0.01).round() as usize;
    (0..=frames)
        .map(|i| {
            let t = i as f64 * 0.01;
            let loud = loud_at.iter().any(|at| (t - at).abs() < 1e-9);
            (t, if loud { 4000.0 } else { 100.0 })
        })
        .collect()
}

#[test]
fn test_double_clap_at_300ms() {
    let mut detector = create_detector();
    let events = run_timeline(&mut detector, &create_timeline(2.0, &[0.0, 0.3]));

    assert_eq!(events.len(), 1, "Expected exactly one gesture: {:?}", events);
    assert_eq!(events[0].0, GestureKind::Double);
    assert!((events[0].1 - 0.3).abs() < 1e-9);
}

#[test]
fn test_smeared_clap_resolves_to_single() {
    let mut detector = create_detector();
    // One physical clap spread over six frames is one edge
    let smeared = [0.0, 0.01, 0.02, 0.03, 0.04, 0.05];
    let events = run_timeline(&mut detector, &create_timeline(2.0, &smeared));

    assert_eq!(events.len(), 1, "Expected exactly one gesture: {:?}", events);
    assert_eq!(events[0].0, GestureKind::Single);
    // First frame strictly after the 500ms window
    assert!(
        events[0].1 > 0.5 && events[0].1 < 0.52,
        "Single at {}",
        events[0].1
    );
}

#[test]
fn test_late_second_clap_is_a_fresh_first_clap() {
    let mut detector = create_detector();
    // 0.0 resolves as Single at ~0.51; cooldown hides 0.8; 2.2 starts over
    let events = run_timeline(&mut detector, &create_timeline(3.0, &[0.0, 0.8, 2.2]));

    let kinds: Vec<GestureKind> = events.iter().map(|e| e.0).collect();
    assert_eq!(kinds, vec![GestureKind::Single, GestureKind::Single]);
    assert!(
        events[1].1 > 2.69 && events[1].1 < 2.72,
        "Second single at {}",
        events[1].1
    );
}

#[test]
fn test_wall_clock_process_with_manual_clock() {
    let clock = ManualClock::new(0.0);
    let config = DetectorConfig::new(3000.0, 500, 100, 1500.0).unwrap();
    let mut detector = ClapDetector::with_clock(config, &clock);

    assert_eq!(detector.process(4000.0), None);
    clock.set(0.02);
    assert_eq!(detector.process(0.0), None);
    clock.set(0.25);
    let event = detector.process(4000.0).expect("double clap");
    assert_eq!(event.kind, GestureKind::Double);
    assert_eq!(event.timestamp, 0.25);
}

#[test]
fn test_listener_counts_synthetic_single_claps() {
    let session = SyntheticSession::default();
    let mut listener = Listener::new(session.source(), create_detector(), LogActions::new());

    let summary = listener.run();
    assert_eq!(summary.singles, session.claps as u64);
    assert_eq!(summary.doubles, 0);
    assert_eq!(summary.dispatched, session.claps as u64);
    assert_eq!(listener.actions().dispatched(), session.claps);
}

#[test]
fn test_listener_counts_synthetic_double_claps() {
    let session = SyntheticSession {
        double_clap_gap: Some(0.25),
        ..SyntheticSession::default()
    };
    let mut listener = Listener::new(session.source(), create_detector(), LogActions::new());

    let summary = listener.run();
    assert_eq!(summary.doubles, session.claps as u64);
    assert_eq!(summary.singles, 0);
}

#[test]
fn test_default_config_builds_the_reference_detector() {
    let config = AppConfig::default().detector_config().unwrap();
    assert_eq!(config.threshold(), 3000.0);
    assert_eq!(config.double_clap_window().as_millis(), 500);
    assert_eq!(config.min_clap_gap().as_millis(), 100);
    assert_eq!(config.action_cooldown().as_millis(), 1500);
}
