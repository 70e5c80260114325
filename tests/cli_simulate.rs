use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_clapwake"))
}

fn temp_file(name: &str, extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "clapwake_cli_{}_{}.{}",
        name,
        std::process::id(),
        extension
    ))
}

/// Mono 16-bit WAV at 8 kHz of 1024-sample frames with the given amplitudes
fn write_frames_wav(path: &PathBuf, amplitudes: &[i16]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &amplitude in amplitudes {
        for i in 0..1024 {
            writer
                .write_sample(if i % 2 == 0 { amplitude } else { -amplitude })
                .unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn saved_threshold(config: &PathBuf) -> f64 {
    let text = std::fs::read_to_string(config).expect("config written");
    let json: Value = serde_json::from_str(&text).expect("config JSON");
    json["detection"]["threshold"].as_f64().expect("threshold")
}

fn run_json(args: &[&str]) -> Value {
    let output = cli().args(args).output().expect("failed to run clapwake");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("JSON payload")
}

#[test]
fn simulate_reports_every_clap() {
    let config = temp_file("simulate", "json");
    let json = run_json(&[
        "simulate",
        "--seed",
        "7",
        "--config",
        config.to_str().unwrap(),
    ]);
    std::fs::remove_file(&config).ok();

    assert_eq!(json["report"]["peaks"].as_array().map(|p| p.len()), Some(6));
    assert_eq!(json["report"]["confidence"], "Normal");
    assert_eq!(json["replay"]["singles"], 6);
    assert_eq!(json["replay"]["doubles"], 0);
}

#[test]
fn simulate_double_claps_replay_as_doubles() {
    let config = temp_file("simulate_double", "json");
    let json = run_json(&[
        "simulate",
        "--claps",
        "4",
        "--double-gap",
        "0.25",
        "--config",
        config.to_str().unwrap(),
    ]);
    std::fs::remove_file(&config).ok();

    assert_eq!(json["replay"]["doubles"], 4);
    assert_eq!(json["replay"]["singles"], 0);
}

#[test]
fn analyze_missing_wav_fails() {
    let config = temp_file("analyze_missing", "json");
    let output = cli()
        .args([
            "analyze",
            "--wav",
            "/nonexistent/clapwake.wav",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run clapwake analyze");
    std::fs::remove_file(&config).ok();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn replay_prints_gestures_as_json_lines() {
    // 8 kHz, 1024-sample frames (default chunk size): one loud frame per clap
    let wav = temp_file("replay", "wav");
    let config = temp_file("replay", "json");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
    for frame in 0..40 {
        let amplitude: i16 = if frame == 10 || frame == 12 { 12000 } else { 100 };
        for i in 0..1024 {
            writer
                .write_sample(if i % 2 == 0 { amplitude } else { -amplitude })
                .unwrap();
        }
    }
    writer.finalize().unwrap();

    let output = cli()
        .args([
            "replay",
            "--wav",
            wav.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run clapwake replay");
    std::fs::remove_file(&wav).ok();
    std::fs::remove_file(&config).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON line"))
        .collect();
    assert_eq!(events.len(), 1, "Events: {:?}", events);
    assert_eq!(events[0]["kind"], "Double");
}

#[test]
fn analyze_silent_recording_does_not_write_zero_threshold() {
    let wav = temp_file("analyze_silent", "wav");
    let config = temp_file("analyze_silent", "json");
    write_frames_wav(&wav, &[0; 60]);

    let output = cli()
        .args([
            "analyze",
            "--wav",
            wav.to_str().unwrap(),
            "--write-config",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run clapwake analyze");
    let threshold = saved_threshold(&config);
    std::fs::remove_file(&wav).ok();
    std::fs::remove_file(&config).ok();

    assert_eq!(output.status.code(), Some(3));
    // The defaults created on startup are left untouched
    assert_eq!(threshold, 3000.0);
}

#[test]
fn analyze_writes_recommended_threshold() {
    let wav = temp_file("analyze_claps", "wav");
    let config = temp_file("analyze_claps", "json");
    let amplitudes: Vec<i16> = (0..200)
        .map(|frame| {
            if frame >= 80 && (frame - 80) % 20 == 0 {
                9830
            } else {
                164
            }
        })
        .collect();
    write_frames_wav(&wav, &amplitudes);

    let output = cli()
        .args([
            "analyze",
            "--wav",
            wav.to_str().unwrap(),
            "--write-config",
            "--config",
            config.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run clapwake analyze");
    let threshold = saved_threshold(&config);
    std::fs::remove_file(&wav).ok();
    std::fs::remove_file(&config).ok();

    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        threshold > 1000.0 && threshold < 9830.0,
        "Saved threshold {}",
        threshold
    );
}
