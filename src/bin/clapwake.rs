use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clapwake::actions::{ActionSink, CommandActions, LogActions};
use clapwake::calibration::{
    CalibrationPhase, CalibrationReport, CalibrationSettings, Calibrator, MicTest,
    MicTestSummary,
};
use clapwake::config::{AppConfig, DEFAULT_CONFIG_PATH};
use clapwake::detection::{ClapDetector, GestureEvent};
use clapwake::listener::{ListenSummary, Listener};
use clapwake::source::{
    LoudnessSample, LoudnessSource, MicrophoneSource, SyntheticSession, WavLoudnessSource,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "clapwake",
    about = "Clap to wake the display, double clap to lock the screen"
)]
struct Cli {
    /// Configuration file (created with defaults when missing)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Debug logging (needed to see per-frame loudness values)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen on the microphone and run the configured actions
    Listen {
        /// Log gestures without running any command
        #[arg(long)]
        dry_run: bool,
    },
    /// Record a calibration session from the microphone
    Calibrate {
        /// Store the moderate threshold in the configuration file
        #[arg(long)]
        write_config: bool,
        /// Skip the microphone test
        #[arg(long)]
        skip_mic_test: bool,
    },
    /// Run the detector over a WAV recording and print gestures as JSON lines
    Replay {
        #[arg(long)]
        wav: PathBuf,
        /// Override the configured threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Run calibration analysis over a WAV recording
    Analyze {
        #[arg(long)]
        wav: PathBuf,
        /// Loudest microphone test value, if known
        #[arg(long)]
        mic_peak: Option<f64>,
        /// Override the configured baseline length
        #[arg(long)]
        baseline_seconds: Option<f64>,
        /// Store the moderate threshold in the configuration file
        #[arg(long)]
        write_config: bool,
    },
    /// Calibrate on a synthetic session and replay it with the result
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 6)]
        claps: usize,
        /// Generate double claps with this gap (seconds)
        #[arg(long)]
        double_gap: Option<f64>,
    },
}

/// Microphone test found no usable input
const EXIT_MIC_TEST_FAILED: u8 = 2;
/// Calibration produced a threshold the detector would reject
const EXIT_UNUSABLE_THRESHOLD: u8 = 3;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    clapwake::init_logging(cli.verbose);
    let config = AppConfig::load_or_create(&cli.config);

    match cli.command {
        Commands::Listen { dry_run } => run_listen(&config, dry_run),
        Commands::Calibrate {
            write_config,
            skip_mic_test,
        } => run_calibrate(&config, &cli.config, write_config, skip_mic_test),
        Commands::Replay { wav, threshold } => run_replay(&config, &wav, threshold),
        Commands::Analyze {
            wav,
            mic_peak,
            baseline_seconds,
            write_config,
        } => run_analyze(
            &config,
            &cli.config,
            &wav,
            mic_peak,
            baseline_seconds,
            write_config,
        ),
        Commands::Simulate {
            seed,
            claps,
            double_gap,
        } => run_simulate(&config, seed, claps, double_gap),
    }
}

fn run_listen(config: &AppConfig, dry_run: bool) -> Result<ExitCode> {
    let detector = ClapDetector::new(
        config
            .detector_config()
            .context("invalid detection settings")?,
    );
    let source = MicrophoneSource::open(&config.audio).context("opening microphone")?;
    let actions: Box<dyn ActionSink> = if dry_run {
        Box::new(LogActions::new())
    } else {
        Box::new(CommandActions::from_config(&config.actions))
    };

    let mut listener = Listener::new(source, detector, actions)
        .start_active(config.actions.start_active)
        .log_rms_values(config.log_rms_values);
    let handle = listener.handle();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("[Listen] Interrupted, stopping");
        handle.stop();
    }) {
        warn!("[Listen] Failed to set Ctrl+C handler: {}", err);
    }
    let summary = listener.run();
    emit_json(&summary)?;
    Ok(ExitCode::from(0))
}

fn run_calibrate(
    config: &AppConfig,
    config_path: &Path,
    write_config: bool,
    skip_mic_test: bool,
) -> Result<ExitCode> {
    let mut source = MicrophoneSource::open(&config.audio).context("opening microphone")?;

    let mic_test = if skip_mic_test {
        None
    } else {
        let summary = run_mic_test(config, &mut source)?;
        if !summary.verdict.can_continue() {
            emit_json(&summary)?;
            return Ok(ExitCode::from(EXIT_MIC_TEST_FAILED));
        }
        Some(summary)
    };
    let mic_peak = mic_test.map(|summary| summary.max);

    info!(
        "[Calibrate] Stay quiet for {:.0}s, then clap {} times",
        config.calibration.baseline_seconds, config.calibration.target_claps
    );
    let mut calibrator = Calibrator::new(config.calibration.settings(mic_peak));
    let mut announced_gestures = false;
    let mut last_progress = 0.0;
    while !calibrator.is_complete() {
        let sample = next_live_sample(&mut source)?;
        calibrator.add_sample(sample.value, sample.timestamp);

        let progress = calibrator.progress();
        if progress.phase == CalibrationPhase::Gestures && !announced_gestures {
            announced_gestures = true;
            info!(
                "[Calibrate] {} now! Threshold {:.0}",
                progress.phase.display_name(),
                progress.working_threshold
            );
        }
        if progress.elapsed - last_progress >= 1.0 {
            last_progress = progress.elapsed;
            info!(
                "[Calibrate] {} {:.0}s left, claps {}/{}, recent level {:.0}",
                progress.phase.display_name(),
                progress.phase_remaining,
                progress.claps_detected,
                progress.target_claps,
                progress.recent_average
            );
        }
    }

    let report = calibrator
        .finalize(config.calibration.baseline_seconds, mic_peak)
        .context("analysing calibration session")?;
    report_advisories(&report);
    emit_json(&CalibratePayload {
        mic_test,
        report: &report,
    })?;

    if write_config {
        return save_recommendation(config, config_path, &report);
    }
    Ok(ExitCode::from(0))
}

/// Store the recommended threshold, refusing values the detector rejects
fn save_recommendation(
    config: &AppConfig,
    config_path: &Path,
    report: &CalibrationReport,
) -> Result<ExitCode> {
    let threshold = report.recommendation.recommended() as f64;
    let tuned = match config.tuned(threshold) {
        Ok(tuned) => tuned,
        Err(err) => {
            warn!(
                "[Calibrate] Not saving threshold {} to {}: {}",
                threshold,
                config_path.display(),
                err
            );
            return Ok(ExitCode::from(EXIT_UNUSABLE_THRESHOLD));
        }
    };
    tuned
        .save_to_file(config_path)
        .with_context(|| format!("writing {}", config_path.display()))?;
    info!(
        "[Calibrate] Saved threshold {} to {}",
        threshold,
        config_path.display()
    );
    Ok(ExitCode::from(0))
}

fn run_mic_test(config: &AppConfig, source: &mut MicrophoneSource) -> Result<MicTestSummary> {
    info!(
        "[MicTest] Stay quiet for {:.0}s, then make a sound",
        config.calibration.mic_test_quiet_seconds
    );
    let mut test = MicTest::new(config.calibration.mic_test_quiet_seconds);
    let mut start = None;
    loop {
        let sample = next_live_sample(source)?;
        let began = *start.get_or_insert(sample.timestamp);
        if sample.timestamp - began >= config.calibration.mic_test_seconds {
            break;
        }
        test.add_sample(sample.value, sample.timestamp);
    }

    let summary = test.summary().context("microphone test")?;
    info!(
        "[MicTest] {} (min {:.0}, max {:.0}, avg {:.0})",
        summary.verdict.display_name(),
        summary.min,
        summary.max,
        summary.average
    );
    Ok(summary)
}

fn next_live_sample(source: &mut MicrophoneSource) -> Result<LoudnessSample> {
    source
        .next_sample()
        .context("reading microphone")?
        .context("microphone stream ended")
}

fn run_replay(config: &AppConfig, wav: &Path, threshold: Option<f64>) -> Result<ExitCode> {
    let config = match threshold {
        Some(threshold) => config.with_threshold(threshold),
        None => config.clone(),
    };
    let detector = ClapDetector::new(
        config
            .detector_config()
            .context("invalid detection settings")?,
    );
    let source = WavLoudnessSource::open(wav, config.audio.chunk_size)
        .with_context(|| format!("reading {}", wav.display()))?;

    let summary = Listener::new(source, detector, JsonLinesActions)
        .log_rms_values(config.log_rms_values)
        .run();
    info!(
        "[Replay] {} frames, {} single, {} double",
        summary.frames, summary.singles, summary.doubles
    );
    Ok(ExitCode::from(0))
}

fn run_analyze(
    config: &AppConfig,
    config_path: &Path,
    wav: &Path,
    mic_peak: Option<f64>,
    baseline_seconds: Option<f64>,
    write_config: bool,
) -> Result<ExitCode> {
    let mut source = WavLoudnessSource::open(wav, config.audio.chunk_size)
        .with_context(|| format!("reading {}", wav.display()))?;
    let baseline_seconds = baseline_seconds.unwrap_or(config.calibration.baseline_seconds);
    let settings = CalibrationSettings {
        baseline_seconds,
        ..config.calibration.settings(mic_peak)
    };

    let calibrator = record(&mut source, settings)?;
    let report = calibrator
        .finalize(baseline_seconds, mic_peak)
        .with_context(|| format!("analysing {}", wav.display()))?;
    report_advisories(&report);
    emit_json(&report)?;

    if write_config {
        return save_recommendation(config, config_path, &report);
    }
    Ok(ExitCode::from(0))
}

fn run_simulate(
    config: &AppConfig,
    seed: u64,
    claps: usize,
    double_gap: Option<f64>,
) -> Result<ExitCode> {
    let session = SyntheticSession {
        seed,
        claps,
        double_clap_gap: double_gap,
        frame_seconds: config.audio.frame_seconds(),
        baseline_seconds: config.calibration.baseline_seconds,
        ..SyntheticSession::default()
    };

    let settings = CalibrationSettings {
        // Let the whole session play out
        gesture_max_seconds: f64::INFINITY,
        target_claps: usize::MAX,
        ..config.calibration.settings(None)
    };
    let calibrator = record(&mut session.source(), settings)?;
    let report = calibrator
        .finalize(config.calibration.baseline_seconds, None)
        .context("analysing synthetic session")?;
    report_advisories(&report);

    let threshold = report.recommendation.recommended() as f64;
    let tuned = match config.tuned(threshold) {
        Ok(tuned) => tuned,
        Err(err) => {
            warn!("[Simulate] Cannot replay with threshold {}: {}", threshold, err);
            emit_json(&report)?;
            return Ok(ExitCode::from(EXIT_UNUSABLE_THRESHOLD));
        }
    };
    let detector = ClapDetector::new(
        tuned
            .detector_config()
            .context("invalid detection settings")?,
    );
    let replay = Listener::new(session.source(), detector, LogActions::new()).run();

    emit_json(&SimulatePayload {
        session: &session,
        report: &report,
        replay,
    })?;
    Ok(ExitCode::from(0))
}

/// Feed a recorded source into a calibrator until it completes or runs dry
fn record<S: LoudnessSource>(source: &mut S, settings: CalibrationSettings) -> Result<Calibrator> {
    let mut calibrator = Calibrator::new(settings);
    while !calibrator.is_complete() {
        match source.next_sample().context("reading loudness source")? {
            Some(sample) => {
                calibrator.add_sample(sample.value, sample.timestamp);
            }
            None => break,
        }
    }
    Ok(calibrator)
}

fn report_advisories(report: &CalibrationReport) {
    for advisory in &report.advisories {
        warn!("[Calibrate] {}", advisory.describe());
    }
    if report.is_degraded() {
        warn!("[Calibrate] Low confidence result; consider running calibration again");
    }
}

fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Prints each gesture as one JSON line on stdout
struct JsonLinesActions;

impl ActionSink for JsonLinesActions {
    fn dispatch(&mut self, event: &GestureEvent) -> io::Result<()> {
        let line = serde_json::to_string(event)?;
        println!("{line}");
        Ok(())
    }
}

#[derive(Serialize)]
struct CalibratePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    mic_test: Option<MicTestSummary>,
    report: &'a CalibrationReport,
}

#[derive(Serialize)]
struct SimulatePayload<'a> {
    session: &'a SyntheticSession,
    report: &'a CalibrationReport,
    replay: ListenSummary,
}
