// MicrophoneSource - live loudness frames from the default input device
//
// The cpal callback only de-interleaves the first channel and pushes raw
// samples into a lock-free SPSC ring (rtrb). The consumer side regroups
// them into `chunk_size` frames and computes their RMS. Timestamps are
// derived from the number of frames delivered, so they advance at the
// device's real sample rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{error, info, warn};

use super::level::FrameAccumulator;
use super::{LoudnessSample, LoudnessSource};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Ring capacity in seconds of audio
const RING_SECONDS: u32 = 2;

/// Sleep between polls of an empty ring
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A frame must arrive within this long or the stream is considered stalled
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Callback-side state shared with the reader
struct CaptureFlags {
    failed: AtomicBool,
    dropped_samples: AtomicU64,
}

pub struct MicrophoneSource {
    requested: AudioConfig,
    sample_rate: u32,
    stream: Option<cpal::Stream>,
    consumer: Option<Consumer<f32>>,
    flags: Arc<CaptureFlags>,
    accumulator: FrameAccumulator,
    frames_delivered: u64,
}

impl MicrophoneSource {
    /// Open and start the default input device
    ///
    /// # Arguments
    /// * `config` - Requested frame size; the device's default rate and
    ///   channel layout are used, only the first channel is analysed
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        if config.chunk_size == 0 {
            return Err(AudioError::InvalidSource {
                reason: "chunk_size must be positive".to_string(),
            });
        }

        let mut source = Self {
            requested: config.clone(),
            sample_rate: config.sample_rate,
            stream: None,
            consumer: None,
            flags: Arc::new(CaptureFlags {
                failed: AtomicBool::new(false),
                dropped_samples: AtomicU64::new(0),
            }),
            accumulator: FrameAccumulator::new(config.chunk_size),
            frames_delivered: 0,
        };
        source.start()?;
        Ok(source)
    }

    /// Actual capture rate of the running device
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples lost because the reader fell behind
    pub fn dropped_samples(&self) -> u64 {
        self.flags.dropped_samples.load(Ordering::Relaxed)
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = supported.config();
        let sample_rate = stream_config.sample_rate.0;
        if sample_rate != self.requested.sample_rate {
            warn!(
                "[Microphone] Device runs at {} Hz instead of the configured {} Hz",
                sample_rate, self.requested.sample_rate
            );
        }

        let (producer, consumer) = RingBuffer::new((sample_rate * RING_SECONDS) as usize);
        self.flags.failed.store(false, Ordering::Relaxed);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, producer, Arc::clone(&self.flags))
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, producer, Arc::clone(&self.flags))
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, producer, Arc::clone(&self.flags))
            }
            other => {
                return Err(AudioError::UnsupportedFormat {
                    format: format!("{:?}", other),
                })
            }
        }?;

        stream.play().map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Input start failed: {}", e),
        })?;

        info!(
            "[Microphone] Capturing from {} at {} Hz, {} channel(s), {} samples per frame",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            sample_rate,
            stream_config.channels,
            self.requested.chunk_size
        );

        self.sample_rate = sample_rate;
        self.stream = Some(stream);
        self.consumer = Some(consumer);
        self.accumulator.reset();
        Ok(())
    }

    fn stop(&mut self) {
        self.stream.take();
        self.consumer.take();
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: Producer<f32>,
    flags: Arc<CaptureFlags>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let error_flags = Arc::clone(&flags);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let sample = frame[0].to_sample::<f32>();
                    if producer.push(sample).is_err() {
                        flags.dropped_samples.fetch_add(1, Ordering::Relaxed);
                    }
                }
            },
            move |err| {
                error!("[Microphone] Input stream error: {}", err);
                error_flags.failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })
}

impl LoudnessSource for MicrophoneSource {
    fn next_sample(&mut self) -> Result<Option<LoudnessSample>, AudioError> {
        let consumer = self
            .consumer
            .as_mut()
            .ok_or_else(|| AudioError::StreamFailure {
                reason: "input stream is not running".to_string(),
            })?;

        let deadline = Instant::now() + READ_TIMEOUT;
        loop {
            if self.flags.failed.load(Ordering::Relaxed) {
                return Err(AudioError::StreamFailure {
                    reason: "input stream reported an error".to_string(),
                });
            }

            while let Ok(sample) = consumer.pop() {
                if let Some(value) = self.accumulator.push(sample) {
                    let timestamp = (self.frames_delivered * self.requested.chunk_size as u64)
                        as f64
                        / self.sample_rate as f64;
                    self.frames_delivered += 1;
                    return Ok(Some(LoudnessSample { value, timestamp }));
                }
            }

            if Instant::now() >= deadline {
                return Err(AudioError::StreamFailure {
                    reason: format!("no audio received for {:?}", READ_TIMEOUT),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn restart(&mut self) -> Result<(), AudioError> {
        warn!("[Microphone] Restarting input stream");
        self.stop();
        self.start()
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}
