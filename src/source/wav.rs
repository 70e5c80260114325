// WAV loudness source - replays a recording frame by frame
//
// Multi-channel files are mixed to mono before framing. A trailing partial
// frame is dropped so every sample covers exactly `chunk_size` samples.

use std::path::Path;

use super::level::frame_rms;
use super::{LoudnessSample, LoudnessSource};
use crate::error::AudioError;

#[derive(Debug, Clone)]
pub struct WavLoudnessSource {
    samples: Vec<f32>,
    sample_rate: u32,
    chunk_size: usize,
    next_frame: usize,
}

impl WavLoudnessSource {
    /// Open and decode a WAV file
    ///
    /// # Arguments
    /// * `path` - 16/24/32-bit integer or 32-bit float WAV file
    /// * `chunk_size` - Samples per loudness frame
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self, AudioError> {
        let (samples, sample_rate) = read_wav(path.as_ref())?;
        Self::from_samples(samples, sample_rate, chunk_size)
    }

    /// Build from mono samples already in memory
    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        chunk_size: usize,
    ) -> Result<Self, AudioError> {
        if chunk_size == 0 || sample_rate == 0 {
            return Err(AudioError::InvalidSource {
                reason: format!(
                    "chunk_size ({}) and sample_rate ({}) must be positive",
                    chunk_size, sample_rate
                ),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
            chunk_size,
            next_frame: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of complete frames in the recording
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.chunk_size
    }

    /// Recording length in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl LoudnessSource for WavLoudnessSource {
    fn next_sample(&mut self) -> Result<Option<LoudnessSample>, AudioError> {
        if self.next_frame >= self.frame_count() {
            return Ok(None);
        }
        let start = self.next_frame * self.chunk_size;
        let frame = &self.samples[start..start + self.chunk_size];
        let sample = LoudnessSample {
            value: frame_rms(frame),
            timestamp: start as f64 / self.sample_rate as f64,
        };
        self.next_frame += 1;
        Ok(Some(sample))
    }

    /// Rewind to the first frame
    fn restart(&mut self) -> Result<(), AudioError> {
        self.next_frame = 0;
        Ok(())
    }
}

/// Decode a WAV file into normalized mono samples
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| AudioError::WavReadFailed {
        reason: format!("failed to open {}: {err}", path.display()),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::WavReadFailed {
            reason: format!("{} has zero channels", path.display()),
        });
    }

    let interleaved = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|sample| sample.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<Vec<f32>, _>>()?,
        (hound::SampleFormat::Int, bits @ (24 | 32)) => {
            let full_scale = ((1i64 << (bits - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / full_scale))
                .collect::<Result<Vec<f32>, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?} {}-bit", format, bits),
            })
        }
    };

    let channels = spec.channels as usize;
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}
