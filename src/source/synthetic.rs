// Synthetic loudness sessions - seeded ambient noise with clap bursts
//
// Used by the `simulate` command and by tests that need a realistic
// baseline → clapping recording without audio hardware.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{LoudnessSample, LoudnessSource};
use crate::error::AudioError;

/// Share of the clap loudness left in the frame after a clap
const DECAY_RATIO: f64 = 0.3;

/// Shape of a generated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSession {
    pub seed: u64,
    /// Frame cadence in seconds
    pub frame_seconds: f64,
    /// Quiet lead-in before the first clap
    pub baseline_seconds: f64,
    /// Mean ambient loudness
    pub ambient_level: f64,
    /// Uniform ambient jitter (+/-)
    pub ambient_jitter: f64,
    pub claps: usize,
    /// Seconds between clap onsets
    pub clap_interval: f64,
    pub clap_loudness: f64,
    /// Relative clap loudness jitter (+/-)
    pub clap_jitter: f64,
    /// When set, each clap is followed by a second one after this many seconds
    pub double_clap_gap: Option<f64>,
}

impl Default for SyntheticSession {
    fn default() -> Self {
        Self {
            seed: 42,
            frame_seconds: 1024.0 / 44100.0,
            baseline_seconds: 10.0,
            ambient_level: 150.0,
            ambient_jitter: 30.0,
            claps: 6,
            clap_interval: 3.0,
            clap_loudness: 6000.0,
            clap_jitter: 0.15,
            double_clap_gap: None,
        }
    }
}

impl SyntheticSession {
    /// Total length of the session in seconds
    pub fn duration(&self) -> f64 {
        self.baseline_seconds + self.claps as f64 * self.clap_interval
    }

    /// Onset times of every generated clap
    pub fn clap_times(&self) -> Vec<f64> {
        (0..self.claps)
            .flat_map(|k| {
                let first = self.baseline_seconds + (k as f64 + 0.5) * self.clap_interval;
                std::iter::once(first).chain(self.double_clap_gap.map(|gap| first + gap))
            })
            .collect()
    }

    /// Generate the full sample sequence
    pub fn generate(&self) -> Vec<LoudnessSample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let frame = self.frame_seconds.max(1e-6);
        let frames = (self.duration() / frame).ceil() as usize;

        let mut values: Vec<f64> = (0..frames)
            .map(|_| {
                let jitter = if self.ambient_jitter > 0.0 {
                    rng.gen_range(-self.ambient_jitter..=self.ambient_jitter)
                } else {
                    0.0
                };
                (self.ambient_level + jitter).max(0.0)
            })
            .collect();

        for onset in self.clap_times() {
            let index = (onset / frame).round() as usize;
            if index >= frames {
                continue;
            }
            let scale = if self.clap_jitter > 0.0 {
                1.0 + rng.gen_range(-self.clap_jitter..=self.clap_jitter)
            } else {
                1.0
            };
            let loudness = self.clap_loudness * scale;
            values[index] = values[index].max(loudness);
            if let Some(tail) = values.get_mut(index + 1) {
                *tail = tail.max(loudness * DECAY_RATIO);
            }
        }

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| LoudnessSample {
                value,
                timestamp: i as f64 * frame,
            })
            .collect()
    }

    /// Generated session as a loudness source
    pub fn source(&self) -> SyntheticSource {
        SyntheticSource::new(self.generate())
    }
}

/// Replays a pre-generated sample sequence
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    samples: Vec<LoudnessSample>,
    position: usize,
}

impl SyntheticSource {
    pub fn new(samples: Vec<LoudnessSample>) -> Self {
        Self {
            samples,
            position: 0,
        }
    }
}

impl LoudnessSource for SyntheticSource {
    fn next_sample(&mut self) -> Result<Option<LoudnessSample>, AudioError> {
        let sample = self.samples.get(self.position).copied();
        if sample.is_some() {
            self.position += 1;
        }
        Ok(sample)
    }

    fn restart(&mut self) -> Result<(), AudioError> {
        self.position = 0;
        Ok(())
    }
}
