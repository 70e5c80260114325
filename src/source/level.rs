// Frame loudness - RMS of raw samples in 16-bit PCM units
//
// Thresholds are configured in the magnitude of int16 RMS values, so
// normalized float samples are scaled back by i16::MAX.

/// Scale from normalized samples to 16-bit PCM units
pub const PCM_SCALE: f64 = i16::MAX as f64;

/// Root-mean-square of one frame, in 16-bit PCM units
///
/// An empty frame is silent.
pub fn frame_rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / frame.len() as f64).sqrt() * PCM_SCALE
}

/// Regroups arbitrarily sized sample blocks into fixed-size frames
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    chunk_size: usize,
    pending: Vec<f32>,
}

impl FrameAccumulator {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
        }
    }

    /// Add one sample; returns the frame loudness when a frame completes
    pub fn push(&mut self, sample: f32) -> Option<f64> {
        self.pending.push(sample);
        if self.pending.len() < self.chunk_size {
            return None;
        }
        let rms = frame_rms(&self.pending);
        self.pending.clear();
        Some(rms)
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
