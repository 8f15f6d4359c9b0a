//! Average-power metering over blocks of f32 samples

use crate::sensor::SILENCE_FLOOR_DB;
use ringbuf::{traits::*, HeapRb};

/// Loudest representable level, full scale
pub const FULL_SCALE_DB: f32 = 0.0;

/// Average power of a block in dBFS, clamped to `[-160, 0]`
///
/// Empty or silent blocks report the silence floor.
pub fn average_power_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_FLOOR_DB;
    }

    let mean_square = samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_square.sqrt();
    clamp_power(20.0 * rms.log10())
}

/// Bring any platform reading back into the metering range
pub fn clamp_power(power: f32) -> f32 {
    if power.is_nan() {
        return SILENCE_FLOOR_DB;
    }
    power.clamp(SILENCE_FLOOR_DB, FULL_SCALE_DB)
}

/// Keep one channel of an interleaved buffer
pub fn channel_samples(samples: &[f32], channels: u16, channel: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .filter_map(|frame| frame.get(channel).copied())
        .collect()
}

/// Newest interleaved frames of a capture
///
/// Older audio is overwritten. Blocks must hold whole frames.
pub struct LevelWindow {
    samples: HeapRb<f32>,
    channels: u16,
}

impl LevelWindow {
    pub fn new(frames: usize, channels: u16) -> Self {
        let channels = channels.max(1);
        Self {
            samples: HeapRb::new(frames.max(1) * channels as usize),
            channels,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn push(&mut self, block: &[f32]) {
        let capacity = self.samples.capacity().get();
        let newest = &block[block.len().saturating_sub(capacity)..];
        self.samples.push_slice_overwrite(newest);
    }

    /// Average power of each channel over the window
    pub fn levels(&self) -> Vec<f32> {
        let block: Vec<f32> = self.samples.iter().copied().collect();
        (0..self.channels as usize)
            .map(|channel| average_power_db(&channel_samples(&block, self.channels, channel)))
            .collect()
    }
}
