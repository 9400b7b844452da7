//! Peak level metering.

use crate::frequency::{gain_to_db, MIN_DB};
use crate::published::PublishedF32;

/// Decay factor for a 512-sample block at 44.1 kHz falling 60 dB per second.
pub const DEFAULT_DECAY_PER_BLOCK: f32 = 0.922_9;

/// Per-block decay factor that falls `db_per_second` at the given block size
/// and sample rate. Degenerate inputs give 0 (instant release).
pub fn decay_for(block_size: usize, sample_rate: f32, db_per_second: f32) -> f32 {
    if block_size == 0 || !(sample_rate > 0.0) {
        return 0.0;
    }
    let blocks_per_second = sample_rate / block_size as f32;
    libm::powf(10.0, -db_per_second.abs() / (20.0 * blocks_per_second))
}

/// Peak-hold meter with instantaneous attack and exponential release.
///
/// One writer (the audio thread calls [`process`]) and any number of readers
/// polling [`peak_db`]. The decay is fixed at construction. Both the running
/// peak and the published peak are atomics; only the published one is meant
/// to be read off the audio thread.
///
/// [`process`]: LevelDetector::process
/// [`peak_db`]: LevelDetector::peak_db
#[derive(Debug)]
pub struct LevelDetector {
    published: PublishedF32,
    current: PublishedF32,
    decay_per_block: f32,
}

impl Default for LevelDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_PER_BLOCK)
    }
}

impl LevelDetector {
    pub fn new(decay_per_block: f32) -> Self {
        Self {
            published: PublishedF32::new(0.0),
            current: PublishedF32::new(0.0),
            decay_per_block: decay_per_block.clamp(0.0, 1.0),
        }
    }

    /// Feed one block. `None` or an empty slice counts as silence.
    #[inline]
    pub fn process(&self, block: Option<&[f32]>) {
        let block_peak = block
            .unwrap_or(&[])
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()));
        let decayed = self.current.load() * self.decay_per_block;
        let peak = block_peak.max(decayed);
        self.current.store(peak);
        self.published.store(peak);
    }

    /// Last published peak as linear amplitude.
    pub fn peak_linear(&self) -> f32 {
        self.published.load()
    }

    /// Last published peak in dB, floored at [`MIN_DB`].
    pub fn peak_db(&self) -> f32 {
        gain_to_db(self.published.load()).max(MIN_DB)
    }

    pub fn decay_per_block(&self) -> f32 {
        self.decay_per_block
    }

    /// Zero both the running and the published peak.
    pub fn reset(&self) {
        self.current.store(0.0);
        self.published.store(0.0);
    }
}
