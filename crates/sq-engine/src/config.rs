//! Engine configuration.

use crate::level::DEFAULT_DECAY_PER_BLOCK;
use crate::lut::DEFAULT_DURATION_MS;

/// Settings fixed when a [`crate::VoiceRenderer`] is created or prepared.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Largest block `render_block` will be handed. Scratch storage is sized
    /// to this up front; longer blocks are rendered in pieces.
    pub max_block_size: usize,
    pub meter_decay_per_block: f32,
    pub envelope_duration_ms: f32,
    pub note_queue_capacity: usize,
    pub scope_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            max_block_size: 2048,
            meter_decay_per_block: DEFAULT_DECAY_PER_BLOCK,
            envelope_duration_ms: DEFAULT_DURATION_MS,
            note_queue_capacity: 64,
            scope_capacity: 8192,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_max_block_size(mut self, frames: usize) -> Self {
        self.max_block_size = frames.max(1);
        self
    }

    pub fn with_meter_decay_per_block(mut self, decay: f32) -> Self {
        self.meter_decay_per_block = decay;
        self
    }

    pub fn with_envelope_duration_ms(mut self, duration_ms: f32) -> Self {
        self.envelope_duration_ms = duration_ms;
        self
    }

    pub fn with_note_queue_capacity(mut self, capacity: usize) -> Self {
        self.note_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_scope_capacity(mut self, capacity: usize) -> Self {
        self.scope_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_defaults() {
        let config = EngineConfig::default()
            .with_sample_rate(48_000.0)
            .with_max_block_size(0)
            .with_envelope_duration_ms(500.0);
        assert_eq!(config.sample_rate, 48_000.0);
        assert_eq!(config.max_block_size, 1);
        assert_eq!(config.envelope_duration_ms, 500.0);
        assert_eq!(config.note_queue_capacity, 64);
    }
}
