//! Multichannel f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Maximum number of audio channels per buffer.
pub const MAX_CHANNELS: u16 = 8;

/// Default block size for audio processing.
pub const BLOCK_SIZE: usize = 512;

/// A multichannel f32 audio buffer in planar layout.
///
/// Storage is allocated once for `capacity` frames per channel. The number
/// of live frames can then be changed per block with [`set_frames`] without
/// touching the allocator, so a device callback with a varying block size
/// can reuse one buffer.
///
/// `data[ch * capacity + frame]` gives the sample for channel `ch` at `frame`.
///
/// [`set_frames`]: AudioBuffer::set_frames
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    capacity: usize,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with `frames` live frames and the same capacity.
    pub fn new(channels: u16, frames: usize) -> Self {
        let channels = channels.min(MAX_CHANNELS);
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            capacity: frames,
            frames,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of live frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Frames allocated per channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the live frame count, clamped to capacity. Returns the new count.
    pub fn set_frames(&mut self, frames: usize) -> usize {
        self.frames = frames.min(self.capacity);
        self.frames
    }

    /// Read-only access to one channel's live samples.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.capacity;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's live samples.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.capacity;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Add `signal` into every channel starting at frame `offset`. Samples
    /// past the live frame count are ignored.
    pub fn add_to_all(&mut self, offset: usize, signal: &[f32]) {
        for ch in 0..self.channels {
            if let Some(dst) = self.channel_mut(ch).get_mut(offset..) {
                for (d, s) in dst.iter_mut().zip(signal) {
                    *d += s;
                }
            }
        }
    }

    /// Load interleaved samples with `src_channels` channels per frame.
    ///
    /// Sets the live frame count from the input length (clamped to capacity).
    /// Source channels beyond this buffer's are dropped; missing ones are
    /// silenced.
    pub fn read_interleaved(&mut self, src: &[f32], src_channels: usize) {
        if src_channels == 0 {
            self.set_frames(0);
            return;
        }
        let frames = self.set_frames(src.len() / src_channels);
        for ch in 0..self.channels {
            let c = ch as usize;
            let dst = self.channel_mut(ch);
            if c < src_channels {
                for (i, d) in dst.iter_mut().enumerate().take(frames) {
                    *d = src[i * src_channels + c];
                }
            } else {
                dst.fill(0.0);
            }
        }
    }

    /// Write live frames out interleaved with `dst_channels` channels per frame.
    ///
    /// Output channels beyond this buffer's repeat its last channel, so a mono
    /// buffer fills both sides of a stereo device.
    pub fn write_interleaved(&self, dst: &mut [f32], dst_channels: usize) {
        if dst_channels == 0 || self.channels == 0 {
            dst.fill(0.0);
            return;
        }
        let last = self.channels - 1;
        for (i, frame) in dst.chunks_mut(dst_channels).enumerate() {
            for (c, out) in frame.iter_mut().enumerate() {
                let ch = (c as u16).min(last);
                *out = if i < self.frames {
                    self.data[ch as usize * self.capacity + i]
                } else {
                    0.0
                };
            }
        }
    }
}
