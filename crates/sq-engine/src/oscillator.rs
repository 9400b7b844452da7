//! Band-limited wavetable oscillator.
//!
//! Reads one of the [`WavetableBank`] tables with linear interpolation. The
//! table is chosen from the current frequency's octave band and the selected
//! wave shape whenever the frequency is set, so `next_sample` itself only
//! branches on the active flag.
//!
//! The wave shape is the one piece of oscillator state written from outside
//! the audio thread. It lives in a shared [`PublishedShape`] and is picked up
//! on the next `set_frequency_hz`. A shape change mid-note is not crossfaded.

use alloc::sync::Arc;

use sq_ir::WaveShape;

use crate::frequency::hz_to_increment;
use crate::published::PublishedShape;
use crate::wavetable::{band_index_for_freq, WavetableBank, TABLE_SIZE};

const TABLE_LEN: f32 = TABLE_SIZE as f32;

/// A single band-limited voice oscillator.
pub struct BandLimitedOscillator {
    bank: WavetableBank,
    shape: Arc<PublishedShape>,
    /// Is the oscillator producing output?
    active: bool,
    /// Fractional read position in `0.0..TABLE_SIZE`.
    position: f32,
    /// Read position advance per sample.
    increment: f32,
    /// Octave band resolved by the last `set_frequency_hz`.
    band: usize,
    /// Shape resolved by the last `set_frequency_hz`.
    table_shape: WaveShape,
}

impl BandLimitedOscillator {
    /// Create an oscillator with its own shape selector.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_shape(sample_rate, Arc::new(PublishedShape::default()))
    }

    /// Create an oscillator reading its shape from a shared selector.
    pub fn with_shape(sample_rate: f32, shape: Arc<PublishedShape>) -> Self {
        let table_shape = shape.load();
        Self {
            bank: WavetableBank::new(sample_rate),
            shape,
            active: false,
            position: 0.0,
            increment: 0.0,
            band: 0,
            table_shape,
        }
    }

    /// Rebuild all tables for a new sample rate and stop the voice.
    ///
    /// Allocates; call before the audio stream starts.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.bank = WavetableBank::new(sample_rate);
        self.active = false;
        self.position = 0.0;
        self.increment = 0.0;
        self.band = 0;
        self.table_shape = self.shape.load();
    }

    pub fn sample_rate(&self) -> f32 {
        self.bank.sample_rate()
    }

    /// Shared shape selector, for handing to the control thread.
    pub fn shape_handle(&self) -> Arc<PublishedShape> {
        Arc::clone(&self.shape)
    }

    /// Publish a new wave shape. Takes effect on the next `set_frequency_hz`.
    pub fn set_waveshape(&self, shape: WaveShape) {
        self.shape.store(shape);
    }

    pub fn waveshape(&self) -> WaveShape {
        self.shape.load()
    }

    /// Set the playback frequency and re-resolve the active table.
    pub fn set_frequency_hz(&mut self, hz: f32) {
        self.increment = hz_to_increment(hz, TABLE_SIZE, self.bank.sample_rate());
        self.band = band_index_for_freq(hz);
        self.table_shape = self.shape.load();
    }

    /// Start the voice from the beginning of the cycle.
    pub fn trigger(&mut self) {
        self.active = true;
        self.position = 0.0;
    }

    /// Hard stop: no release tail.
    pub fn release(&mut self) {
        self.active = false;
        self.increment = 0.0;
        self.position = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn band(&self) -> usize {
        self.band
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    /// Generate the next sample, or 0.0 while inactive.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }

        let table = self.bank.table(self.table_shape, self.band);
        let index0 = (self.position as usize).min(TABLE_SIZE - 1);
        let frac = self.position - index0 as f32;
        let a = table[index0];
        let b = table[index0 + 1];
        let sample = a + frac * (b - a);

        self.position += self.increment;
        if self.position >= TABLE_LEN {
            self.position %= TABLE_LEN;
        }

        sample
    }

    /// Fill a buffer with consecutive samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next_sample();
        }
    }
}
