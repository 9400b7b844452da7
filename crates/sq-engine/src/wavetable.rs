//! Band-limited wavetable bank.
//!
//! One single-cycle table per (shape, octave band). Bands double in width
//! from 20 Hz up to 20480 Hz, and each band's table keeps only the partials
//! that stay at or below Nyquist when played at the band's upper edge. High
//! bands therefore sound darker, but nothing the oscillator plays can alias.
//!
//! ```text
//!   band:    0    1    2     3     4     5      6      7      8       9
//!   edges: 20 - 40 - 80 - 160 - 320 - 640 - 1280 - 2560 - 5120 - 10240 - 20480 Hz
//! ```
//!
//! Every table is `TABLE_SIZE + 1` long; the last sample duplicates the first
//! so linear interpolation across the wrap point needs no special case.

use alloc::vec;
use alloc::vec::Vec;
use core::f64::consts::{PI, TAU};

use sq_ir::WaveShape;

/// Samples per cycle (excluding the wrap guard sample).
pub const TABLE_SIZE: usize = 2048;

/// Number of octave bands.
pub const NUM_BANDS: usize = 10;

/// Band boundaries in Hz. Band `b` covers `BAND_EDGES[b]..BAND_EDGES[b + 1]`.
pub const BAND_EDGES: [f32; NUM_BANDS + 1] = [
    20.0, 40.0, 80.0, 160.0, 320.0, 640.0, 1280.0, 2560.0, 5120.0, 10240.0, 20480.0,
];

/// Octave band for a frequency: `floor(log2(hz / 20))` clamped to the bank.
pub fn band_index_for_freq(hz: f32) -> usize {
    if !(hz > BAND_EDGES[0]) {
        return 0;
    }
    let band = libm::floorf(libm::log2f(hz / BAND_EDGES[0]));
    (band as usize).min(NUM_BANDS - 1)
}

/// Highest partial that stays at or below Nyquist at the band's upper edge.
/// Never less than 1, so every band keeps its fundamental.
pub fn max_harmonic(sample_rate: f32, band: usize) -> usize {
    let nyquist = sample_rate * 0.5;
    let top = BAND_EDGES[band.min(NUM_BANDS - 1) + 1];
    (libm::floorf(nyquist / top) as usize).max(1)
}

/// All tables for one sample rate. Immutable once built.
#[derive(Clone, Debug)]
pub struct WavetableBank {
    sample_rate: f32,
    /// `[shape][band]` flattened, each `TABLE_SIZE + 1` samples.
    tables: Vec<Vec<f32>>,
}

impl WavetableBank {
    /// Build every shape and band for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let mut tables = Vec::with_capacity(WaveShape::COUNT * NUM_BANDS);
        for shape in WaveShape::ALL {
            for band in 0..NUM_BANDS {
                let mut table = vec![0.0; TABLE_SIZE + 1];
                fill_table(&mut table, shape, max_harmonic(sample_rate, band));
                tables.push(table);
            }
        }
        tracing::debug!(
            sample_rate,
            tables = tables.len(),
            "built band-limited wavetable bank"
        );
        Self { sample_rate, tables }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The table for a shape and band. `band` is clamped to the bank.
    #[inline]
    pub fn table(&self, shape: WaveShape, band: usize) -> &[f32] {
        &self.tables[shape.index() * NUM_BANDS + band.min(NUM_BANDS - 1)]
    }
}

/// Fill one table with a Fourier partial sum truncated at `max_harmonic`.
fn fill_table(table: &mut [f32], shape: WaveShape, max_harmonic: usize) {
    for (i, slot) in table.iter_mut().take(TABLE_SIZE).enumerate() {
        let phase = TAU * i as f64 / TABLE_SIZE as f64;
        let sample = match shape {
            WaveShape::Sine => libm::sin(phase),
            WaveShape::Triangle => triangle_sample(phase, max_harmonic),
            WaveShape::Square => square_sample(phase, max_harmonic),
            WaveShape::Saw => saw_sample(phase, max_harmonic),
        };
        *slot = sample as f32;
    }
    table[TABLE_SIZE] = table[0];
}

/// Odd partials, alternating sign, 1/n² rolloff. Scaled by 8/π².
fn triangle_sample(phase: f64, max_harmonic: usize) -> f64 {
    let mut sum = 0.0;
    for n in (1..=max_harmonic).step_by(2) {
        let sign = if (n / 2) % 2 == 0 { 1.0 } else { -1.0 };
        let nf = n as f64;
        sum += sign * libm::sin(nf * phase) / (nf * nf);
    }
    sum * (8.0 / (PI * PI))
}

/// Odd partials, 1/n rolloff. Scaled by 4/π.
fn square_sample(phase: f64, max_harmonic: usize) -> f64 {
    let mut sum = 0.0;
    for n in (1..=max_harmonic).step_by(2) {
        let nf = n as f64;
        sum += libm::sin(nf * phase) / nf;
    }
    sum * (4.0 / PI)
}

/// All partials, alternating sign, 1/n rolloff. Scaled by 2/π.
fn saw_sample(phase: f64, max_harmonic: usize) -> f64 {
    let mut sum = 0.0;
    for n in 1..=max_harmonic {
        let sign = if n % 2 == 1 { 1.0 } else { -1.0 };
        let nf = n as f64;
        sum += sign * libm::sin(nf * phase) / nf;
    }
    sum * (2.0 / PI)
}
