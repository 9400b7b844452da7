//! Pitch and level conversions.
//!
//! Converts MIDI notes to Hz, Hz to a wavetable read increment, and linear
//! gain to and from decibels with a fixed floor so silence never produces
//! `-inf`.

/// MIDI note number of A4.
pub const A4_NOTE: u8 = 69;

/// Frequency of A4 in Hz.
pub const A4_HZ: f32 = 440.0;

/// Decibel floor. Gains at or below this level read as this value, and
/// converting this value back yields a gain of zero.
pub const MIN_DB: f32 = -100.0;

/// Convert a MIDI note number to frequency in Hz (12-TET, A4 = 440 Hz).
pub fn note_to_hz(note: u8) -> f32 {
    A4_HZ * libm::exp2f((note as f32 - A4_NOTE as f32) / 12.0)
}

/// Per-sample read increment through a table of `table_size` samples.
///
/// Returns 0 for a non-positive sample rate or a negative / non-finite
/// frequency.
pub fn hz_to_increment(hz: f32, table_size: usize, sample_rate: f32) -> f32 {
    if sample_rate <= 0.0 || !hz.is_finite() || hz < 0.0 {
        return 0.0;
    }
    hz * table_size as f32 / sample_rate
}

/// Convert linear gain to decibels, floored at [`MIN_DB`].
pub fn gain_to_db(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * libm::log10f(gain)).max(MIN_DB)
    } else {
        MIN_DB
    }
}

/// Convert decibels to linear gain. Anything at or below [`MIN_DB`] is silence.
pub fn db_to_gain(db: f32) -> f32 {
    if db > MIN_DB {
        libm::powf(10.0, db * 0.05)
    } else {
        0.0
    }
}
