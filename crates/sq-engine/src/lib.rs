//! Real-time voice engine for squatch.
//!
//! Renders a band-limited oscillator through UI-editable envelopes and meters
//! each mixer channel. Everything the control thread touches while audio runs
//! is an atomic published value; the one ordered hand-off is the envelope LUT
//! flip in [`lut`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod config;
mod frame;
pub mod frequency;
mod level;
pub mod lut;
mod oscillator;
pub mod published;
mod renderer;
pub mod wavetable;

pub use channel::{ChannelState, Passes};
pub use config::EngineConfig;
pub use frame::Frame;
pub use frequency::{db_to_gain, gain_to_db, note_to_hz, MIN_DB};
pub use level::{decay_for, LevelDetector, DEFAULT_DECAY_PER_BLOCK};
pub use lut::{EnvelopeLut, LutView, PingPong, LUT_SIZE};
pub use oscillator::BandLimitedOscillator;
pub use published::{PublishedBool, PublishedF32, PublishedShape};
pub use renderer::{ControlEndpoints, VoiceRenderer, VoiceShared};
pub use wavetable::{band_index_for_freq, WavetableBank, NUM_BANDS, TABLE_SIZE};
