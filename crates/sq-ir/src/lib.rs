//! Data model for the squatch voice.
//!
//! This crate holds the plain types shared between the UI-facing controller
//! and the real-time engine: envelope curves edited by the UI, the selectable
//! wave shapes, the fixed set of mixer channels, transport note events, and
//! the planar audio buffer blocks are rendered into.
//! Nothing here touches atomics or the audio thread.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod channel;
mod envelope_curve;
mod event;
mod wave_shape;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use channel::ChannelId;
pub use envelope_curve::{
    catmull_rom, EnvelopeCurve, EnvelopePoint, EnvelopeTarget, ValueRange, MAX_POINTS,
};
pub use event::NoteEvent;
pub use wave_shape::WaveShape;
