//! Scalar values handed from one thread to another.
//!
//! Every cross-thread control value in the engine is one of these types
//! rather than a bare shared field. Loads and stores are relaxed: each value
//! is independent and idempotent, so readers only need eventual visibility.
//! The one place where ordering between values matters is the LUT generation
//! in [`crate::lut::PingPong`], which layers acquire/release on top.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use sq_ir::WaveShape;

/// An `f32` stored as its bit pattern in an `AtomicU32`.
#[derive(Debug)]
pub struct PublishedF32(AtomicU32);

impl PublishedF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for PublishedF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// A boolean flag.
#[derive(Debug, Default)]
pub struct PublishedBool(AtomicBool);

impl PublishedBool {
    pub const fn new(value: bool) -> Self {
        Self(AtomicBool::new(value))
    }

    #[inline]
    pub fn store(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag, returning whether it was set.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// The selected oscillator wave shape.
#[derive(Debug, Default)]
pub struct PublishedShape(AtomicU8);

impl PublishedShape {
    pub const fn new(shape: WaveShape) -> Self {
        Self(AtomicU8::new(shape as u8))
    }

    #[inline]
    pub fn store(&self, shape: WaveShape) {
        self.0.store(shape as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> WaveShape {
        WaveShape::from_u8_clamped(self.0.load(Ordering::Relaxed))
    }
}
