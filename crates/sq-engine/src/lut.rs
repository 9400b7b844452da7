//! Lock-free double-buffered lookup tables.
//!
//! A [`PingPong`] holds two fixed-size tables and an atomic generation count;
//! the low bit of the generation names the active table. The control thread
//! fills the inactive table and then bumps the generation with a release
//! store. The audio thread acquire-loads the generation and reads that table.
//!
//! ```text
//!   control thread                          audio thread
//!   --------------                          ------------
//!   fence(Release)
//!   write tables[(gen + 1) & 1] (relaxed)
//!   generation.store(gen + 1, Release) ─►   g = generation.load(Acquire)
//!                                           copy tables[g & 1] (relaxed)
//!                                           fence(Acquire)
//!                                           generation.load() == g ?
//! ```
//!
//! Elements are themselves atomics, so a reader never races a writer in the
//! memory-model sense. Once the reader has observed a publish it also
//! observes every element written before it. A reader holding a [`LutView`]
//! across two publishes would see the second one overwrite its table;
//! [`PingPong::snapshot`] detects that by re-checking the generation and
//! copies again. The renderer snapshots once per block.
//!
//! Only one thread may publish. [`EnvelopeLut`] is the envelope-specific
//! wrapper with resampling and a duration.

use core::sync::atomic::{fence, AtomicUsize, Ordering};

use crate::published::PublishedF32;

/// Entries in an envelope LUT.
pub const LUT_SIZE: usize = 512;

/// Default time span a LUT covers.
pub const DEFAULT_DURATION_MS: f32 = 300.0;

/// Copies [`PingPong::snapshot`] makes before settling for a torn one.
pub const SNAPSHOT_ATTEMPTS: usize = 4;

/// Two `N`-entry tables and a generation count naming the active one.
#[derive(Debug)]
pub struct PingPong<const N: usize> {
    tables: [[PublishedF32; N]; 2],
    generation: AtomicUsize,
}

impl<const N: usize> PingPong<N> {
    /// Both tables filled with `fill`, table 0 active.
    pub fn new(fill: f32) -> Self {
        Self {
            tables: [
                core::array::from_fn(|_| PublishedF32::new(fill)),
                core::array::from_fn(|_| PublishedF32::new(fill)),
            ],
            generation: AtomicUsize::new(0),
        }
    }

    /// Fill the inactive table from `value(index)` and make it active.
    ///
    /// Must only be called from one thread.
    pub fn publish(&self, mut value: impl FnMut(usize) -> f32) {
        let next = self.generation.load(Ordering::Relaxed).wrapping_add(1);
        // Readers that see any of the writes below also see the previous bump.
        fence(Ordering::Release);
        for (i, slot) in self.tables[next & 1].iter().enumerate() {
            slot.store(value(i));
        }
        self.generation.store(next, Ordering::Release);
    }

    /// View of the active table. Reads go to the live table, so hold it
    /// only briefly or use [`snapshot`](Self::snapshot).
    #[inline]
    pub fn active(&self) -> LutView<'_, N> {
        let index = self.generation.load(Ordering::Acquire) & 1;
        LutView {
            table: &self.tables[index],
        }
    }

    /// Copy the active table into `out`, copying again if a publish completed
    /// meanwhile. Returns `false` if every one of [`SNAPSHOT_ATTEMPTS`] copies
    /// overlapped a publish; `out` then holds the last copy.
    ///
    /// Never blocks or allocates.
    pub fn snapshot(&self, out: &mut [f32]) -> bool {
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let before = self.generation.load(Ordering::Acquire);
            for (o, slot) in out.iter_mut().zip(self.tables[before & 1].iter()) {
                *o = slot.load();
            }
            fence(Ordering::Acquire);
            if self.generation.load(Ordering::Relaxed) == before {
                return true;
            }
        }
        false
    }

    /// Index (0 or 1) of the table readers currently see.
    pub fn active_index(&self) -> usize {
        self.generation.load(Ordering::Acquire) & 1
    }

    /// How many publishes have completed.
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Acquire)
    }
}

/// Read-only view of one published table.
#[derive(Clone, Copy)]
pub struct LutView<'a, const N: usize> {
    table: &'a [PublishedF32; N],
}

impl<'a, const N: usize> LutView<'a, N> {
    /// Entry at `index`, clamped to the last entry.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        self.table[index.min(N - 1)].load()
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Entry for `elapsed_ms` into a table spanning `duration_ms`.
    #[inline]
    pub fn value_at(&self, elapsed_ms: f32, duration_ms: f32) -> f32 {
        self.get(index_for_elapsed(elapsed_ms, duration_ms, N))
    }

    /// Copy the table out, for inspection and tests.
    pub fn copy_to(&self, out: &mut [f32]) {
        for (o, slot) in out.iter_mut().zip(self.table.iter()) {
            *o = slot.load();
        }
    }
}

/// Map elapsed time onto `0..len`: `min(floor(elapsed / duration * (len - 1)), len - 1)`.
///
/// A non-positive duration, negative elapsed time, or NaN maps to index 0.
#[inline]
pub fn index_for_elapsed(elapsed_ms: f32, duration_ms: f32, len: usize) -> usize {
    if len == 0 || !(duration_ms > 0.0) {
        return 0;
    }
    let last = len - 1;
    // Float-to-int casts saturate: negatives and NaN land on 0.
    let index = libm::floorf(elapsed_ms / duration_ms * last as f32) as usize;
    index.min(last)
}

/// Entry of a snapshotted table for `elapsed_ms` into `duration_ms`.
/// An empty table reads as 0.
#[inline]
pub fn table_value_at(table: &[f32], elapsed_ms: f32, duration_ms: f32) -> f32 {
    table
        .get(index_for_elapsed(elapsed_ms, duration_ms, table.len()))
        .copied()
        .unwrap_or(0.0)
}

/// An envelope baked into a [`PingPong`] LUT with its time span.
#[derive(Debug)]
pub struct EnvelopeLut {
    buffers: PingPong<LUT_SIZE>,
    duration_ms: PublishedF32,
}

impl EnvelopeLut {
    /// A flat LUT at `fill` spanning [`DEFAULT_DURATION_MS`].
    pub fn new(fill: f32) -> Self {
        Self {
            buffers: PingPong::new(fill),
            duration_ms: PublishedF32::new(DEFAULT_DURATION_MS),
        }
    }

    /// Resample `source` into the inactive table and publish it.
    ///
    /// `source` is taken to span the full duration with evenly spaced
    /// samples. An empty source leaves the LUT unchanged; a single sample
    /// bakes a constant.
    pub fn bake(&self, source: &[f32]) {
        let n = source.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            self.buffers.publish(|_| source[0]);
        } else {
            let scale = (n - 1) as f32 / (LUT_SIZE - 1) as f32;
            self.buffers.publish(|i| {
                let pos = i as f32 * scale;
                let i0 = (pos as usize).min(n - 1);
                let i1 = (i0 + 1).min(n - 1);
                let frac = pos - i0 as f32;
                source[i0] + (source[i1] - source[i0]) * frac
            });
        }
        tracing::debug!(
            source_len = n,
            active = self.buffers.active_index(),
            "baked envelope lut"
        );
    }

    /// View of the active table.
    #[inline]
    pub fn active_lut(&self) -> LutView<'_, LUT_SIZE> {
        self.buffers.active()
    }

    /// Copy the active table into `out`. See [`PingPong::snapshot`].
    pub fn snapshot(&self, out: &mut [f32]) -> bool {
        self.buffers.snapshot(out)
    }

    /// Convenience lookup: acquires the active table on every call.
    pub fn value_at_ms(&self, elapsed_ms: f32) -> f32 {
        self.active_lut().value_at(elapsed_ms, self.duration_ms())
    }

    pub fn duration_ms(&self) -> f32 {
        self.duration_ms.load()
    }

    pub fn set_duration_ms(&self, duration_ms: f32) {
        self.duration_ms.store(duration_ms);
    }

    pub fn active_index(&self) -> usize {
        self.buffers.active_index()
    }
}
