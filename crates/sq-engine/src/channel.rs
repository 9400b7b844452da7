//! Mute/solo policy and per-channel metering.

use sq_ir::ChannelId;

use crate::level::LevelDetector;
use crate::published::PublishedBool;

/// Per-channel audibility for one block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Passes([bool; ChannelId::COUNT]);

impl Passes {
    #[inline]
    pub fn get(&self, channel: ChannelId) -> bool {
        self.0[channel.index()]
    }

    pub fn as_array(&self) -> [bool; ChannelId::COUNT] {
        self.0
    }
}

/// Mute and solo flags plus one level detector for each mixer channel.
///
/// Flags are written by the control thread and read by the audio thread;
/// detectors are written by the audio thread and read by the control thread.
#[derive(Debug)]
pub struct ChannelState {
    mute: [PublishedBool; ChannelId::COUNT],
    solo: [PublishedBool; ChannelId::COUNT],
    detectors: [LevelDetector; ChannelId::COUNT],
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new(crate::level::DEFAULT_DECAY_PER_BLOCK)
    }
}

impl ChannelState {
    pub fn new(decay_per_block: f32) -> Self {
        Self {
            mute: Default::default(),
            solo: Default::default(),
            detectors: core::array::from_fn(|_| LevelDetector::new(decay_per_block)),
        }
    }

    pub fn set_mute(&self, channel: ChannelId, muted: bool) {
        self.mute[channel.index()].store(muted);
    }

    pub fn set_solo(&self, channel: ChannelId, soloed: bool) {
        self.solo[channel.index()].store(soloed);
    }

    pub fn is_muted(&self, channel: ChannelId) -> bool {
        self.mute[channel.index()].load()
    }

    pub fn is_soloed(&self, channel: ChannelId) -> bool {
        self.solo[channel.index()].load()
    }

    /// Which channels are audible right now.
    ///
    /// A channel passes when it is unmuted and either nothing is soloed or it
    /// is soloed itself. Reads the flags afresh on every call.
    #[inline]
    pub fn compute_passes(&self) -> Passes {
        let mute: [bool; ChannelId::COUNT] = core::array::from_fn(|i| self.mute[i].load());
        let solo: [bool; ChannelId::COUNT] = core::array::from_fn(|i| self.solo[i].load());
        let any_solo = solo.iter().any(|&s| s);
        Passes(core::array::from_fn(|i| !mute[i] && (!any_solo || solo[i])))
    }

    pub fn detector(&self, channel: ChannelId) -> &LevelDetector {
        &self.detectors[channel.index()]
    }

    pub fn peak_db(&self, channel: ChannelId) -> f32 {
        self.detector(channel).peak_db()
    }

    pub fn reset_detectors(&self) {
        for det in &self.detectors {
            det.reset();
        }
    }
}
