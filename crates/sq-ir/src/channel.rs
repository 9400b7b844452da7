//! Mixer channel identifiers.

/// One of the three fixed mixer channels.
///
/// Storage indexed by channel is always a `[T; ChannelId::COUNT]` addressed
/// through [`ChannelId::index`], so bounds are known at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// The synthesized oscillator voice.
    Oomph = 0,
    /// Percussive transient layer. Not rendered yet; its meter only decays.
    Click = 1,
    /// The dry input passed through from the host.
    Dry = 2,
}

impl ChannelId {
    /// Number of channels.
    pub const COUNT: usize = 3;

    /// All channels in index order.
    pub const ALL: [ChannelId; Self::COUNT] = [ChannelId::Oomph, ChannelId::Click, ChannelId::Dry];

    /// Array index for this channel.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            ChannelId::Oomph => "oomph",
            ChannelId::Click => "click",
            ChannelId::Dry => "dry",
        }
    }
}
