//! Oscillator wave shapes.

/// Waveform selected for the oscillator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WaveShape {
    #[default]
    Sine = 0,
    Triangle = 1,
    Square = 2,
    Saw = 3,
}

impl WaveShape {
    /// Number of shapes.
    pub const COUNT: usize = 4;

    /// All shapes in index order.
    pub const ALL: [WaveShape; Self::COUNT] =
        [WaveShape::Sine, WaveShape::Triangle, WaveShape::Square, WaveShape::Saw];

    /// Table index for this shape.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a raw selector, clamping out-of-range values to the last shape.
    pub const fn from_u8_clamped(raw: u8) -> Self {
        match raw {
            0 => WaveShape::Sine,
            1 => WaveShape::Triangle,
            2 => WaveShape::Square,
            _ => WaveShape::Saw,
        }
    }

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            WaveShape::Sine => "sine",
            WaveShape::Triangle => "triangle",
            WaveShape::Square => "square",
            WaveShape::Saw => "saw",
        }
    }
}

impl TryFrom<u8> for WaveShape {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        if (raw as usize) < Self::COUNT {
            Ok(Self::from_u8_clamped(raw))
        } else {
            Err(raw)
        }
    }
}
