//! Transport note events consumed by the voice.

/// A note event sent from the transport/UI side to the audio thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    /// Start (or retrigger) the voice at a MIDI note.
    NoteOn { note: u8, velocity: u8 },
    /// Release the voice if it is sounding this note.
    NoteOff { note: u8 },
    /// Release the voice unconditionally.
    AllNotesOff,
}

impl NoteEvent {
    /// Create a note on event with default velocity.
    pub fn note_on(note: u8) -> Self {
        Self::NoteOn { note, velocity: 100 }
    }

    /// Create a note off event.
    pub fn note_off(note: u8) -> Self {
        Self::NoteOff { note }
    }
}
