//! Controller error type.

use sq_audio::AudioError;

/// Errors from controller operations that reach outside the process or
/// hand data to the audio thread.
#[derive(Debug)]
pub enum ControlError {
    /// The audio backend failed
    Audio(AudioError),
    /// Writing rendered audio failed
    Io(std::io::Error),
    /// The note queue to the audio thread is full; the event was dropped
    QueueFull,
}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::Audio(e) => write!(f, "Audio error: {}", e),
            ControlError::Io(e) => write!(f, "I/O error: {}", e),
            ControlError::QueueFull => write!(f, "Note queue full"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Audio(e) => Some(e),
            ControlError::Io(e) => Some(e),
            ControlError::QueueFull => None,
        }
    }
}

impl From<AudioError> for ControlError {
    fn from(e: AudioError) -> Self {
        ControlError::Audio(e)
    }
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        ControlError::Io(e)
    }
}
