//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug)]
pub enum AudioError {
    /// Failed to initialize audio device
    DeviceInit(String),
    /// Failed to create audio stream
    StreamCreate(String),
    /// Playback error
    Playback(String),
    /// No audio device available
    NoDevice,
    /// Device offers no stereo f32 output
    UnsupportedFormat(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::DeviceInit(msg) => write!(f, "Device init error: {}", msg),
            AudioError::StreamCreate(msg) => write!(f, "Stream create error: {}", msg),
            AudioError::Playback(msg) => write!(f, "Playback error: {}", msg),
            AudioError::NoDevice => write!(f, "No audio device available"),
            AudioError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Trait for audio output backends.
///
/// A backend pulls audio from a [`sq_engine::VoiceRenderer`] it owns, so
/// there is no push-style `write`: control goes through the renderer's
/// shared state and queues instead.
pub trait AudioOutput {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback. The device keeps running but outputs silence.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Is the renderer currently being driven?
    fn is_running(&self) -> bool;
}
