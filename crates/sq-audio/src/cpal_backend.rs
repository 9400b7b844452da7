//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use sq_engine::VoiceRenderer;
use sq_ir::AudioBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

/// Output channels the renderer's buffer is sized for.
const RENDER_CHANNELS: u16 = 2;

/// CPAL-based audio output.
///
/// The device callback owns a [`VoiceRenderer`] and calls `render_block` on
/// every buffer the device asks for. There is no dry input in standalone
/// playback, so each block starts from silence.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device with a stereo f32 config.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let default = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let sample_rate = default.sample_rate();

        // The callback works in f32; find a stereo f32 range covering the
        // device's preferred rate.
        let supported = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .find(|range| {
                range.sample_format() == SampleFormat::F32
                    && range.channels() >= RENDER_CHANNELS
                    && range.min_sample_rate() <= sample_rate
                    && range.max_sample_rate() >= sample_rate
            })
            .ok_or_else(|| {
                AudioError::UnsupportedFormat(format!(
                    "no f32 output with {} channels at {} Hz",
                    RENDER_CHANNELS, sample_rate.0
                ))
            })?;

        let mut config: StreamConfig = supported.with_sample_rate(sample_rate).into();
        config.channels = RENDER_CHANNELS;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "opened audio output"
        );

        Ok(Self {
            device,
            config,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Prepare `renderer` for this device, move it into the callback, and
    /// start the stream. Output stays silent until [`AudioOutput::start`].
    pub fn build_stream(
        &mut self,
        mut renderer: VoiceRenderer,
        max_block_size: usize,
    ) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;

        renderer.prepare(self.config.sample_rate.0 as f32, max_block_size);
        let mut buffer = AudioBuffer::new(RENDER_CHANNELS, max_block_size.max(1));

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }

                    // Devices may ask for more than one block at a time.
                    let block_samples = buffer.capacity() * channels;
                    for chunk in data.chunks_mut(block_samples) {
                        buffer.set_frames(chunk.len() / channels);
                        buffer.silence();
                        renderer.render_block(&mut buffer);
                        buffer.write_interleaved(chunk, channels);
                    }
                },
                |err| tracing::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
