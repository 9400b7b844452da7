//! Headless controller for squatch.
//!
//! Owns the control-thread side of the voice: the editable envelope curves,
//! the note queue producer, the scope consumer, and the live audio output.
//! Both the CLI and any UI drive the voice through this one API.

mod error;
mod script;
mod wav;

use ringbuf::traits::{Consumer, Producer};
use sq_audio::{AudioOutput, CpalOutput};
use sq_engine::{ControlEndpoints, VoiceRenderer, VoiceShared};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

// Re-export common types so callers don't need sq-ir/sq-engine directly.
pub use error::ControlError;
pub use script::{held_note, ScriptEvent};
pub use sq_engine::{EngineConfig, Frame};
pub use sq_ir::{ChannelId, EnvelopeCurve, EnvelopePoint, EnvelopeTarget, NoteEvent, WaveShape};

pub use wav::{frames_to_wav, write_wav};

/// Samples per curve when baking it into a LUT.
pub const BAKE_RESOLUTION: usize = 256;

/// Headless voice controller.
pub struct Controller {
    config: EngineConfig,
    amp_curve: EnvelopeCurve,
    pitch_curve: EnvelopeCurve,
    endpoints: ControlEndpoints,
    /// The live renderer until playback hands it to the audio device.
    renderer: Option<VoiceRenderer>,
    output: Option<CpalOutput>,
}

impl Controller {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let (renderer, endpoints) = VoiceRenderer::new(config.clone());
        let controller = Self {
            config,
            amp_curve: EnvelopeCurve::amplitude(),
            pitch_curve: EnvelopeCurve::pitch(),
            endpoints,
            renderer: Some(renderer),
            output: None,
        };
        controller.bake(EnvelopeTarget::Amplitude);
        controller.bake(EnvelopeTarget::Pitch);
        controller
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State shared with the live renderer.
    pub fn shared(&self) -> &VoiceShared {
        &self.endpoints.shared
    }

    // --- Notes ---

    pub fn note_on(&mut self, note: u8) -> Result<(), ControlError> {
        self.send(NoteEvent::note_on(note))
    }

    pub fn note_off(&mut self, note: u8) -> Result<(), ControlError> {
        self.send(NoteEvent::note_off(note))
    }

    pub fn all_notes_off(&mut self) -> Result<(), ControlError> {
        self.send(NoteEvent::AllNotesOff)
    }

    fn send(&mut self, event: NoteEvent) -> Result<(), ControlError> {
        self.endpoints.notes.try_push(event).map_err(|event| {
            tracing::warn!(?event, "note queue full, dropping event");
            ControlError::QueueFull
        })
    }

    // --- Envelope editing ---

    pub fn curve(&self, target: EnvelopeTarget) -> &EnvelopeCurve {
        match target {
            EnvelopeTarget::Amplitude => &self.amp_curve,
            EnvelopeTarget::Pitch => &self.pitch_curve,
        }
    }

    fn curve_mut(&mut self, target: EnvelopeTarget) -> &mut EnvelopeCurve {
        match target {
            EnvelopeTarget::Amplitude => &mut self.amp_curve,
            EnvelopeTarget::Pitch => &mut self.pitch_curve,
        }
    }

    /// Add a control point and re-bake. Returns its index, or `None` when
    /// the curve is full.
    pub fn add_point(&mut self, target: EnvelopeTarget, time_ms: f32, value: f32) -> Option<usize> {
        let index = self.curve_mut(target).add_point(time_ms, value);
        self.bake(target);
        index
    }

    /// Move a control point, clamped between its neighbours, and re-bake.
    pub fn move_point(&mut self, target: EnvelopeTarget, index: usize, time_ms: f32, value: f32) -> usize {
        let index = self.curve_mut(target).move_point(index, time_ms, value);
        self.bake(target);
        index
    }

    pub fn remove_point(&mut self, target: EnvelopeTarget, index: usize) {
        self.curve_mut(target).remove_point(index);
        self.bake(target);
    }

    pub fn clear_points(&mut self, target: EnvelopeTarget) {
        self.curve_mut(target).clear();
        self.bake(target);
    }

    /// Value used while a curve has no points.
    pub fn set_default_value(&mut self, target: EnvelopeTarget, value: f32) {
        self.curve_mut(target).set_default_value(value);
        self.bake(target);
    }

    /// Does `target` have control points, overriding its plain parameter?
    pub fn is_overridden(&self, target: EnvelopeTarget) -> bool {
        self.curve(target).has_points()
    }

    pub fn set_envelope_duration_ms(&mut self, duration_ms: f32) {
        self.endpoints.shared.set_envelope_duration_ms(duration_ms);
        self.bake(EnvelopeTarget::Amplitude);
        self.bake(EnvelopeTarget::Pitch);
    }

    pub fn envelope_duration_ms(&self) -> f32 {
        self.endpoints.shared.envelope_duration_ms()
    }

    fn bake(&self, target: EnvelopeTarget) {
        bake_into(&self.endpoints.shared, self.curve(target), target);
    }

    // --- Parameters ---

    pub fn set_gain_db(&self, db: f32) {
        self.endpoints.shared.set_gain_db(db);
    }

    pub fn gain_db(&self) -> f32 {
        self.endpoints.shared.gain_db()
    }

    pub fn set_waveshape(&self, shape: WaveShape) {
        self.endpoints.shared.set_waveshape(shape);
    }

    pub fn waveshape(&self) -> WaveShape {
        self.endpoints.shared.waveshape()
    }

    pub fn set_fixed_mode(&self, enabled: bool) {
        self.endpoints.shared.set_fixed_mode(enabled);
    }

    pub fn set_mute(&self, channel: ChannelId, muted: bool) {
        self.endpoints.shared.channels().set_mute(channel, muted);
    }

    pub fn set_solo(&self, channel: ChannelId, soloed: bool) {
        self.endpoints.shared.channels().set_solo(channel, soloed);
    }

    // --- Monitoring ---

    pub fn peak_db(&self, channel: ChannelId) -> f32 {
        self.endpoints.shared.channels().peak_db(channel)
    }

    pub fn is_oscillator_active(&self) -> bool {
        self.endpoints.shared.is_oscillator_active()
    }

    /// Pop rendered voice samples for a scope display. Returns how many
    /// were written.
    pub fn pop_waveform(&mut self, out: &mut [f32]) -> usize {
        self.endpoints.scope.pop_slice(out)
    }

    /// The live renderer, while it has not been handed to an audio device.
    ///
    /// Lets a host drive the voice from its own callback.
    pub fn renderer_mut(&mut self) -> Option<&mut VoiceRenderer> {
        self.renderer.as_mut()
    }

    // --- Real-time playback ---

    /// Start live playback, building the output stream on first use.
    ///
    /// Every start begins from silence with zeroed meters; a note that was
    /// sounding when playback stopped does not resume.
    pub fn play(&mut self) -> Result<(), ControlError> {
        if self.is_playing() {
            return Ok(());
        }
        if self.output.is_none() {
            let mut output = CpalOutput::new()?;
            let renderer = match self.renderer.take() {
                Some(renderer) => renderer,
                None => self.rebuild_voice(),
            };
            output.build_stream(renderer, self.config.max_block_size)?;
            self.output = Some(output);
        }
        self.restart_voice();
        if let Some(output) = self.output.as_mut() {
            output.start()?;
            tracing::info!(sample_rate = output.sample_rate(), "playback started");
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ControlError> {
        if let Some(output) = self.output.as_mut() {
            output.stop()?;
            tracing::info!("playback stopped");
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.output.as_ref().is_some_and(|o| o.is_running())
    }

    /// Drop the voice and zero the meters ahead of a stream (re)start, and
    /// discard scope samples left from before the stop. The device callback
    /// renders nothing until `start`, so the renderer sees the request on its
    /// first block.
    fn restart_voice(&mut self) {
        self.endpoints.shared.request_restart();
        self.endpoints.scope.clear();
    }

    /// Replace the live voice with a fresh one carrying the current settings.
    /// Needed when a failed stream build consumed the previous renderer.
    fn rebuild_voice(&mut self) -> VoiceRenderer {
        let (renderer, endpoints) = VoiceRenderer::new(self.config.clone());
        copy_settings(&self.endpoints.shared, &endpoints.shared);
        self.endpoints = endpoints;
        self.bake(EnvelopeTarget::Amplitude);
        self.bake(EnvelopeTarget::Pitch);
        renderer
    }

    // --- Offline rendering ---

    /// Render `seconds` of the voice with the current settings, driven by
    /// `script`. Events take effect at the start of the block they fall in.
    pub fn render_offline(&self, script: &[ScriptEvent], seconds: f32) -> Vec<Frame> {
        let sample_rate = self.config.sample_rate;
        let total = (seconds.max(0.0) * sample_rate).round() as usize;
        let block = self.config.max_block_size.clamp(1, sq_ir::BLOCK_SIZE);
        let (mut renderer, mut endpoints) =
            VoiceRenderer::new(self.config.clone().with_max_block_size(block));
        copy_settings(&self.endpoints.shared, &endpoints.shared);
        bake_into(&endpoints.shared, &self.amp_curve, EnvelopeTarget::Amplitude);
        bake_into(&endpoints.shared, &self.pitch_curve, EnvelopeTarget::Pitch);

        let events = script::sorted(script);
        let mut next_event = 0;
        let mut buffer = sq_ir::AudioBuffer::new(2, block);
        let mut frames = Vec::with_capacity(total);

        while frames.len() < total {
            let block_start_ms = frames.len() as f32 * 1000.0 / sample_rate;
            while next_event < events.len() && events[next_event].at_ms <= block_start_ms {
                if endpoints.notes.try_push(events[next_event].event).is_err() {
                    tracing::warn!(at_ms = events[next_event].at_ms, "offline note queue full");
                }
                next_event += 1;
            }

            buffer.set_frames((total - frames.len()).min(block));
            buffer.silence();
            renderer.render_block(&mut buffer);
            let (left, right) = (buffer.channel(0), buffer.channel(1));
            frames.extend(left.iter().zip(right).map(|(&l, &r)| Frame::from_f32(l, r)));
            // Offline renders have no scope reader.
            endpoints.scope.clear();
        }
        frames
    }

    pub fn render_to_wav(&self, script: &[ScriptEvent], seconds: f32) -> Vec<u8> {
        let frames = self.render_offline(script, seconds);
        wav::frames_to_wav(&frames, self.config.sample_rate as u32)
    }

    /// Render offline and write a WAV file.
    pub fn render_to_file(
        &self,
        script: &[ScriptEvent],
        seconds: f32,
        path: impl AsRef<Path>,
    ) -> Result<(), ControlError> {
        let frames = self.render_offline(script, seconds);
        let mut file = BufWriter::new(File::create(path.as_ref())?);
        wav::write_wav(&mut file, &frames, self.config.sample_rate as u32)?;
        tracing::info!(path = %path.as_ref().display(), frames = frames.len(), "wrote wav");
        Ok(())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample `curve` and publish it to the matching LUT.
fn bake_into(shared: &VoiceShared, curve: &EnvelopeCurve, target: EnvelopeTarget) {
    let source = curve.sampled(BAKE_RESOLUTION, shared.envelope_duration_ms());
    shared.lut(target).bake(&source);
    if target == EnvelopeTarget::Pitch {
        shared.set_pitch_override(curve.has_points());
    }
}

/// Copy every scalar control value from one voice to another. LUTs are not
/// copied; callers bake curves afterwards.
fn copy_settings(from: &VoiceShared, to: &VoiceShared) {
    to.set_envelope_duration_ms(from.envelope_duration_ms());
    to.set_gain_db(from.gain_db());
    to.set_waveshape(from.waveshape());
    to.set_fixed_mode(from.is_fixed_mode());
    to.set_pitch_override(from.is_pitch_override());
    for channel in ChannelId::ALL {
        to.channels().set_mute(channel, from.channels().is_muted(channel));
        to.channels().set_solo(channel, from.channels().is_soloed(channel));
    }
}
