//! Block-level voice rendering.
//!
//! [`VoiceRenderer`] lives on the audio thread. Everything the control thread
//! may change while audio runs sits in [`VoiceShared`] behind an `Arc`; note
//! events arrive through an SPSC ring buffer and the rendered voice leaves
//! through another for a scope display.
//!
//! Per block:
//! 1. handle a pending restart, then drain note events (all discarded in
//!    fixed mode), and snapshot both envelope LUTs,
//! 2. resolve mute/solo into per-channel passes,
//! 3. gate the dry input and meter it,
//! 4. render the oscillator through the amplitude (and pitch) LUT into a
//!    scratch block, add it to every output channel if it passes, meter it,
//! 5. decay the unused click meter,
//! 6. publish oscillator activity and push the voice to the scope.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use sq_ir::{AudioBuffer, ChannelId, EnvelopeCurve, EnvelopeTarget, NoteEvent, WaveShape};

use crate::channel::ChannelState;
use crate::config::EngineConfig;
use crate::frequency::{db_to_gain, note_to_hz};
use crate::lut::{table_value_at, EnvelopeLut, LUT_SIZE};
use crate::oscillator::BandLimitedOscillator;
use crate::published::{PublishedBool, PublishedF32, PublishedShape};

/// Control values shared between the control thread and the renderer.
#[derive(Debug)]
pub struct VoiceShared {
    channels: ChannelState,
    amp_lut: EnvelopeLut,
    pitch_lut: EnvelopeLut,
    gain_db: PublishedF32,
    waveshape: Arc<PublishedShape>,
    pitch_override: PublishedBool,
    fixed_mode: PublishedBool,
    osc_active: PublishedBool,
    restart: PublishedBool,
}

impl VoiceShared {
    pub fn new(config: &EngineConfig) -> Self {
        let amp_lut = EnvelopeLut::new(EnvelopeCurve::amplitude().default_value());
        let pitch_lut = EnvelopeLut::new(EnvelopeCurve::pitch().default_value());
        amp_lut.set_duration_ms(config.envelope_duration_ms);
        pitch_lut.set_duration_ms(config.envelope_duration_ms);
        Self {
            channels: ChannelState::new(config.meter_decay_per_block),
            amp_lut,
            pitch_lut,
            gain_db: PublishedF32::new(0.0),
            waveshape: Arc::new(PublishedShape::default()),
            pitch_override: PublishedBool::new(false),
            fixed_mode: PublishedBool::new(false),
            osc_active: PublishedBool::new(false),
            restart: PublishedBool::new(false),
        }
    }

    pub fn channels(&self) -> &ChannelState {
        &self.channels
    }

    /// The LUT driving `target`.
    pub fn lut(&self, target: EnvelopeTarget) -> &EnvelopeLut {
        match target {
            EnvelopeTarget::Amplitude => &self.amp_lut,
            EnvelopeTarget::Pitch => &self.pitch_lut,
        }
    }

    /// Set the time span of both envelopes.
    pub fn set_envelope_duration_ms(&self, duration_ms: f32) {
        self.amp_lut.set_duration_ms(duration_ms);
        self.pitch_lut.set_duration_ms(duration_ms);
    }

    pub fn envelope_duration_ms(&self) -> f32 {
        self.amp_lut.duration_ms()
    }

    pub fn set_gain_db(&self, db: f32) {
        self.gain_db.store(db);
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db.load()
    }

    pub fn set_waveshape(&self, shape: WaveShape) {
        self.waveshape.store(shape);
    }

    pub fn waveshape(&self) -> WaveShape {
        self.waveshape.load()
    }

    /// Let the pitch LUT drive the oscillator frequency instead of the note.
    pub fn set_pitch_override(&self, enabled: bool) {
        self.pitch_override.store(enabled);
    }

    pub fn is_pitch_override(&self) -> bool {
        self.pitch_override.load()
    }

    pub fn set_fixed_mode(&self, enabled: bool) {
        self.fixed_mode.store(enabled);
    }

    pub fn is_fixed_mode(&self) -> bool {
        self.fixed_mode.load()
    }

    /// Whether the oscillator was sounding at the end of the last block.
    pub fn is_oscillator_active(&self) -> bool {
        self.osc_active.load()
    }

    /// Zero the meters now and have the renderer drop its voice at the start
    /// of the next block. For playback (re)start.
    pub fn request_restart(&self) {
        self.channels.reset_detectors();
        self.osc_active.store(false);
        self.restart.store(true);
    }
}

/// The control-thread ends of a renderer's queues, plus the shared state.
pub struct ControlEndpoints {
    pub shared: Arc<VoiceShared>,
    pub notes: HeapProd<NoteEvent>,
    pub scope: HeapCons<f32>,
}

/// Renders one monophonic voice over a dry input, block by block.
pub struct VoiceRenderer {
    config: EngineConfig,
    shared: Arc<VoiceShared>,
    osc: BandLimitedOscillator,
    notes: HeapCons<NoteEvent>,
    scope: HeapProd<f32>,
    /// Voice output for the current chunk, `max_block_size` long.
    scratch: Vec<f32>,
    /// Per-block copies of the envelope LUTs.
    amp_table: Vec<f32>,
    pitch_table: Vec<f32>,
    /// Note that the next matching note-off will release.
    current_note: Option<u8>,
    /// Frequency of `current_note`.
    note_hz: f32,
    /// Samples rendered since the last note-on while the voice sounded.
    note_time: u64,
}

impl VoiceRenderer {
    /// Create a renderer and the endpoints the control thread keeps.
    ///
    /// Allocates the wavetables, queues, and scratch block.
    pub fn new(config: EngineConfig) -> (Self, ControlEndpoints) {
        let shared = Arc::new(VoiceShared::new(&config));
        let (note_tx, note_rx) = HeapRb::<NoteEvent>::new(config.note_queue_capacity.max(1)).split();
        let (scope_tx, scope_rx) = HeapRb::<f32>::new(config.scope_capacity.max(1)).split();
        let osc = BandLimitedOscillator::with_shape(config.sample_rate, Arc::clone(&shared.waveshape));

        let renderer = Self {
            scratch: vec![0.0; config.max_block_size.max(1)],
            amp_table: vec![0.0; LUT_SIZE],
            pitch_table: vec![0.0; LUT_SIZE],
            config,
            shared: Arc::clone(&shared),
            osc,
            notes: note_rx,
            scope: scope_tx,
            current_note: None,
            note_hz: 0.0,
            note_time: 0,
        };
        let endpoints = ControlEndpoints {
            shared,
            notes: note_tx,
            scope: scope_rx,
        };
        (renderer, endpoints)
    }

    /// Reconfigure for a new stream. Rebuilds the wavetables and resizes
    /// scratch storage, so call it before audio starts.
    ///
    /// Envelope LUTs keep their contents.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        self.config.sample_rate = sample_rate;
        self.config.max_block_size = max_block_size.max(1);
        self.scratch = vec![0.0; self.config.max_block_size];
        self.osc.prepare(sample_rate);
        self.reset_voice();
        self.shared.restart.store(false);
        tracing::info!(sample_rate, max_block_size = self.config.max_block_size, "voice prepared");
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn shared(&self) -> &Arc<VoiceShared> {
        &self.shared
    }

    pub fn is_active(&self) -> bool {
        self.osc.is_active()
    }

    pub fn current_note(&self) -> Option<u8> {
        self.current_note
    }

    /// Render one block in place. `buffer` holds the dry input on entry and
    /// the mixed output on return.
    ///
    /// Never blocks, logs, or allocates. With the `alloc_check` feature any
    /// allocation here trips `assert_no_alloc`.
    pub fn render_block(&mut self, buffer: &mut AudioBuffer) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_block_inner(buffer));
        #[cfg(not(feature = "alloc_check"))]
        self.render_block_inner(buffer);
    }

    fn render_block_inner(&mut self, buffer: &mut AudioBuffer) {
        if self.shared.restart.take() {
            self.reset_voice();
        }
        self.drain_notes();
        if self.osc.is_active() {
            // Even a copy that never settled holds only values some bake wrote.
            self.shared.amp_lut.snapshot(&mut self.amp_table);
            self.shared.pitch_lut.snapshot(&mut self.pitch_table);
        }

        let frames = buffer.frames();
        let chunk = self.scratch.len();
        let mut start = 0;
        // Blocks longer than the scratch size are rendered in pieces.
        loop {
            let len = (frames - start).min(chunk);
            self.render_chunk(buffer, start, len);
            start += len;
            if start >= frames {
                break;
            }
        }

        self.shared.osc_active.store(self.osc.is_active());
    }

    fn render_chunk(&mut self, buffer: &mut AudioBuffer, start: usize, len: usize) {
        let end = start + len;
        let shared = &*self.shared;
        let passes = shared.channels.compute_passes();

        let dry = shared.channels.detector(ChannelId::Dry);
        if passes.get(ChannelId::Dry) {
            if buffer.channels() > 0 {
                dry.process(Some(&buffer.channel(0)[start..end]));
            } else {
                dry.process(None);
            }
        } else {
            for ch in 0..buffer.channels() {
                buffer.channel_mut(ch)[start..end].fill(0.0);
            }
            dry.process(None);
        }

        let scratch = &mut self.scratch[..len];
        if self.osc.is_active() {
            let gain = db_to_gain(shared.gain_db.load());
            let amp = &self.amp_table;
            let pitch = &self.pitch_table;
            let duration_ms = shared.amp_lut.duration_ms();
            let pitch_override = shared.pitch_override.load();
            let ms_per_sample = 1000.0 / self.config.sample_rate;

            if !pitch_override {
                // Also picks up a new wave shape once per block.
                self.osc.set_frequency_hz(self.note_hz);
            }

            for out in scratch.iter_mut() {
                let elapsed_ms = self.note_time as f32 * ms_per_sample;
                if pitch_override {
                    self.osc.set_frequency_hz(table_value_at(pitch, elapsed_ms, duration_ms));
                }
                let sounding = self.osc.is_active();
                *out = self.osc.next_sample() * gain * table_value_at(amp, elapsed_ms, duration_ms);
                if sounding {
                    self.note_time += 1;
                }
            }
        } else {
            scratch.fill(0.0);
        }

        let oomph = shared.channels.detector(ChannelId::Oomph);
        if passes.get(ChannelId::Oomph) {
            buffer.add_to_all(start, scratch);
            oomph.process(Some(scratch));
        } else {
            oomph.process(None);
        }

        shared.channels.detector(ChannelId::Click).process(None);

        // A full scope FIFO drops the newest samples.
        self.scope.push_slice(scratch);
    }

    fn drain_notes(&mut self) {
        if self.shared.fixed_mode.load() {
            while self.notes.try_pop().is_some() {}
            if self.osc.is_active() {
                self.stop_note();
            }
            return;
        }

        while let Some(event) = self.notes.try_pop() {
            match event {
                NoteEvent::NoteOn { note, velocity: 0 } => self.note_off(note),
                NoteEvent::NoteOn { note, .. } => self.start_note(note),
                NoteEvent::NoteOff { note } => self.note_off(note),
                NoteEvent::AllNotesOff => self.stop_note(),
            }
        }
    }

    fn start_note(&mut self, note: u8) {
        self.current_note = Some(note);
        self.note_hz = note_to_hz(note);
        self.note_time = 0;
        let hz = if self.shared.pitch_override.load() {
            self.shared.pitch_lut.value_at_ms(0.0)
        } else {
            self.note_hz
        };
        self.osc.set_frequency_hz(hz);
        self.osc.trigger();
    }

    fn note_off(&mut self, note: u8) {
        if self.current_note == Some(note) {
            self.stop_note();
        }
    }

    fn stop_note(&mut self) {
        self.osc.release();
        self.current_note = None;
    }

    /// Silence the voice, rewind the note clock, and zero the meters.
    fn reset_voice(&mut self) {
        self.stop_note();
        self.note_hz = 0.0;
        self.note_time = 0;
        self.shared.channels.reset_detectors();
        self.shared.osc_active.store(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::MIN_DB;

    fn renderer() -> (VoiceRenderer, ControlEndpoints) {
        VoiceRenderer::new(EngineConfig::default().with_max_block_size(256))
    }

    fn block(frames: usize) -> AudioBuffer {
        AudioBuffer::new(2, frames)
    }

    fn peak(buf: &AudioBuffer, ch: u16) -> f32 {
        buf.channel(ch).iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn silent_without_notes() {
        let (mut r, _ctl) = renderer();
        let mut buf = block(256);
        r.render_block(&mut buf);
        assert_eq!(peak(&buf, 0), 0.0);
        assert!(!r.is_active());
    }

    #[test]
    fn note_on_sounds_on_every_channel() {
        let (mut r, mut ctl) = renderer();
        assert!(ctl.notes.try_push(NoteEvent::note_on(69)).is_ok());
        let mut buf = block(256);
        r.render_block(&mut buf);
        assert!(peak(&buf, 0) > 0.5);
        assert_eq!(buf.channel(0), buf.channel(1));
        assert!(ctl.shared.is_oscillator_active());
        assert_eq!(r.current_note(), Some(69));
    }

    #[test]
    fn note_off_must_match_current_note() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(60));
        let _ = ctl.notes.try_push(NoteEvent::note_off(61));
        let mut buf = block(64);
        r.render_block(&mut buf);
        assert!(r.is_active());

        let _ = ctl.notes.try_push(NoteEvent::note_off(60));
        r.render_block(&mut buf);
        assert!(!r.is_active());
        assert!(!ctl.shared.is_oscillator_active());
    }

    #[test]
    fn zero_velocity_note_on_releases() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(60));
        let _ = ctl.notes.try_push(NoteEvent::NoteOn { note: 60, velocity: 0 });
        r.render_block(&mut block(64));
        assert!(!r.is_active());
    }

    #[test]
    fn fixed_mode_discards_notes_and_stops_voice() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(60));
        r.render_block(&mut block(64));
        assert!(r.is_active());

        ctl.shared.set_fixed_mode(true);
        let _ = ctl.notes.try_push(NoteEvent::note_on(62));
        let mut buf = block(64);
        r.render_block(&mut buf);
        assert!(!r.is_active());
        assert_eq!(peak(&buf, 0), 0.0);

        ctl.shared.set_fixed_mode(false);
        r.render_block(&mut buf);
        assert!(!r.is_active(), "notes queued during fixed mode must be dropped");
    }

    #[test]
    fn amplitude_lut_scales_output() {
        let (mut r, mut ctl) = renderer();
        ctl.shared.lut(EnvelopeTarget::Amplitude).bake(&[0.0]);
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        let mut buf = block(256);
        r.render_block(&mut buf);
        assert_eq!(peak(&buf, 0), 0.0);
        assert!(r.is_active());

        ctl.shared.lut(EnvelopeTarget::Amplitude).bake(&[0.5]);
        let mut buf = block(256);
        r.render_block(&mut buf);
        let p = peak(&buf, 0);
        assert!(p > 0.45 && p <= 0.5 + 1e-4, "peak {}", p);
    }

    #[test]
    fn gain_db_applies() {
        let (mut r, mut ctl) = renderer();
        ctl.shared.set_gain_db(-6.0);
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        let mut buf = block(256);
        r.render_block(&mut buf);
        let p = peak(&buf, 0);
        assert!(p > 0.45 && p < 0.51, "peak {}", p);
    }

    #[test]
    fn dry_input_passes_and_is_metered() {
        let (mut r, ctl) = renderer();
        let mut buf = block(64);
        buf.channel_mut(0).fill(0.25);
        r.render_block(&mut buf);
        assert_eq!(buf.channel(0)[10], 0.25);
        let db = ctl.shared.channels().peak_db(ChannelId::Dry);
        assert!((db - -12.04).abs() < 0.1);
    }

    #[test]
    fn muted_dry_is_silenced_and_unmetered() {
        let (mut r, ctl) = renderer();
        ctl.shared.channels().set_mute(ChannelId::Dry, true);
        let mut buf = block(64);
        buf.channel_mut(0).fill(0.25);
        buf.channel_mut(1).fill(0.25);
        r.render_block(&mut buf);
        assert_eq!(peak(&buf, 0), 0.0);
        assert_eq!(peak(&buf, 1), 0.0);
        assert_eq!(ctl.shared.channels().peak_db(ChannelId::Dry), MIN_DB);
    }

    #[test]
    fn soloing_click_silences_voice_and_dry() {
        let (mut r, mut ctl) = renderer();
        ctl.shared.channels().set_solo(ChannelId::Click, true);
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        let mut buf = block(128);
        buf.channel_mut(0).fill(0.5);
        r.render_block(&mut buf);
        assert_eq!(peak(&buf, 0), 0.0);
        assert_eq!(ctl.shared.channels().peak_db(ChannelId::Oomph), MIN_DB);
        // The voice keeps running underneath.
        assert!(r.is_active());
    }

    #[test]
    fn scope_receives_voice_signal() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        let mut buf = block(128);
        r.render_block(&mut buf);
        let mut scope = [0.0f32; 256];
        let n = ctl.scope.pop_slice(&mut scope);
        assert_eq!(n, 128);
        assert_eq!(&scope[..128], buf.channel(0));
    }

    #[test]
    fn oversized_block_is_rendered_in_pieces() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        let mut buf = block(1000);
        r.render_block(&mut buf);
        assert!(buf.channel(0)[900..].iter().any(|s| s.abs() > 0.5));
    }

    #[test]
    fn pitch_override_changes_frequency() {
        let count_crossings = |override_hz: Option<f32>| {
            let (mut r, mut ctl) = renderer();
            if let Some(hz) = override_hz {
                ctl.shared.lut(EnvelopeTarget::Pitch).bake(&[hz]);
                ctl.shared.set_pitch_override(true);
            }
            let _ = ctl.notes.try_push(NoteEvent::note_on(69));
            let mut buf = AudioBuffer::new(1, 2048);
            r.render_block(&mut buf);
            buf.channel(0)
                .windows(2)
                .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
                .count()
        };
        let at_note = count_crossings(None);
        let at_override = count_crossings(Some(110.0));
        assert!(at_note > 3 * at_override, "{} vs {}", at_note, at_override);
    }

    #[test]
    fn prepare_resets_voice_and_meters() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        r.render_block(&mut block(128));
        r.prepare(48_000.0, 512);
        assert!(!r.is_active());
        assert_eq!(r.config().sample_rate, 48_000.0);
        assert_eq!(ctl.shared.channels().peak_db(ChannelId::Oomph), MIN_DB);
    }

    #[test]
    fn restart_drops_voice_and_zeroes_meters() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        r.render_block(&mut block(128));
        assert!(ctl.shared.channels().peak_db(ChannelId::Oomph) > -1.0);

        ctl.shared.request_restart();
        assert_eq!(ctl.shared.channels().peak_db(ChannelId::Oomph), MIN_DB);
        assert!(!ctl.shared.is_oscillator_active());

        let mut buf = block(128);
        r.render_block(&mut buf);
        assert_eq!(peak(&buf, 0), 0.0);
        assert!(!r.is_active());
        assert_eq!(r.current_note(), None);
        assert_eq!(ctl.shared.channels().peak_db(ChannelId::Oomph), MIN_DB);
    }

    #[test]
    fn notes_sent_after_restart_still_play() {
        let (mut r, mut ctl) = renderer();
        let _ = ctl.notes.try_push(NoteEvent::note_on(60));
        r.render_block(&mut block(64));

        ctl.shared.request_restart();
        let _ = ctl.notes.try_push(NoteEvent::note_on(72));
        let mut buf = block(256);
        r.render_block(&mut buf);
        assert_eq!(r.current_note(), Some(72));
        assert!(peak(&buf, 0) > 0.5);
    }

    #[test]
    fn prepare_clears_pending_restart() {
        let (mut r, mut ctl) = renderer();
        ctl.shared.request_restart();
        r.prepare(44_100.0, 256);
        let _ = ctl.notes.try_push(NoteEvent::note_on(69));
        r.render_block(&mut block(64));
        assert!(r.is_active());
    }
}
