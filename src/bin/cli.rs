//! squatch CLI: offline WAV render and live playback of the voice.
//!
//! Usage:
//!   sq-cli render --note 36 --hold-ms 400 --shape saw --gain-db -6 \
//!       --point 0:1.0 --point 150:0.2 --out out.wav
//!   sq-cli play --note 36

use clap::{Args, Parser, Subcommand, ValueEnum};
use sq_master::{
    held_note, ChannelId, ControlError, Controller, EngineConfig, EnvelopeTarget, WaveShape,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sq-cli")]
#[command(about = "Band-limited oscillator voice with editable envelopes", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one held note to a WAV file
    Render {
        #[command(flatten)]
        voice: VoiceArgs,

        /// Output WAV file path
        #[arg(short, long)]
        out: PathBuf,

        /// Total length in seconds (default: hold time plus envelope plus 200 ms)
        #[arg(long)]
        seconds: Option<f32>,

        /// Sample rate in Hz
        #[arg(short, long, default_value = "44100")]
        sample_rate: u32,
    },

    /// Play one held note on the default audio device
    Play {
        #[command(flatten)]
        voice: VoiceArgs,

        /// How many times to play the note
        #[arg(long, default_value = "1")]
        repeat: u32,
    },
}

#[derive(Args)]
struct VoiceArgs {
    /// MIDI note number
    #[arg(short, long, default_value = "36")]
    note: u8,

    /// How long the note is held, in milliseconds
    #[arg(long, default_value = "400")]
    hold_ms: f32,

    /// Oscillator wave shape
    #[arg(long, value_enum, default_value = "sine")]
    shape: ShapeArg,

    /// Output gain in dB
    #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
    gain_db: f32,

    /// Amplitude envelope point as TIME_MS:VALUE (repeatable)
    #[arg(long = "point", value_parser = parse_point)]
    points: Vec<(f32, f32)>,

    /// Pitch envelope point as TIME_MS:HZ (repeatable)
    #[arg(long = "pitch-point", value_parser = parse_point)]
    pitch_points: Vec<(f32, f32)>,

    /// Time span the envelopes cover, in milliseconds
    #[arg(long, default_value = "300")]
    envelope_ms: f32,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    Sine,
    Triangle,
    Square,
    Saw,
}

impl From<ShapeArg> for WaveShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Sine => WaveShape::Sine,
            ShapeArg::Triangle => WaveShape::Triangle,
            ShapeArg::Square => WaveShape::Square,
            ShapeArg::Saw => WaveShape::Saw,
        }
    }
}

fn parse_point(s: &str) -> Result<(f32, f32), String> {
    let (time, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected TIME_MS:VALUE, got '{}'", s))?;
    let time = time
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("bad time '{}': {}", time, e))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("bad value '{}': {}", value, e))?;
    Ok((time, value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            voice,
            out,
            seconds,
            sample_rate,
        } => render(&voice, out, seconds, sample_rate),
        Commands::Play { voice, repeat } => play(&voice, repeat),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_controller(voice: &VoiceArgs, config: EngineConfig) -> Controller {
    let mut ctrl = Controller::with_config(config);
    ctrl.set_envelope_duration_ms(voice.envelope_ms);
    ctrl.set_waveshape(voice.shape.into());
    ctrl.set_gain_db(voice.gain_db);
    for &(time, value) in &voice.points {
        if ctrl.add_point(EnvelopeTarget::Amplitude, time, value).is_none() {
            tracing::warn!(time, value, "amplitude curve full, point ignored");
        }
    }
    for &(time, hz) in &voice.pitch_points {
        if ctrl.add_point(EnvelopeTarget::Pitch, time, hz).is_none() {
            tracing::warn!(time, hz, "pitch curve full, point ignored");
        }
    }
    ctrl
}

fn render(
    voice: &VoiceArgs,
    out: PathBuf,
    seconds: Option<f32>,
    sample_rate: u32,
) -> Result<(), ControlError> {
    let config = EngineConfig::default().with_sample_rate(sample_rate as f32);
    let ctrl = build_controller(voice, config);
    let seconds =
        seconds.unwrap_or((voice.hold_ms + voice.envelope_ms) / 1000.0 + 0.2);

    tracing::info!(
        note = voice.note,
        seconds,
        sample_rate,
        out = %out.display(),
        "rendering"
    );
    let script = held_note(voice.note, 0.0, voice.hold_ms);
    ctrl.render_to_file(&script, seconds, &out)?;
    println!("Done.");
    Ok(())
}

fn play(voice: &VoiceArgs, repeat: u32) -> Result<(), ControlError> {
    let mut ctrl = build_controller(voice, EngineConfig::default());
    ctrl.play()?;
    println!("Playing...");

    let hold = Duration::from_secs_f32(voice.hold_ms.max(0.0) / 1000.0);
    let tail = Duration::from_millis(300);
    let mut scope = vec![0.0f32; 4096];

    for _ in 0..repeat.max(1) {
        ctrl.note_on(voice.note)?;
        meter_for(&mut ctrl, hold, &mut scope);
        ctrl.note_off(voice.note)?;
        meter_for(&mut ctrl, tail, &mut scope);
    }

    ctrl.stop()?;
    println!("\rDone.                                        ");
    Ok(())
}

/// Print meters at roughly 30 Hz for `duration`.
fn meter_for(ctrl: &mut Controller, duration: Duration, scope: &mut [f32]) {
    let start = Instant::now();
    while start.elapsed() < duration {
        // Keep the scope FIFO drained so it never fills.
        ctrl.pop_waveform(scope);
        print!(
            "\rosc: {:<3} | oomph: {:>7.1} dB | dry: {:>7.1} dB",
            if ctrl.is_oscillator_active() { "on" } else { "off" },
            ctrl.peak_db(ChannelId::Oomph),
            ctrl.peak_db(ChannelId::Dry),
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(33));
    }
}
