//! Line-oriented control surface.
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! on 24            off 24           cutoff 800       res 4
//! contour 60       keytrack off     wave osc1 saw    octave sub -2
//! detune osc2 12   level osc3 0.5   mute osc2        vol 60
//! amp 0.01 0.4 0.8 0.3              fenv 0.2 0.6 0.2 0.5
//! status           quit
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::str::FromStr;

use monovox_engine::{AudioGraphBackend, MixerChannel, OscSlot, SynthEngine, Waveform};
use thiserror::Error;

/// One parsed control line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    NoteOn(i32),
    NoteOff(i32),
    Cutoff(f32),
    Resonance(f32),
    Contour(f32),
    KeyTrack(bool),
    Waveform(OscSlot, Waveform),
    Octave(OscSlot, i32),
    Detune(OscSlot, i32),
    Level(MixerChannel, f32),
    ToggleMute(MixerChannel),
    Volume(f32),
    AmpEnvelope([f32; 4]),
    FilterEnvelope([f32; 4]),
    Status,
    Quit,
}

/// Why a control line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{command}' expects {expected}")]
    Arguments {
        command: String,
        expected: &'static str,
    },
    #[error("invalid value '{value}': {reason}")]
    Value { value: String, reason: String },
}

fn value<T: FromStr>(token: &str) -> Result<T, ControlError>
where
    T::Err: std::fmt::Display,
{
    token.parse().map_err(|e: T::Err| ControlError::Value {
        value: token.to_string(),
        reason: e.to_string(),
    })
}

fn switch(token: &str) -> Result<bool, ControlError> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ControlError::Value {
            value: token.to_string(),
            reason: "expected on or off".into(),
        }),
    }
}

fn adsr(args: &[&str]) -> Result<[f32; 4], ControlError> {
    Ok([value(args[0])?, value(args[1])?, value(args[2])?, value(args[3])?])
}

/// Parse one line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<ControlCommand>, ControlError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(None);
    };
    let head = head.to_ascii_lowercase();
    let args: Vec<&str> = tokens.collect();

    let arity = |n: usize, expected: &'static str| {
        if args.len() == n {
            Ok(())
        } else {
            Err(ControlError::Arguments {
                command: head.clone(),
                expected,
            })
        }
    };

    let command = match head.as_str() {
        "on" => {
            arity(1, "a key index")?;
            ControlCommand::NoteOn(value(args[0])?)
        }
        "off" => {
            arity(1, "a key index")?;
            ControlCommand::NoteOff(value(args[0])?)
        }
        "cutoff" => {
            arity(1, "a frequency in Hz")?;
            ControlCommand::Cutoff(value(args[0])?)
        }
        "res" | "resonance" => {
            arity(1, "a resonance amount")?;
            ControlCommand::Resonance(value(args[0])?)
        }
        "contour" => {
            arity(1, "an envelope amount")?;
            ControlCommand::Contour(value(args[0])?)
        }
        "keytrack" => {
            arity(1, "on or off")?;
            ControlCommand::KeyTrack(switch(args[0])?)
        }
        "wave" => {
            arity(2, "an oscillator and a waveform")?;
            ControlCommand::Waveform(value(args[0])?, value(args[1])?)
        }
        "octave" => {
            arity(2, "an oscillator and an octave")?;
            ControlCommand::Octave(value(args[0])?, value(args[1])?)
        }
        "detune" => {
            arity(2, "an oscillator and cents")?;
            ControlCommand::Detune(value(args[0])?, value(args[1])?)
        }
        "level" => {
            arity(2, "a channel and a level 0-1")?;
            ControlCommand::Level(value(args[0])?, value(args[1])?)
        }
        "mute" => {
            arity(1, "a channel")?;
            ControlCommand::ToggleMute(value(args[0])?)
        }
        "vol" | "volume" => {
            arity(1, "a volume 0-100")?;
            ControlCommand::Volume(value(args[0])?)
        }
        "amp" => {
            arity(4, "attack decay sustain release")?;
            ControlCommand::AmpEnvelope(adsr(&args)?)
        }
        "fenv" => {
            arity(4, "attack decay sustain release")?;
            ControlCommand::FilterEnvelope(adsr(&args)?)
        }
        "status" => ControlCommand::Status,
        "quit" | "exit" => ControlCommand::Quit,
        _ => return Err(ControlError::UnknownCommand(head.clone())),
    };
    Ok(Some(command))
}

/// Apply a parsed command. `Status` and `Quit` are left to the caller.
pub fn apply<B: AudioGraphBackend>(engine: &mut SynthEngine<B>, command: ControlCommand) {
    match command {
        ControlCommand::NoteOn(key) => engine.note_on(key),
        ControlCommand::NoteOff(key) => engine.note_off(key),
        ControlCommand::Cutoff(hz) => engine.set_filter_cutoff(hz),
        ControlCommand::Resonance(q) => engine.set_filter_resonance(q),
        ControlCommand::Contour(amount) => engine.set_filter_contour(amount),
        ControlCommand::KeyTrack(on) => engine.set_filter_key_track(on),
        ControlCommand::Waveform(slot, waveform) => engine.set_osc_waveform(slot, waveform),
        ControlCommand::Octave(slot, octave) => engine.set_osc_octave(slot, octave),
        ControlCommand::Detune(slot, cents) => engine.set_osc_detune(slot, cents),
        ControlCommand::Level(channel, level) => engine.set_mixer_level(channel, level),
        ControlCommand::ToggleMute(channel) => engine.toggle_mute(channel),
        ControlCommand::Volume(volume) => engine.set_master_volume(volume),
        ControlCommand::AmpEnvelope([a, d, s, r]) => engine.set_amp_envelope(a, d, s, r),
        ControlCommand::FilterEnvelope([a, d, s, r]) => engine.set_filter_envelope(a, d, s, r),
        ControlCommand::Status | ControlCommand::Quit => {}
    }
}

/// One-line summary of the voice and the main panel values.
pub fn status<B: AudioGraphBackend>(engine: &SynthEngine<B>) -> String {
    let voice = engine.voice();
    let filter = engine.filter();
    let note = voice
        .current_note()
        .map_or_else(|| "-".to_string(), |k| k.to_string());
    format!(
        "t={:.3}s note={} phase={:?} cutoff={:.0}Hz res={:.1} vol={:.0} amp={:.4}",
        engine.backend().current_time(),
        note,
        voice.phase(),
        filter.cutoff_hz,
        filter.resonance,
        engine.params().master_volume(),
        engine.live_amplitude().unwrap_or(0.0),
    )
}
