//! Interactive control from stdin.

use std::io::{self, BufRead, Write};

use clap::Args;
use monovox_engine::{AudioGraphBackend, RecordingBackend, SynthEngine};

use super::common::{OutputArgs, load_config, open_engine};
use crate::control::{ControlCommand, apply, parse_line, status};

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Drive an offline engine instead of opening an audio device
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: KeysArgs) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    if args.dry_run {
        let config = load_config(args.output.config.as_deref())?;
        let mut engine = SynthEngine::with_config(RecordingBackend::new(), config)?;
        return session(&mut engine, stdin.lock(), stdout.lock());
    }

    let (mut engine, _stream) = open_engine(&args.output)?;
    eprintln!("monovox: type 'on 24', 'off 24', 'cutoff 800', ... or 'quit'");
    let result = session(&mut engine, stdin.lock(), stdout.lock());
    drop(engine.dispose());
    result
}

/// Read control lines until `quit` or end of input.
///
/// Bad lines are reported on `output` and skipped.
pub fn session<B, R, W>(engine: &mut SynthEngine<B>, input: R, mut output: W) -> anyhow::Result<()>
where
    B: AudioGraphBackend,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ControlCommand::Quit)) => break,
            Ok(Some(ControlCommand::Status)) => writeln!(output, "{}", status(engine))?,
            Ok(Some(command)) => {
                tracing::trace!(?command, "control");
                apply(engine, command);
            }
            Err(err) => writeln!(output, "error: {err}")?,
        }
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(script: &str) -> (SynthEngine<RecordingBackend>, String) {
        let mut engine = SynthEngine::new(RecordingBackend::new()).unwrap();
        let mut out = Vec::new();
        session(&mut engine, script.as_bytes(), &mut out).unwrap();
        (engine, String::from_utf8(out).unwrap())
    }

    #[test]
    fn script_drives_engine() {
        let (engine, out) = run_script("cutoff 1200\non 24\nstatus\n");
        assert_eq!(engine.voice().current_note(), Some(24));
        assert!(out.contains("note=24"), "got: {out}");
        assert!(out.contains("cutoff=1200Hz"), "got: {out}");
    }

    #[test]
    fn quit_stops_reading() {
        let (engine, _) = run_script("quit\non 24\n");
        assert_eq!(engine.voice().current_note(), None);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let (engine, out) = run_script("bogus\non 5\n");
        assert!(out.contains("error: unknown command 'bogus'"));
        assert_eq!(engine.voice().current_note(), Some(5));
    }
}
