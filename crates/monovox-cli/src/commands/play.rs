//! Play a fixed phrase through the default patch.

use std::thread;
use std::time::Duration;

use clap::Args;

use super::common::{OutputArgs, open_engine};

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Key indices to play in order (key 0 = MIDI 36)
    #[arg(short, long, value_delimiter = ',', default_value = "24,28,31,36")]
    pub notes: Vec<i32>,

    /// How long each note is held, in seconds
    #[arg(long, default_value = "0.4")]
    pub note_length: f64,

    /// Silence between notes, in seconds
    #[arg(long, default_value = "0.1")]
    pub gap: f64,

    /// Master volume 0-100
    #[arg(long)]
    pub volume: Option<f32>,

    #[command(flatten)]
    pub output: OutputArgs,
}

fn sleep(seconds: f64) {
    thread::sleep(Duration::from_secs_f64(seconds.max(0.0)));
}

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let (mut engine, stream) = open_engine(&args.output)?;
    if let Some(volume) = args.volume {
        engine.set_master_volume(volume);
    }

    println!(
        "Playing {} notes on {} ({} Hz)",
        args.notes.len(),
        stream.device(),
        stream.sample_rate()
    );

    for &key in &args.notes {
        tracing::debug!(key, "play");
        engine.note_on(key);
        sleep(args.note_length);
        engine.note_off(key);
        sleep(args.gap);
    }

    let amp = engine.amp_envelope();
    let tail = f64::from(amp.release).max(engine.config().release_floor) + engine.config().stop_margin;
    sleep(tail + 0.05);
    engine.collect_finished();
    drop(engine.dispose());
    drop(stream);
    Ok(())
}
