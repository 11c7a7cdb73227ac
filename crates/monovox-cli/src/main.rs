//! Monovox CLI - play the monovox synth engine from the command line.

mod commands;
mod control;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "monovox")]
#[command(author, version, about = "Monophonic subtractive synth", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Play a phrase of notes
    Play(commands::play::PlayArgs),

    /// Read note and parameter commands from stdin
    Keys(commands::keys::KeysArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Keys(args) => commands::keys::run(args),
    }
}
