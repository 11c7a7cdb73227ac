//! Shared output and config arguments.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use monovox_engine::{EngineConfig, SynthEngine};
use monovox_io::{OutputConfig, OutputStream, RealtimeGraph, start_output};

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output device (substring of the name; default device if omitted)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Sample rate in Hz
    #[arg(long, default_value = "48000")]
    pub sample_rate: u32,

    /// Buffer size in frames
    #[arg(long, default_value = "256")]
    pub buffer_size: u32,

    /// Engine tuning constants (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Load an engine config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Open the output stream and build an engine on top of it.
///
/// The stream must be kept alive for as long as the engine plays.
pub fn open_engine(args: &OutputArgs) -> anyhow::Result<(SynthEngine<RealtimeGraph>, OutputStream)> {
    let config = load_config(args.config.as_deref())?;
    let output = OutputConfig {
        sample_rate: args.sample_rate,
        buffer_size: args.buffer_size,
        device: args.device.clone(),
    };

    let (graph, renderer) = RealtimeGraph::new(output.sample_rate as f32);
    let stream = start_output(&output, renderer).context("opening audio output")?;
    let engine = SynthEngine::with_config(graph, config)?;
    Ok((engine, stream))
}
