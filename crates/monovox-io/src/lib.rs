//! Real-time audio output for monovox.
//!
//! This crate provides:
//!
//! - **Command hand-off**: [`RealtimeGraph`] implements the engine's
//!   `AudioGraphBackend` on the control thread and forwards every accepted
//!   command to a [`GraphRenderer`] on the audio thread
//! - **Streaming**: [`start_output`] drives a renderer from a cpal output stream
//! - **Devices**: [`list_devices`] and [`default_output_device`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use monovox_engine::SynthEngine;
//! use monovox_io::{OutputConfig, RealtimeGraph, start_output};
//!
//! let config = OutputConfig::default();
//! let (graph, renderer) = RealtimeGraph::new(config.sample_rate as f32);
//! let _stream = start_output(&config, renderer)?;
//!
//! let mut engine = SynthEngine::new(graph)?;
//! engine.note_on(24);
//! ```

mod realtime;
mod stream;

pub use realtime::{DEFAULT_QUEUE_CAPACITY, GraphRenderer, RealtimeGraph};
pub use stream::{AudioDevice, OutputConfig, OutputStream, default_output_device, list_devices, start_output};

/// Error types for audio output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
}

/// Convenience result type for audio output operations.
pub type Result<T> = std::result::Result<T, Error>;
