//! Monovox Engine - a monophonic subtractive voice
//!
//! Turns note events and panel parameter changes into scheduled automation
//! on an audio graph. The engine never renders samples itself; it drives an
//! [`AudioGraphBackend`].
//!
//! # Components
//!
//! - [`ParameterStore`] - The patch. Setters clamp and report a [`ParamChange`]
//! - [`EnvelopeScheduler`] - ADSR attack/decay and release as ramp segments
//! - [`VoiceController`] - The single voice: note on, note off, retune, reap
//! - [`MixerFilterRouter`] - Channel gains, lowpass, and VCA
//! - [`SynthEngine`] - Owns the backend and routes changes to the parts above
//!
//! # Backends
//!
//! - [`RecordingBackend`] - Manual clock, command log; for tests
//! - `monovox_io::RealtimeGraph` - Hands commands to a render thread
//!
//! # Example
//!
//! ```rust
//! use monovox_engine::{RecordingBackend, SynthEngine};
//!
//! let mut engine = SynthEngine::new(RecordingBackend::new()).unwrap();
//! engine.set_filter_cutoff(800.0);
//! engine.note_on(24);
//!
//! engine.backend_mut().set_time(0.41);
//! let amp = engine.live_amplitude().unwrap();
//! assert!((amp - 0.6).abs() < 1e-3);
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod params;
pub mod recording;
pub mod router;
pub mod voice;

pub use backend::{AudioGraphBackend, BackendError};
pub use config::{ConfigError, EngineConfig};
pub use engine::SynthEngine;
pub use envelope::{EnvelopePlan, EnvelopeScheduler, EnvelopeSpec, RampShape, Segment};
pub use error::{EngineError, Result};
pub use params::{
    ChannelLevel, FilterSettings, MixerChannel, MixerState, OscSlot, OscillatorSettings,
    ParamChange, ParameterStore, ParseNameError,
};
pub use recording::RecordingBackend;
pub use router::{MixerFilterRouter, Smoothing};
pub use voice::{VoiceController, VoiceOscillator, VoicePhase, VoiceState};

pub use monovox_core::Waveform;
pub use monovox_core::graph::{Destination, NodeId, ParamKind};
