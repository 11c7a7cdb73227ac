//! Monovox Core - parameter timelines and the audio graph they drive
//!
//! The building blocks underneath the monovox synth engine. Nothing in this
//! crate knows about notes; it provides the scheduled-automation model and a
//! renderer that turns scheduled graphs into samples.
//!
//! # Core Abstractions
//!
//! ## Automation
//!
//! - [`ParamTimeline`] - Ordered set-value / ramp / set-target events per parameter
//! - [`AutomationEvent`] - One scheduled change
//!
//! ## Graph
//!
//! - [`graph::GraphCommand`] - Every graph mutation as a plain `Copy` value
//! - [`graph::GraphState`] - Applies commands and renders blocks
//!
//! ## DSP
//!
//! - [`Oscillator`] - PolyBLEP oscillator over the [`Waveform`] set
//! - [`Biquad`] - RBJ lowpass section, resonance given in dB
//!
//! ## Pitch
//!
//! - [`pitch::key_to_freq`] - Keyboard index to Hz (key 0 = MIDI 36)
//!
//! # Features
//!
//! - `tracing`: emit `tracing` events for graph mutations.
//!
//! # Example
//!
//! ```rust
//! use monovox_core::ParamTimeline;
//!
//! let mut cutoff = ParamTimeline::new(2400.0);
//! cutoff.set_value_at_time(2400.0, 0.0).unwrap();
//! cutoff.exponential_ramp_to_value_at_time(4400.0, 0.2).unwrap();
//! assert!(cutoff.value_at(0.1) > 2400.0);
//! ```

pub mod automation;
pub mod biquad;
pub mod graph;
pub mod oscillator;
pub mod pitch;

pub use automation::{AutomationEvent, ParamTimeline, TimelineError};
pub use biquad::{Biquad, lowpass_coefficients, q_from_db};
pub use graph::{Destination, GraphCommand, GraphError, GraphState, NodeId, NodeKind, ParamKind};
pub use oscillator::{Oscillator, ParseWaveformError, Waveform};
pub use pitch::{cents_to_ratio, key_to_freq, midi_to_freq, octave_ratio};
