//! The audio graph the engine drives.
//!
//! The engine never renders samples. It schedules parameter trajectories and
//! graph mutations through [`AudioGraphBackend`], which is implemented by
//! [`RecordingBackend`](crate::RecordingBackend) for deterministic tests and by
//! the realtime graph in `monovox-io` for live output.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         SynthEngine          │
//! │ params / voice / router      │
//! └──────────────┬───────────────┘
//!                │ GraphCommand values
//!                ▼
//! ┌──────────────────────────────┐
//! │    AudioGraphBackend trait   │
//! │ clock, resume, submit, query │
//! └──────────────┬───────────────┘
//!        ┌───────┴─────────┐
//!        ▼                 ▼
//! ┌──────────────┐  ┌──────────────┐
//! │ Recording    │  │ Realtime     │
//! │ (manual      │  │ (render      │
//! │  clock)      │  │  thread)     │
//! └──────────────┘  └──────────────┘
//! ```
//!
//! Implementors provide six primitives; every convenience method is expressed
//! as a single [`GraphCommand`] passed to [`submit`](AudioGraphBackend::submit).

use monovox_core::graph::{Destination, GraphCommand, GraphError, NodeId, ParamKind};
use monovox_core::{AutomationEvent, Waveform};
use thiserror::Error;

/// Failures reported by an audio graph backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The output device could not be resumed or has gone away.
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    /// The oscillator's stop time has already passed.
    #[error("{0} has already stopped")]
    AlreadyStopped(NodeId),

    /// The command queue to the render thread is full.
    #[error("command queue is full")]
    QueueFull,

    /// The graph rejected the command.
    #[error(transparent)]
    Graph(GraphError),
}

impl From<GraphError> for BackendError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::AlreadyStopped(node) => Self::AlreadyStopped(node),
            other => Self::Graph(other),
        }
    }
}

/// An audio graph with its own clock that accepts scheduled commands.
///
/// Times are absolute seconds on the backend clock. Commands are applied in
/// submission order; a rejected command has no effect.
pub trait AudioGraphBackend {
    /// Current clock time in seconds. Does not advance while suspended.
    fn current_time(&self) -> f64;

    /// Whether the output device is suspended.
    fn is_suspended(&self) -> bool;

    /// Resume a suspended output device.
    fn resume(&mut self) -> Result<(), BackendError>;

    /// Reserve a fresh node handle.
    fn allocate_node_id(&mut self) -> NodeId;

    /// Apply one graph command.
    fn submit(&mut self, command: GraphCommand) -> Result<(), BackendError>;

    /// Scheduled value of `param` on `node` at time `at`.
    fn param_value(&self, node: NodeId, param: ParamKind, at: f64) -> Result<f32, BackendError>;

    /// Value of `param` on `node` right now.
    fn live_value(&self, node: NodeId, param: ParamKind) -> Result<f32, BackendError> {
        self.param_value(node, param, self.current_time())
    }

    /// Create a stopped oscillator.
    fn create_oscillator(
        &mut self,
        waveform: Waveform,
        frequency: f32,
        detune: f32,
    ) -> Result<NodeId, BackendError> {
        let id = self.allocate_node_id();
        self.submit(GraphCommand::CreateOscillator {
            id,
            waveform,
            frequency,
            detune,
        })?;
        Ok(id)
    }

    /// Create a gain node.
    fn create_gain(&mut self, gain: f32) -> Result<NodeId, BackendError> {
        let id = self.allocate_node_id();
        self.submit(GraphCommand::CreateGain { id, gain })?;
        Ok(id)
    }

    /// Create a lowpass filter (`q` in dB).
    fn create_lowpass(&mut self, frequency: f32, q: f32) -> Result<NodeId, BackendError> {
        let id = self.allocate_node_id();
        self.submit(GraphCommand::CreateLowpass { id, frequency, q })?;
        Ok(id)
    }

    /// Route `from` into `to`.
    fn connect(&mut self, from: NodeId, to: Destination) -> Result<(), BackendError> {
        self.submit(GraphCommand::Connect { from, to })
    }

    /// Remove every outgoing connection of `node`.
    fn disconnect(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.submit(GraphCommand::Disconnect { node })
    }

    /// Start an oscillator at `at`.
    fn start(&mut self, node: NodeId, at: f64) -> Result<(), BackendError> {
        self.submit(GraphCommand::Start { node, at })
    }

    /// Stop an oscillator at `at`.
    fn stop(&mut self, node: NodeId, at: f64) -> Result<(), BackendError> {
        self.submit(GraphCommand::Stop { node, at })
    }

    /// Remove a node.
    fn destroy(&mut self, node: NodeId) -> Result<(), BackendError> {
        self.submit(GraphCommand::Destroy { node })
    }

    /// Switch an oscillator's waveform now.
    fn set_waveform(&mut self, node: NodeId, waveform: Waveform) -> Result<(), BackendError> {
        self.submit(GraphCommand::SetWaveform { node, waveform })
    }

    /// Jump `param` to `value` at `time`.
    fn set_value_at_time(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        time: f64,
    ) -> Result<(), BackendError> {
        self.submit(GraphCommand::Automate {
            node,
            param,
            event: AutomationEvent::SetValue { time, value },
        })
    }

    /// Ramp `param` linearly to `value`, arriving at `end_time`.
    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError> {
        self.submit(GraphCommand::Automate {
            node,
            param,
            event: AutomationEvent::LinearRamp { end_time, value },
        })
    }

    /// Ramp `param` exponentially to `value` (> 0), arriving at `end_time`.
    fn exponential_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: ParamKind,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError> {
        self.submit(GraphCommand::Automate {
            node,
            param,
            event: AutomationEvent::ExponentialRamp { end_time, value },
        })
    }

    /// Approach `target` from `start_time` with time constant `time_constant`.
    fn set_target_at_time(
        &mut self,
        node: NodeId,
        param: ParamKind,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<(), BackendError> {
        self.submit(GraphCommand::Automate {
            node,
            param,
            event: AutomationEvent::SetTarget {
                start_time,
                target,
                time_constant,
            },
        })
    }

    /// Drop every event on `param` at or after `from`.
    fn cancel_scheduled_values(
        &mut self,
        node: NodeId,
        param: ParamKind,
        from: f64,
    ) -> Result<(), BackendError> {
        self.submit(GraphCommand::CancelScheduled { node, param, from })
    }
}
