//! Graph mutations as plain values.
//!
//! Every change to the audio graph is expressed as a [`GraphCommand`]. Commands
//! are `Copy` and carry no heap data, so they can cross a bounded channel to
//! the render thread whole: the renderer either sees a command completely or
//! not at all.

use crate::automation::AutomationEvent;
use crate::oscillator::Waveform;

use super::node::{Destination, NodeId, ParamKind};

/// One mutation of the audio graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GraphCommand {
    /// Create a stopped oscillator.
    CreateOscillator {
        /// Handle for the new node.
        id: NodeId,
        /// Initial waveform.
        waveform: Waveform,
        /// Initial frequency in Hz.
        frequency: f32,
        /// Initial detune in cents.
        detune: f32,
    },
    /// Create a gain node.
    CreateGain {
        /// Handle for the new node.
        id: NodeId,
        /// Initial linear gain.
        gain: f32,
    },
    /// Create a lowpass filter.
    CreateLowpass {
        /// Handle for the new node.
        id: NodeId,
        /// Initial cutoff in Hz.
        frequency: f32,
        /// Initial resonance in dB.
        q: f32,
    },
    /// Route `from` into `to`.
    Connect {
        /// Source node.
        from: NodeId,
        /// Node input or device output.
        to: Destination,
    },
    /// Remove every outgoing connection of `node`.
    Disconnect {
        /// Node to detach.
        node: NodeId,
    },
    /// Start an oscillator at an absolute time.
    Start {
        /// Oscillator to start.
        node: NodeId,
        /// Start time in seconds.
        at: f64,
    },
    /// Stop an oscillator at an absolute time.
    Stop {
        /// Oscillator to stop.
        node: NodeId,
        /// Stop time in seconds.
        at: f64,
    },
    /// Remove a node and every connection into it.
    Destroy {
        /// Node to remove.
        node: NodeId,
    },
    /// Switch an oscillator's waveform immediately.
    SetWaveform {
        /// Oscillator to change.
        node: NodeId,
        /// New waveform.
        waveform: Waveform,
    },
    /// Add an event to a parameter timeline.
    Automate {
        /// Owning node.
        node: NodeId,
        /// Target parameter.
        param: ParamKind,
        /// Event to insert.
        event: AutomationEvent,
    },
    /// Drop scheduled events at or after `from`.
    CancelScheduled {
        /// Owning node.
        node: NodeId,
        /// Target parameter.
        param: ParamKind,
        /// Cancellation time in seconds.
        from: f64,
    },
}

impl GraphCommand {
    /// The node this command creates or acts on.
    pub fn node(&self) -> NodeId {
        match *self {
            Self::CreateOscillator { id, .. }
            | Self::CreateGain { id, .. }
            | Self::CreateLowpass { id, .. } => id,
            Self::Connect { from, .. } => from,
            Self::Disconnect { node }
            | Self::Start { node, .. }
            | Self::Stop { node, .. }
            | Self::Destroy { node }
            | Self::SetWaveform { node, .. }
            | Self::Automate { node, .. }
            | Self::CancelScheduled { node, .. } => node,
        }
    }

    /// Whether this command changes the routing topology.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CreateOscillator { .. }
                | Self::CreateGain { .. }
                | Self::CreateLowpass { .. }
                | Self::Connect { .. }
                | Self::Disconnect { .. }
                | Self::Destroy { .. }
        )
    }
}
