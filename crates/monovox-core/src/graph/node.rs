//! Node handles, node kinds, and automatable parameter names.

use core::fmt;

use crate::oscillator::Waveform;

/// Opaque handle for a node in the audio graph.
///
/// IDs are allocated by the backend that owns the graph and are never reused
/// within one graph instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Wrap a raw identifier.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// What a node does to the signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Signal source with `Frequency` (Hz) and `Detune` (cents) params.
    Oscillator(Waveform),
    /// Multiplies its summed input by the `Gain` param.
    Gain,
    /// Resonant lowpass with `Frequency` (Hz) and `Q` (dB) params.
    Lowpass,
}

impl NodeKind {
    /// Whether this kind exposes `param`.
    pub fn has_param(self, param: ParamKind) -> bool {
        matches!(
            (self, param),
            (Self::Oscillator(_), ParamKind::Frequency | ParamKind::Detune)
                | (Self::Gain, ParamKind::Gain)
                | (Self::Lowpass, ParamKind::Frequency | ParamKind::Q)
        )
    }
}

/// Automatable parameter on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Oscillator pitch or filter cutoff, in Hz.
    Frequency,
    /// Oscillator detune in cents.
    Detune,
    /// Linear gain.
    Gain,
    /// Filter resonance in dB.
    Q,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Frequency => "frequency",
            Self::Detune => "detune",
            Self::Gain => "gain",
            Self::Q => "q",
        })
    }
}

/// Where a node's output goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Input of another node.
    Node(NodeId),
    /// The device output.
    Output,
}

impl From<NodeId> for Destination {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => id.fmt(f),
            Self::Output => f.write_str("Output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_per_kind() {
        let osc = NodeKind::Oscillator(Waveform::Sine);
        assert!(osc.has_param(ParamKind::Frequency));
        assert!(osc.has_param(ParamKind::Detune));
        assert!(!osc.has_param(ParamKind::Gain));
        assert!(NodeKind::Gain.has_param(ParamKind::Gain));
        assert!(!NodeKind::Gain.has_param(ParamKind::Q));
        assert!(NodeKind::Lowpass.has_param(ParamKind::Q));
        assert!(!NodeKind::Lowpass.has_param(ParamKind::Detune));
    }

    #[test]
    fn display() {
        assert_eq!(NodeId::new(7).to_string(), "NodeId(7)");
        assert_eq!(Destination::Output.to_string(), "Output");
        assert_eq!(Destination::from(NodeId::new(2)).to_string(), "NodeId(2)");
    }
}
