//! Mixer/Filter Router: the persistent part of the signal path.
//!
//! ```text
//!  osc1 ─→ [gain osc1] ─┐
//!  osc2 ─→ [gain osc2] ─┤
//!  osc3 ─→ [gain osc3] ─┼─→ [lowpass] ─→ [vca] ─→ Output
//!  sub  ─→ [gain sub ] ─┘
//! ```
//!
//! The router's six nodes live as long as the engine. Voices come and go and
//! plug their oscillators into [`channel_input`](MixerFilterRouter::channel_input).

use monovox_core::graph::{Destination, NodeId, ParamKind};

use crate::backend::{AudioGraphBackend, BackendError};
use crate::params::{MixerChannel, OscSlot, ParameterStore};

/// How a live parameter change reaches the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// Cancel anything pending and jump now.
    Immediate,
    /// Approach the new value with this time constant, leaving scheduled
    /// envelope segments in place.
    TimeConstant(f64),
}

/// Handles to the channel gains, filter, and VCA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerFilterRouter {
    channels: [NodeId; 4],
    filter: NodeId,
    vca: NodeId,
}

impl MixerFilterRouter {
    /// Create the router nodes from the current patch and wire them to the
    /// output. The VCA starts closed.
    pub fn build<B: AudioGraphBackend + ?Sized>(
        backend: &mut B,
        params: &ParameterStore,
    ) -> Result<Self, BackendError> {
        let filter_settings = params.filter();
        let filter = backend.create_lowpass(filter_settings.cutoff_hz, filter_settings.resonance)?;
        let vca = backend.create_gain(0.0)?;
        backend.connect(filter, Destination::Node(vca))?;
        backend.connect(vca, Destination::Output)?;

        let mut channels = [vca; 4];
        for slot in OscSlot::ALL {
            let gain = backend.create_gain(params.mixer().effective_gain(slot.into()))?;
            backend.connect(gain, Destination::Node(filter))?;
            channels[slot.index()] = gain;
        }

        Ok(Self {
            channels,
            filter,
            vca,
        })
    }

    /// Gain node an oscillator in `slot` connects to.
    pub fn channel_input(&self, slot: OscSlot) -> NodeId {
        self.channels[slot.index()]
    }

    /// The lowpass filter.
    pub fn filter(&self) -> NodeId {
        self.filter
    }

    /// The master VCA, driven by the amplitude envelope.
    pub fn vca(&self) -> NodeId {
        self.vca
    }

    /// Every router node, channel gains first.
    pub fn nodes(&self) -> [NodeId; 6] {
        let [a, b, c, d] = self.channels;
        [a, b, c, d, self.filter, self.vca]
    }

    /// Drive a channel gain toward `gain`. The noise channel has no node, so
    /// this is a no-op for it.
    pub fn apply_channel_gain<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        channel: MixerChannel,
        gain: f32,
        smoothing: Smoothing,
    ) -> Result<(), BackendError> {
        match channel.slot() {
            Some(slot) => apply(backend, self.channel_input(slot), ParamKind::Gain, gain, smoothing),
            None => Ok(()),
        }
    }

    /// Drive the filter's base cutoff.
    pub fn apply_cutoff<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        hz: f32,
        smoothing: Smoothing,
    ) -> Result<(), BackendError> {
        apply(backend, self.filter, ParamKind::Frequency, hz, smoothing)
    }

    /// Drive the filter's resonance (dB).
    pub fn apply_resonance<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        resonance: f32,
        smoothing: Smoothing,
    ) -> Result<(), BackendError> {
        apply(backend, self.filter, ParamKind::Q, resonance, smoothing)
    }

    /// Move the held amplitude to `target` over `ramp` seconds.
    ///
    /// Re-anchors at the live VCA gain first, so whatever the amplitude
    /// envelope had pending is replaced.
    pub fn apply_master_volume<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        target: f32,
        ramp: f64,
    ) -> Result<(), BackendError> {
        let now = backend.current_time();
        let live = backend.live_value(self.vca, ParamKind::Gain)?;
        backend.cancel_scheduled_values(self.vca, ParamKind::Gain, now)?;
        backend.set_value_at_time(self.vca, ParamKind::Gain, live, now)?;
        backend.linear_ramp_to_value_at_time(self.vca, ParamKind::Gain, target, now + ramp)
    }

    /// Disconnect and destroy every router node.
    pub fn teardown<B: AudioGraphBackend + ?Sized>(self, backend: &mut B) -> Result<(), BackendError> {
        for node in self.nodes() {
            backend.disconnect(node)?;
            backend.destroy(node)?;
        }
        Ok(())
    }
}

fn apply<B: AudioGraphBackend + ?Sized>(
    backend: &mut B,
    node: NodeId,
    param: ParamKind,
    value: f32,
    smoothing: Smoothing,
) -> Result<(), BackendError> {
    let now = backend.current_time();
    match smoothing {
        Smoothing::Immediate => {
            backend.cancel_scheduled_values(node, param, now)?;
            backend.set_value_at_time(node, param, value, now)
        }
        Smoothing::TimeConstant(tau) => backend.set_target_at_time(node, param, value, now, tau),
    }
}
