//! Voice Controller: the single monophonic voice.
//!
//! ```text
//!            note_on            note_off(current key)
//!   Idle ─────────────→ Sounding ─────────────────→ Releasing
//!    ▲                   ▲  │ note_on (retrigger)     │  │
//!    │                   └──┘                         │  │ note_on
//!    │                   ▲                            │  │
//!    │                   └────────────────────────────┼──┘
//!    └──────────── collect_finished (stop time passed)┘
//! ```
//!
//! A new note always takes the voice. The previous oscillators are stopped
//! immediately, disconnected, and destroyed before the new ones start.

use monovox_core::graph::{Destination, NodeId, ParamKind};
use monovox_core::pitch::{key_to_freq_from, octave_ratio};
use monovox_core::Waveform;

use crate::backend::{AudioGraphBackend, BackendError};
use crate::config::EngineConfig;
use crate::envelope::EnvelopeScheduler;
use crate::params::{OscSlot, ParameterStore};
use crate::router::MixerFilterRouter;

/// Where the voice is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoicePhase {
    /// No note, no oscillators.
    Idle,
    /// A note is held.
    Sounding,
    /// Released; oscillators stop at `stop_at`.
    Releasing {
        /// Scheduled oscillator stop time in seconds.
        stop_at: f64,
    },
}

/// One live oscillator and the slot it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceOscillator {
    /// Slot that configured it.
    pub slot: OscSlot,
    /// Backend handle.
    pub node: NodeId,
}

/// Snapshot of the voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    note: Option<i32>,
    phase: VoicePhase,
    oscillators: Vec<VoiceOscillator>,
}

impl VoiceState {
    fn idle() -> Self {
        Self {
            note: None,
            phase: VoicePhase::Idle,
            oscillators: Vec::new(),
        }
    }

    /// Key of the current note, held or releasing.
    pub fn current_note(&self) -> Option<i32> {
        self.note
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> VoicePhase {
        self.phase
    }

    /// Whether a note is held.
    pub fn is_sounding(&self) -> bool {
        self.phase == VoicePhase::Sounding
    }

    /// Whether oscillators are live (sounding or releasing).
    pub fn is_live(&self) -> bool {
        !self.oscillators.is_empty()
    }

    /// Live oscillators in slot order.
    pub fn oscillators(&self) -> &[VoiceOscillator] {
        &self.oscillators
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Frequency and detune of `slot` for `key` under the current patch.
pub fn slot_pitch(params: &ParameterStore, slot: OscSlot, key: i32, key_zero_midi: i32) -> (f32, f32) {
    let settings = params.oscillator(slot);
    let frequency = key_to_freq_from(key, key_zero_midi) * octave_ratio(settings.octave);
    let detune = if slot.is_sub() {
        0.0
    } else {
        settings.detune_cents as f32
    };
    (frequency, detune)
}

/// Drives note events against the backend.
#[derive(Debug, Clone)]
pub struct VoiceController {
    state: VoiceState,
    scheduler: EnvelopeScheduler,
    key_zero_midi: i32,
    stop_margin: f64,
}

impl VoiceController {
    /// Idle controller using the timing from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: VoiceState::idle(),
            scheduler: EnvelopeScheduler::new(config),
            key_zero_midi: config.key_zero_midi,
            stop_margin: config.stop_margin,
        }
    }

    /// Current voice state.
    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    /// Envelope scheduler in use.
    pub fn scheduler(&self) -> &EnvelopeScheduler {
        &self.scheduler
    }

    /// Start `key`, superseding whatever was playing.
    ///
    /// On failure the half-built voice is torn down and the controller is
    /// left idle.
    pub fn note_on<B: AudioGraphBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        params: &ParameterStore,
        router: &MixerFilterRouter,
        key: i32,
    ) -> Result<(), BackendError> {
        if let Err(err) = self.teardown(backend) {
            tracing::warn!(%err, "previous voice did not tear down cleanly");
        }

        match self.start_voice(backend, params, router, key) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Err(cleanup) = self.teardown(backend) {
                    tracing::warn!(%cleanup, "cleanup after failed note-on");
                }
                Err(err)
            }
        }
    }

    fn start_voice<B: AudioGraphBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        params: &ParameterStore,
        router: &MixerFilterRouter,
        key: i32,
    ) -> Result<(), BackendError> {
        let now = backend.current_time();

        for slot in OscSlot::ALL {
            let (frequency, detune) = slot_pitch(params, slot, key, self.key_zero_midi);
            let node = backend.create_oscillator(params.oscillator(slot).waveform, frequency, detune)?;
            self.state.oscillators.push(VoiceOscillator { slot, node });
            backend.connect(node, Destination::Node(router.channel_input(slot)))?;
            backend.start(node, now)?;
        }

        let live_gain = backend.live_value(router.vca(), ParamKind::Gain)?;
        self.scheduler
            .amplitude(&params.amp_envelope(), params.master_gain(), live_gain, now)
            .install(backend, router.vca(), ParamKind::Gain)?;

        let filter = params.filter();
        self.scheduler
            .filter(&params.filter_envelope(), filter.cutoff_hz, filter.contour, now)
            .install(backend, router.filter(), ParamKind::Frequency)?;

        self.state.note = Some(key);
        self.state.phase = VoicePhase::Sounding;
        tracing::debug!(key, now, "note_on");
        Ok(())
    }

    /// Release `key` if it is the held note.
    ///
    /// Returns `Ok(false)` for a stale key or when no note is held.
    pub fn note_off<B: AudioGraphBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        params: &ParameterStore,
        router: &MixerFilterRouter,
        key: i32,
    ) -> Result<bool, BackendError> {
        if self.state.note != Some(key) || !self.state.is_sounding() {
            tracing::trace!(key, current = ?self.state.note, "note_off ignored");
            return Ok(false);
        }

        let now = backend.current_time();
        let amp_env = params.amp_envelope();

        let live_gain = backend.live_value(router.vca(), ParamKind::Gain)?;
        self.scheduler
            .amplitude_release(&amp_env, live_gain, now)
            .install(backend, router.vca(), ParamKind::Gain)?;

        let live_cutoff = backend.live_value(router.filter(), ParamKind::Frequency)?;
        self.scheduler
            .filter_release(
                &params.filter_envelope(),
                live_cutoff,
                params.filter().cutoff_hz,
                now,
            )
            .install(backend, router.filter(), ParamKind::Frequency)?;

        let stop_at = now + self.scheduler.release_duration(&amp_env) + self.stop_margin;
        for osc in &self.state.oscillators {
            tolerate_stopped(backend.stop(osc.node, stop_at))?;
        }

        self.state.phase = VoicePhase::Releasing { stop_at };
        tracing::debug!(key, now, stop_at, "note_off");
        Ok(true)
    }

    /// Reap a released voice whose oscillators have stopped.
    ///
    /// Returns whether a voice was reaped.
    pub fn collect_finished<B: AudioGraphBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<bool, BackendError> {
        match self.state.phase {
            VoicePhase::Releasing { stop_at } if backend.current_time() >= stop_at => {
                tracing::debug!(note = ?self.state.note, "voice finished");
                self.teardown(backend)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Switch the live oscillator in `slot` to `waveform`, instantly.
    pub fn set_live_waveform<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        slot: OscSlot,
        waveform: Waveform,
    ) -> Result<(), BackendError> {
        match self.live_node(slot) {
            Some(node) => backend.set_waveform(node, waveform),
            None => Ok(()),
        }
    }

    /// Glide the live oscillator in `slot` to the patch's octave and detune
    /// for the current note. The envelopes are untouched.
    pub fn retune<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        params: &ParameterStore,
        slot: OscSlot,
        time_constant: f64,
    ) -> Result<(), BackendError> {
        let (Some(node), Some(key)) = (self.live_node(slot), self.state.note) else {
            return Ok(());
        };
        let now = backend.current_time();
        let (frequency, detune) = slot_pitch(params, slot, key, self.key_zero_midi);
        backend.set_target_at_time(node, ParamKind::Frequency, frequency, now, time_constant)?;
        if !slot.is_sub() {
            backend.set_target_at_time(node, ParamKind::Detune, detune, now, time_constant)?;
        }
        Ok(())
    }

    /// Hard-stop, disconnect, and destroy every live oscillator, leaving the
    /// controller idle.
    ///
    /// Every oscillator is released even if one fails; the first error is
    /// returned.
    pub fn teardown<B: AudioGraphBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), BackendError> {
        let oscillators = std::mem::take(&mut self.state.oscillators);
        self.state = VoiceState::idle();

        let now = backend.current_time();
        let mut first_error = None;
        for osc in oscillators {
            let result = tolerate_stopped(backend.stop(osc.node, now))
                .and_then(|()| backend.disconnect(osc.node))
                .and_then(|()| backend.destroy(osc.node));
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn live_node(&self, slot: OscSlot) -> Option<NodeId> {
        self.state
            .oscillators
            .iter()
            .find(|osc| osc.slot == slot)
            .map(|osc| osc.node)
    }
}

/// An oscillator the backend already stopped needs no further stopping.
fn tolerate_stopped(result: Result<(), BackendError>) -> Result<(), BackendError> {
    match result {
        Err(BackendError::AlreadyStopped(_)) => Ok(()),
        other => other,
    }
}
