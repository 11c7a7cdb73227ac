//! The synth engine: parameters, voice, and router over one backend.

use monovox_core::graph::ParamKind;
use monovox_core::Waveform;

use crate::backend::AudioGraphBackend;
use crate::config::EngineConfig;
use crate::envelope::EnvelopeSpec;
use crate::error::Result;
use crate::params::{FilterSettings, MixerChannel, OscSlot, ParamChange, ParameterStore};
use crate::router::{MixerFilterRouter, Smoothing};
use crate::voice::{VoiceController, VoicePhase, VoiceState};

/// A monophonic subtractive synth driving an [`AudioGraphBackend`].
///
/// The engine owns its backend. Parameter setters update the
/// [`ParameterStore`] and, when a voice is live, nudge the graph. Note events
/// go to the voice controller. None of these operations fail: backend
/// trouble is logged and results in silence.
///
/// # Example
///
/// ```rust
/// use monovox_engine::{RecordingBackend, SynthEngine};
///
/// let mut engine = SynthEngine::new(RecordingBackend::new()).unwrap();
/// engine.note_on(33);
/// assert_eq!(engine.voice().current_note(), Some(33));
///
/// engine.backend_mut().advance(0.5);
/// engine.note_off(33);
///
/// let backend = engine.dispose();
/// assert_eq!(backend.graph().node_count(), 0);
/// ```
#[derive(Debug)]
pub struct SynthEngine<B: AudioGraphBackend> {
    backend: B,
    config: EngineConfig,
    params: ParameterStore,
    voice: VoiceController,
    router: MixerFilterRouter,
}

impl<B: AudioGraphBackend> SynthEngine<B> {
    /// Engine with the default configuration.
    pub fn new(backend: B) -> Result<Self> {
        Self::with_config(backend, EngineConfig::default())
    }

    /// Engine with an explicit configuration.
    ///
    /// Builds the persistent router graph from the power-on patch.
    pub fn with_config(mut backend: B, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let params = ParameterStore::default();
        let router = MixerFilterRouter::build(&mut backend, &params)?;
        let voice = VoiceController::new(&config);
        tracing::debug!(nodes = ?router.nodes(), "engine_built");
        Ok(Self {
            backend,
            config,
            params,
            voice,
            router,
        })
    }

    /// Resume the output device if it is suspended.
    pub fn resume(&mut self) -> Result<()> {
        if self.backend.is_suspended() {
            self.backend.resume()?;
            tracing::debug!("backend resumed");
        }
        Ok(())
    }

    /// Play `key`, taking the voice from any previous note.
    ///
    /// If the output cannot be resumed the note is dropped.
    pub fn note_on(&mut self, key: i32) {
        self.reap();
        if let Err(err) = self.resume() {
            tracing::warn!(key, %err, "note dropped: output unavailable");
            return;
        }
        if let Err(err) = self
            .voice
            .note_on(&mut self.backend, &self.params, &self.router, key)
        {
            tracing::warn!(key, %err, "note dropped");
        }
    }

    /// Release `key`. Ignored unless `key` is the held note.
    pub fn note_off(&mut self, key: i32) {
        self.reap();
        if let Err(err) = self
            .voice
            .note_off(&mut self.backend, &self.params, &self.router, key)
        {
            tracing::warn!(key, %err, "release failed");
        }
    }

    /// Reap a released voice whose oscillators have stopped.
    ///
    /// Returns whether the voice went from releasing to idle. Teardown is best
    /// effort: if the backend refuses part of it the voice is still dropped
    /// (and this returns `true`), only the refused nodes are left behind.
    ///
    /// Every other public operation does this first, so calling it directly
    /// is only needed to free nodes while the engine is otherwise untouched.
    pub fn collect_finished(&mut self) -> bool {
        match self.voice.collect_finished(&mut self.backend) {
            Ok(reaped) => reaped,
            Err(err) => {
                tracing::warn!(%err, "reaping finished voice left nodes behind");
                self.voice.state().phase() == VoicePhase::Idle
            }
        }
    }

    fn reap(&mut self) {
        self.collect_finished();
    }

    /// Set an oscillator's waveform.
    pub fn set_osc_waveform(&mut self, slot: OscSlot, waveform: Waveform) {
        let change = self.params.set_osc_waveform(slot, waveform);
        self.dispatch(change);
    }

    /// Set an oscillator's octave.
    pub fn set_osc_octave(&mut self, slot: OscSlot, octave: i32) {
        let change = self.params.set_osc_octave(slot, octave);
        self.dispatch(change);
    }

    /// Set a main oscillator's detune in cents.
    pub fn set_osc_detune(&mut self, slot: OscSlot, cents: i32) {
        let change = self.params.set_osc_detune(slot, cents);
        self.dispatch(change);
    }

    /// Set a mixer fader.
    pub fn set_mixer_level(&mut self, channel: MixerChannel, level: f32) {
        let change = self.params.set_mixer_level(channel, level);
        self.dispatch(change);
    }

    /// Set a channel's mute switch.
    pub fn set_mute(&mut self, channel: MixerChannel, muted: bool) {
        let change = self.params.set_mute(channel, muted);
        self.dispatch(change);
    }

    /// Flip a channel's mute switch.
    pub fn toggle_mute(&mut self, channel: MixerChannel) {
        let change = self.params.toggle_mute(channel);
        self.dispatch(change);
    }

    /// Set the filter base cutoff in Hz.
    pub fn set_filter_cutoff(&mut self, hz: f32) {
        let change = self.params.set_filter_cutoff(hz);
        self.dispatch(change);
    }

    /// Set the filter resonance.
    pub fn set_filter_resonance(&mut self, q: f32) {
        let change = self.params.set_filter_resonance(q);
        self.dispatch(change);
    }

    /// Set the filter envelope amount.
    pub fn set_filter_contour(&mut self, amount: f32) {
        let change = self.params.set_filter_contour(amount);
        self.dispatch(change);
    }

    /// Set keyboard tracking.
    pub fn set_filter_key_track(&mut self, on: bool) {
        let change = self.params.set_filter_key_track(on);
        self.dispatch(change);
    }

    /// Set cutoff, resonance, and contour together.
    pub fn set_filter(&mut self, cutoff_hz: f32, resonance: f32, contour: f32) {
        self.reap();
        for change in self.params.set_filter(cutoff_hz, resonance, contour) {
            self.apply_change(change);
        }
    }

    /// Set the amplitude ADSR. Takes effect on the next note.
    pub fn set_amp_envelope(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        let change = self.params.set_amp_envelope(attack, decay, sustain, release);
        self.dispatch(change);
    }

    /// Set the filter ADSR. Takes effect on the next note.
    pub fn set_filter_envelope(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        let change = self
            .params
            .set_filter_envelope(attack, decay, sustain, release);
        self.dispatch(change);
    }

    /// Set master volume, 0 to 100.
    pub fn set_master_volume(&mut self, volume: f32) {
        let change = self.params.set_master_volume(volume);
        self.dispatch(change);
    }

    fn dispatch(&mut self, change: Option<ParamChange>) {
        self.reap();
        if let Some(change) = change {
            self.apply_change(change);
        }
    }

    /// Push one store change to the live graph.
    fn apply_change(&mut self, change: ParamChange) {
        tracing::trace!(?change, live = self.voice.state().is_live(), "param_change");

        let smoothing = if self.voice.state().is_live() {
            Smoothing::TimeConstant(self.config.mix_smoothing)
        } else {
            Smoothing::Immediate
        };
        let backend = &mut self.backend;
        let params = &self.params;

        let result = match change {
            ParamChange::OscWaveform(slot) => {
                self.voice
                    .set_live_waveform(backend, slot, params.oscillator(slot).waveform)
            }
            ParamChange::OscTuning(slot) => {
                self.voice
                    .retune(backend, params, slot, self.config.oscillator_smoothing)
            }
            ParamChange::MixerLevel(channel) => self.router.apply_channel_gain(
                backend,
                channel,
                params.mixer().effective_gain(channel),
                smoothing,
            ),
            ParamChange::FilterCutoff => {
                self.router
                    .apply_cutoff(backend, params.filter().cutoff_hz, smoothing)
            }
            ParamChange::FilterResonance => {
                self.router
                    .apply_resonance(backend, params.filter().resonance, smoothing)
            }
            ParamChange::MasterVolume if self.voice.state().is_sounding() => {
                let target = params.master_gain() * params.amp_envelope().sustain;
                self.router
                    .apply_master_volume(backend, target, self.config.master_ramp)
            }
            ParamChange::MasterVolume
            | ParamChange::FilterContour
            | ParamChange::FilterKeyTrack
            | ParamChange::AmpEnvelope
            | ParamChange::FilterEnvelope => Ok(()),
        };

        if let Err(err) = result {
            tracing::warn!(?change, %err, "live update failed");
        }
    }

    /// Tear down every oscillator and router node and hand back the backend.
    pub fn dispose(mut self) -> B {
        if let Err(err) = self.voice.teardown(&mut self.backend) {
            tracing::warn!(%err, "voice teardown failed");
        }
        if let Err(err) = self.router.teardown(&mut self.backend) {
            tracing::warn!(%err, "router teardown failed");
        }
        tracing::debug!("engine disposed");
        self.backend
    }

    /// Voice snapshot.
    pub fn voice(&self) -> &VoiceState {
        self.voice.state()
    }

    /// Current patch.
    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// Filter panel settings.
    pub fn filter(&self) -> FilterSettings {
        self.params.filter()
    }

    /// Amplitude ADSR in use.
    pub fn amp_envelope(&self) -> EnvelopeSpec {
        self.params.amp_envelope()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Router node handles.
    pub fn router(&self) -> &MixerFilterRouter {
        &self.router
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably (to drive a manual clock in tests).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current VCA gain, if the backend can report it.
    pub fn live_amplitude(&self) -> Option<f32> {
        self.backend
            .live_value(self.router.vca(), ParamKind::Gain)
            .ok()
    }

    /// Current filter cutoff in Hz, if the backend can report it.
    pub fn live_cutoff(&self) -> Option<f32> {
        self.backend
            .live_value(self.router.filter(), ParamKind::Frequency)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendError, EngineError, NodeId, RecordingBackend};
    use monovox_core::graph::GraphCommand;

    /// Recording backend that can be told to refuse node destruction.
    #[derive(Default)]
    struct RefusingDestroy {
        inner: RecordingBackend,
        refuse: bool,
    }

    impl AudioGraphBackend for RefusingDestroy {
        fn current_time(&self) -> f64 {
            self.inner.current_time()
        }

        fn is_suspended(&self) -> bool {
            self.inner.is_suspended()
        }

        fn resume(&mut self) -> std::result::Result<(), BackendError> {
            self.inner.resume()
        }

        fn allocate_node_id(&mut self) -> NodeId {
            self.inner.allocate_node_id()
        }

        fn submit(&mut self, command: GraphCommand) -> std::result::Result<(), BackendError> {
            if self.refuse && matches!(command, GraphCommand::Destroy { .. }) {
                return Err(BackendError::Unavailable("destroy refused".into()));
            }
            self.inner.submit(command)
        }

        fn param_value(
            &self,
            node: NodeId,
            param: ParamKind,
            at: f64,
        ) -> std::result::Result<f32, BackendError> {
            self.inner.param_value(node, param, at)
        }
    }

    fn engine() -> SynthEngine<RecordingBackend> {
        SynthEngine::new(RecordingBackend::new()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            release_floor: -1.0,
            ..EngineConfig::default()
        };
        let err = SynthEngine::with_config(RecordingBackend::new(), config).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn idle_mixer_change_is_immediate() {
        let mut engine = engine();
        engine.set_mixer_level(MixerChannel::Osc1, 0.2);
        let node = engine.router().channel_input(OscSlot::Osc1);
        let gain = engine.backend().live_value(node, ParamKind::Gain).unwrap();
        assert_eq!(gain, 0.2);
    }

    #[test]
    fn live_mixer_change_is_smoothed() {
        let mut engine = engine();
        engine.note_on(24);
        engine.backend_mut().set_time(0.5);
        engine.set_mixer_level(MixerChannel::Osc1, 0.2);
        let node = engine.router().channel_input(OscSlot::Osc1);

        let at_change = engine.backend().param_value(node, ParamKind::Gain, 0.5).unwrap();
        let settled = engine.backend().param_value(node, ParamKind::Gain, 2.0).unwrap();
        assert!((at_change - 0.8).abs() < 1e-6);
        assert!((settled - 0.2).abs() < 1e-4);
    }

    #[test]
    fn live_cutoff_nudge_keeps_envelope() {
        let mut engine = engine();
        engine.note_on(24);
        let filter = engine.router().filter();
        let at = |engine: &SynthEngine<RecordingBackend>, t: f64| {
            engine
                .backend()
                .param_value(filter, ParamKind::Frequency, t)
                .unwrap()
        };

        engine.backend_mut().set_time(0.1);
        let before = at(&engine, 0.1);
        engine.set_filter_cutoff(2000.0);

        // No jump, and the envelope's peak and sustain (from the 2400 Hz
        // base) still win over the nudge.
        assert!((at(&engine, 0.1) - before).abs() < 1e-3);
        assert!((at(&engine, 0.21) - 4400.0).abs() < 50.0);
        assert!((at(&engine, 1.0) - 2800.0).abs() < 1.0);

        // The new base takes effect as the release target.
        engine.backend_mut().set_time(1.0);
        engine.note_off(24);
        assert!((at(&engine, 1.6) - 2000.0).abs() < 1.0);
    }

    #[test]
    fn master_volume_while_sounding_ramps_to_sustain() {
        let mut engine = engine();
        engine.note_on(24);
        engine.backend_mut().set_time(1.0);
        engine.set_master_volume(50.0);

        let live = engine.live_amplitude().unwrap();
        assert!((live - 0.6).abs() < 1e-4);
        engine.backend_mut().set_time(1.1);
        let after = engine.live_amplitude().unwrap();
        assert!((after - 0.4).abs() < 1e-4, "after = {after}");
    }

    #[test]
    fn master_volume_while_idle_waits_for_next_note() {
        let mut engine = engine();
        let before = engine.backend().commands().len();
        engine.set_master_volume(50.0);
        assert_eq!(engine.backend().commands().len(), before);

        engine.note_on(24);
        engine.backend_mut().set_time(0.01);
        assert!((engine.live_amplitude().unwrap() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn envelope_changes_do_not_touch_live_voice() {
        let mut engine = engine();
        engine.note_on(24);
        let before = engine.backend().commands().len();
        engine.set_amp_envelope(0.5, 0.5, 0.5, 0.5);
        engine.set_filter_envelope(0.5, 0.5, 0.5, 0.5);
        engine.set_filter_contour(10.0);
        engine.set_filter_key_track(false);
        assert_eq!(engine.backend().commands().len(), before);
        assert!(engine.voice().is_sounding());
    }

    #[test]
    fn oscillator_changes_reach_live_voice() {
        let mut engine = engine();
        engine.note_on(33);
        engine.set_osc_waveform(OscSlot::Osc3, Waveform::Pulse);
        let node = engine.voice().oscillators()[OscSlot::Osc3.index()].node;
        assert_eq!(engine.backend().graph().waveform(node), Some(Waveform::Pulse));
    }

    #[test]
    fn operations_reap_finished_voice() {
        let mut engine = engine();
        engine.note_on(24);
        engine.backend_mut().set_time(1.0);
        engine.note_off(24);
        engine.backend_mut().set_time(3.0);
        engine.set_filter_resonance(4.0);
        assert_eq!(engine.voice().phase(), VoicePhase::Idle);
        assert_eq!(engine.backend().graph().node_count(), 6);
    }

    #[test]
    fn collect_finished_reports_what_happened() {
        let mut engine = engine();
        assert!(!engine.collect_finished());
        engine.note_on(24);
        engine.backend_mut().set_time(1.0);
        engine.note_off(24);
        assert!(!engine.collect_finished());

        engine.backend_mut().set_time(2.0);
        assert!(engine.collect_finished());
        assert!(!engine.collect_finished());
    }

    #[test]
    fn failed_reap_still_drops_voice() {
        let mut engine = SynthEngine::new(RefusingDestroy::default()).unwrap();
        engine.note_on(24);
        engine.backend_mut().inner.set_time(1.0);
        engine.note_off(24);
        engine.backend_mut().inner.set_time(2.0);
        engine.backend_mut().refuse = true;

        assert!(engine.collect_finished());
        assert_eq!(engine.voice().phase(), VoicePhase::Idle);
        // The refused oscillators are still in the graph.
        assert_eq!(engine.backend().inner.graph().node_count(), 10);
        assert!(!engine.collect_finished());
    }

    #[test]
    fn grouped_filter_setter_applies_each_change() {
        let mut engine = engine();
        engine.set_filter(800.0, 5.0, 40.0);
        assert_eq!(engine.live_cutoff(), Some(800.0));
        let q = engine
            .backend()
            .live_value(engine.router().filter(), ParamKind::Q)
            .unwrap();
        assert_eq!(q, 5.0);
    }
}
