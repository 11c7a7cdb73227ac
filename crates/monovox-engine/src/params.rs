//! Parameter Store: the authoritative patch.
//!
//! Every setter clamps its input into range, updates the store, and returns a
//! [`ParamChange`] describing what moved. It returns `None` when nothing
//! changed (same value again, or a NaN/infinite input), so repeating a setter
//! never reaches the audio graph twice. The store knows nothing about voices
//! or backends; the engine routes each change to whoever cares.

use core::fmt;
use core::str::FromStr;

use monovox_core::Waveform;
use thiserror::Error;

use crate::envelope::EnvelopeSpec;

/// Lowest stored filter cutoff.
pub const CUTOFF_MIN_HZ: f32 = 20.0;
/// Highest stored filter cutoff.
pub const CUTOFF_MAX_HZ: f32 = 20000.0;
/// Highest filter resonance.
pub const RESONANCE_MAX: f32 = 10.0;
/// Detune range for the main oscillators, in cents.
pub const DETUNE_LIMIT_CENTS: i32 = 700;
/// Master volume range upper bound.
pub const MASTER_VOLUME_MAX: f32 = 100.0;

/// One of the four oscillator slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OscSlot {
    /// Oscillator 1.
    Osc1,
    /// Oscillator 2.
    Osc2,
    /// Oscillator 3.
    Osc3,
    /// Sub-oscillator (no detune, octave -2 or -1).
    Sub,
}

impl OscSlot {
    /// All slots in panel order.
    pub const ALL: [OscSlot; 4] = [Self::Osc1, Self::Osc2, Self::Osc3, Self::Sub];

    /// Position in [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        match self {
            Self::Osc1 => 0,
            Self::Osc2 => 1,
            Self::Osc3 => 2,
            Self::Sub => 3,
        }
    }

    /// Whether this is the sub-oscillator.
    pub fn is_sub(self) -> bool {
        self == Self::Sub
    }

    /// Allowed octave offsets.
    pub fn octave_range(self) -> (i32, i32) {
        if self.is_sub() { (-2, -1) } else { (-2, 2) }
    }

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Osc1 => "osc1",
            Self::Osc2 => "osc2",
            Self::Osc3 => "osc3",
            Self::Sub => "sub",
        }
    }
}

impl fmt::Display for OscSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mixer channel. `Noise` is stored but not wired to any source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixerChannel {
    /// Oscillator 1 level.
    Osc1,
    /// Oscillator 2 level.
    Osc2,
    /// Oscillator 3 level.
    Osc3,
    /// Sub-oscillator level.
    Sub,
    /// Noise level.
    Noise,
}

impl MixerChannel {
    /// All channels in panel order.
    pub const ALL: [MixerChannel; 5] = [Self::Osc1, Self::Osc2, Self::Osc3, Self::Sub, Self::Noise];

    fn index(self) -> usize {
        match self {
            Self::Osc1 => 0,
            Self::Osc2 => 1,
            Self::Osc3 => 2,
            Self::Sub => 3,
            Self::Noise => 4,
        }
    }

    /// The oscillator slot feeding this channel.
    pub fn slot(self) -> Option<OscSlot> {
        match self {
            Self::Osc1 => Some(OscSlot::Osc1),
            Self::Osc2 => Some(OscSlot::Osc2),
            Self::Osc3 => Some(OscSlot::Osc3),
            Self::Sub => Some(OscSlot::Sub),
            Self::Noise => None,
        }
    }

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self.slot() {
            Some(slot) => slot.name(),
            None => "noise",
        }
    }
}

impl From<OscSlot> for MixerChannel {
    fn from(slot: OscSlot) -> Self {
        match slot {
            OscSlot::Osc1 => Self::Osc1,
            OscSlot::Osc2 => Self::Osc2,
            OscSlot::Osc3 => Self::Osc3,
            OscSlot::Sub => Self::Sub,
        }
    }
}

impl fmt::Display for MixerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a slot or channel name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{name}'")]
pub struct ParseNameError {
    kind: &'static str,
    name: String,
}

impl FromStr for OscSlot {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "osc1" | "1" => Ok(Self::Osc1),
            "osc2" | "2" => Ok(Self::Osc2),
            "osc3" | "3" => Ok(Self::Osc3),
            "sub" | "4" => Ok(Self::Sub),
            _ => Err(ParseNameError {
                kind: "oscillator",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for MixerChannel {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("noise") {
            return Ok(Self::Noise);
        }
        s.parse::<OscSlot>()
            .map(Self::from)
            .map_err(|_| ParseNameError {
                kind: "mixer channel",
                name: s.to_string(),
            })
    }
}

/// Waveform and tuning of one oscillator slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSettings {
    /// Waveform.
    pub waveform: Waveform,
    /// Octave offset applied as `2^octave`.
    pub octave: i32,
    /// Detune in cents (always 0 for the sub).
    pub detune_cents: i32,
}

/// One mixer fader plus its mute switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    /// Fader position in `[0, 1]`.
    pub level: f32,
    /// Mute switch.
    pub muted: bool,
}

impl ChannelLevel {
    /// Gain actually applied: zero while muted.
    pub fn effective(&self) -> f32 {
        if self.muted { 0.0 } else { self.level }
    }
}

/// Fader and mute state of every mixer channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerState {
    channels: [ChannelLevel; 5],
}

impl MixerState {
    /// Fader and mute for `channel`.
    pub fn channel(&self, channel: MixerChannel) -> ChannelLevel {
        self.channels[channel.index()]
    }

    /// Post-mute gain for `channel`.
    pub fn effective_gain(&self, channel: MixerChannel) -> f32 {
        self.channel(channel).effective()
    }
}

/// Filter panel settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// Base cutoff in Hz, `[20, 20000]`.
    pub cutoff_hz: f32,
    /// Resonance in dB, `[0, 10]`.
    pub resonance: f32,
    /// Envelope amount in panel units (scaled to Hz by the engine).
    pub contour: f32,
    /// Keyboard tracking switch.
    pub key_track: bool,
}

/// What a setter changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamChange {
    /// A slot's waveform.
    OscWaveform(OscSlot),
    /// A slot's octave or detune.
    OscTuning(OscSlot),
    /// A channel's level or mute.
    MixerLevel(MixerChannel),
    /// Filter base cutoff.
    FilterCutoff,
    /// Filter resonance.
    FilterResonance,
    /// Filter envelope amount.
    FilterContour,
    /// Keyboard tracking switch.
    FilterKeyTrack,
    /// Amplitude ADSR.
    AmpEnvelope,
    /// Filter ADSR.
    FilterEnvelope,
    /// Master volume.
    MasterVolume,
}

/// The authoritative patch, independent of whether a note is sounding.
///
/// # Example
///
/// ```rust
/// use monovox_engine::{ParamChange, ParameterStore};
///
/// let mut params = ParameterStore::default();
/// assert_eq!(params.set_filter_cutoff(-5.0), Some(ParamChange::FilterCutoff));
/// assert_eq!(params.filter().cutoff_hz, 20.0);
/// assert_eq!(params.set_filter_cutoff(-5.0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    oscillators: [OscillatorSettings; 4],
    mixer: MixerState,
    filter: FilterSettings,
    amp_envelope: EnvelopeSpec,
    filter_envelope: EnvelopeSpec,
    /// 0 to 100
    master_volume: f32,
}

impl Default for ParameterStore {
    fn default() -> Self {
        let osc = |waveform, octave, detune_cents| OscillatorSettings {
            waveform,
            octave,
            detune_cents,
        };
        let level = |level| ChannelLevel {
            level,
            muted: false,
        };
        Self {
            oscillators: [
                osc(Waveform::Sawtooth, 0, 0),
                osc(Waveform::Square, 0, 12),
                osc(Waveform::Triangle, -1, -5),
                osc(Waveform::Square, -1, 0),
            ],
            mixer: MixerState {
                channels: [level(0.8), level(0.6), level(0.4), level(0.5), level(0.15)],
            },
            filter: FilterSettings {
                cutoff_hz: 2400.0,
                resonance: 2.0,
                contour: 40.0,
                key_track: true,
            },
            amp_envelope: EnvelopeSpec {
                attack: 0.01,
                decay: 0.4,
                sustain: 0.8,
                release: 0.3,
            },
            filter_envelope: EnvelopeSpec {
                attack: 0.2,
                decay: 0.6,
                sustain: 0.2,
                release: 0.5,
            },
            master_volume: 75.0,
        }
    }
}

/// Store `value` into `slot`, reporting `change` if it differs.
fn update<T: PartialEq>(slot: &mut T, value: T, change: ParamChange) -> Option<ParamChange> {
    if *slot == value {
        None
    } else {
        *slot = value;
        Some(change)
    }
}

impl ParameterStore {
    /// Settings of one oscillator slot.
    pub fn oscillator(&self, slot: OscSlot) -> OscillatorSettings {
        self.oscillators[slot.index()]
    }

    /// Mixer faders and mutes.
    pub fn mixer(&self) -> &MixerState {
        &self.mixer
    }

    /// Filter panel settings.
    pub fn filter(&self) -> FilterSettings {
        self.filter
    }

    /// Amplitude ADSR.
    pub fn amp_envelope(&self) -> EnvelopeSpec {
        self.amp_envelope
    }

    /// Filter ADSR.
    pub fn filter_envelope(&self) -> EnvelopeSpec {
        self.filter_envelope
    }

    /// Master volume on the panel scale, 0 to 100.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Master volume as a linear gain, 0.0 to 1.0.
    pub fn master_gain(&self) -> f32 {
        self.master_volume / MASTER_VOLUME_MAX
    }

    /// Set a slot's waveform.
    pub fn set_osc_waveform(&mut self, slot: OscSlot, waveform: Waveform) -> Option<ParamChange> {
        update(
            &mut self.oscillators[slot.index()].waveform,
            waveform,
            ParamChange::OscWaveform(slot),
        )
    }

    /// Set a slot's octave, clamped to the slot's range.
    pub fn set_osc_octave(&mut self, slot: OscSlot, octave: i32) -> Option<ParamChange> {
        let (low, high) = slot.octave_range();
        update(
            &mut self.oscillators[slot.index()].octave,
            octave.clamp(low, high),
            ParamChange::OscTuning(slot),
        )
    }

    /// Set a main oscillator's detune, clamped to ±700 cents. Ignored for the sub.
    pub fn set_osc_detune(&mut self, slot: OscSlot, cents: i32) -> Option<ParamChange> {
        if slot.is_sub() {
            return None;
        }
        update(
            &mut self.oscillators[slot.index()].detune_cents,
            cents.clamp(-DETUNE_LIMIT_CENTS, DETUNE_LIMIT_CENTS),
            ParamChange::OscTuning(slot),
        )
    }

    /// Set a channel's fader, clamped to `[0, 1]`. The mute switch is untouched.
    pub fn set_mixer_level(&mut self, channel: MixerChannel, level: f32) -> Option<ParamChange> {
        if !level.is_finite() {
            return None;
        }
        update(
            &mut self.mixer.channels[channel.index()].level,
            level.clamp(0.0, 1.0),
            ParamChange::MixerLevel(channel),
        )
    }

    /// Set a channel's mute switch. The fader level is kept.
    pub fn set_mute(&mut self, channel: MixerChannel, muted: bool) -> Option<ParamChange> {
        update(
            &mut self.mixer.channels[channel.index()].muted,
            muted,
            ParamChange::MixerLevel(channel),
        )
    }

    /// Flip a channel's mute switch.
    pub fn toggle_mute(&mut self, channel: MixerChannel) -> Option<ParamChange> {
        let muted = self.mixer.channel(channel).muted;
        self.set_mute(channel, !muted)
    }

    /// Set the base cutoff, clamped to `[20, 20000]` Hz.
    pub fn set_filter_cutoff(&mut self, hz: f32) -> Option<ParamChange> {
        if !hz.is_finite() {
            return None;
        }
        update(
            &mut self.filter.cutoff_hz,
            hz.clamp(CUTOFF_MIN_HZ, CUTOFF_MAX_HZ),
            ParamChange::FilterCutoff,
        )
    }

    /// Set resonance, clamped to `[0, 10]` dB.
    pub fn set_filter_resonance(&mut self, q: f32) -> Option<ParamChange> {
        if !q.is_finite() {
            return None;
        }
        update(
            &mut self.filter.resonance,
            q.clamp(0.0, RESONANCE_MAX),
            ParamChange::FilterResonance,
        )
    }

    /// Set the filter envelope amount. Any finite value is accepted.
    pub fn set_filter_contour(&mut self, amount: f32) -> Option<ParamChange> {
        if !amount.is_finite() {
            return None;
        }
        update(&mut self.filter.contour, amount, ParamChange::FilterContour)
    }

    /// Set keyboard tracking.
    pub fn set_filter_key_track(&mut self, on: bool) -> Option<ParamChange> {
        update(&mut self.filter.key_track, on, ParamChange::FilterKeyTrack)
    }

    /// Set cutoff, resonance, and contour together, as the filter panel does.
    ///
    /// Returns one change per value that actually moved.
    pub fn set_filter(&mut self, cutoff_hz: f32, resonance: f32, contour: f32) -> Vec<ParamChange> {
        [
            self.set_filter_cutoff(cutoff_hz),
            self.set_filter_resonance(resonance),
            self.set_filter_contour(contour),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Set the amplitude ADSR.
    pub fn set_amp_envelope(
        &mut self,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) -> Option<ParamChange> {
        let spec = EnvelopeSpec::new(attack, decay, sustain, release)?;
        update(&mut self.amp_envelope, spec, ParamChange::AmpEnvelope)
    }

    /// Set the filter ADSR.
    pub fn set_filter_envelope(
        &mut self,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) -> Option<ParamChange> {
        let spec = EnvelopeSpec::new(attack, decay, sustain, release)?;
        update(&mut self.filter_envelope, spec, ParamChange::FilterEnvelope)
    }

    /// Set master volume on the 0 to 100 panel scale.
    pub fn set_master_volume(&mut self, volume: f32) -> Option<ParamChange> {
        if !volume.is_finite() {
            return None;
        }
        update(
            &mut self.master_volume,
            volume.clamp(0.0, MASTER_VOLUME_MAX),
            ParamChange::MasterVolume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_patch() {
        let params = ParameterStore::default();
        assert_eq!(params.oscillator(OscSlot::Osc1).waveform, Waveform::Sawtooth);
        assert_eq!(params.oscillator(OscSlot::Osc2).detune_cents, 12);
        assert_eq!(params.oscillator(OscSlot::Osc3).octave, -1);
        assert_eq!(params.oscillator(OscSlot::Osc3).detune_cents, -5);
        assert_eq!(params.oscillator(OscSlot::Sub).octave, -1);
        assert_eq!(params.mixer().effective_gain(MixerChannel::Osc1), 0.8);
        assert_eq!(params.mixer().effective_gain(MixerChannel::Noise), 0.15);
        assert_eq!(params.filter().cutoff_hz, 2400.0);
        assert!(params.filter().key_track);
        assert_eq!(params.master_gain(), 0.75);
    }

    #[test]
    fn cutoff_is_clamped() {
        let mut params = ParameterStore::default();
        params.set_filter_cutoff(-5.0);
        assert_eq!(params.filter().cutoff_hz, 20.0);
        params.set_filter_cutoff(999_999.0);
        assert_eq!(params.filter().cutoff_hz, 20000.0);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut params = ParameterStore::default();
        let before = params.clone();
        assert_eq!(params.set_filter_cutoff(f32::NAN), None);
        assert_eq!(params.set_master_volume(f32::INFINITY), None);
        assert_eq!(params.set_amp_envelope(f32::NAN, 0.1, 0.5, 0.1), None);
        assert_eq!(params, before);
    }

    #[test]
    fn setters_are_idempotent() {
        let mut params = ParameterStore::default();
        assert_eq!(params.set_master_volume(60.0), Some(ParamChange::MasterVolume));
        assert_eq!(params.set_master_volume(60.0), None);
        assert_eq!(
            params.set_osc_waveform(OscSlot::Osc2, Waveform::Sine),
            Some(ParamChange::OscWaveform(OscSlot::Osc2))
        );
        assert_eq!(params.set_osc_waveform(OscSlot::Osc2, Waveform::Sine), None);
        // Clamped values compare after clamping.
        params.set_filter_resonance(50.0);
        assert_eq!(params.set_filter_resonance(11.0), None);
    }

    #[test]
    fn octave_ranges_per_slot() {
        let mut params = ParameterStore::default();
        params.set_osc_octave(OscSlot::Osc1, 5);
        assert_eq!(params.oscillator(OscSlot::Osc1).octave, 2);
        params.set_osc_octave(OscSlot::Sub, 0);
        assert_eq!(params.oscillator(OscSlot::Sub).octave, -1);
        params.set_osc_octave(OscSlot::Sub, -3);
        assert_eq!(params.oscillator(OscSlot::Sub).octave, -2);
    }

    #[test]
    fn detune_is_clamped_and_ignored_for_sub() {
        let mut params = ParameterStore::default();
        params.set_osc_detune(OscSlot::Osc2, 1000);
        assert_eq!(params.oscillator(OscSlot::Osc2).detune_cents, 700);
        assert_eq!(params.set_osc_detune(OscSlot::Sub, 50), None);
        assert_eq!(params.oscillator(OscSlot::Sub).detune_cents, 0);
    }

    #[test]
    fn mute_round_trip_keeps_level() {
        let mut params = ParameterStore::default();
        params.set_mixer_level(MixerChannel::Osc2, 0.3);
        assert_eq!(
            params.toggle_mute(MixerChannel::Osc2),
            Some(ParamChange::MixerLevel(MixerChannel::Osc2))
        );
        assert_eq!(params.mixer().effective_gain(MixerChannel::Osc2), 0.0);
        params.toggle_mute(MixerChannel::Osc2);
        assert_eq!(params.mixer().effective_gain(MixerChannel::Osc2), 0.3);
    }

    #[test]
    fn level_changes_while_muted_are_kept() {
        let mut params = ParameterStore::default();
        params.set_mute(MixerChannel::Sub, true);
        params.set_mixer_level(MixerChannel::Sub, 0.9);
        assert_eq!(params.mixer().effective_gain(MixerChannel::Sub), 0.0);
        params.set_mute(MixerChannel::Sub, false);
        assert_eq!(params.mixer().effective_gain(MixerChannel::Sub), 0.9);
    }

    #[test]
    fn grouped_filter_setter_reports_each_change() {
        let mut params = ParameterStore::default();
        let changes = params.set_filter(800.0, 2.0, 60.0);
        assert_eq!(
            changes,
            vec![ParamChange::FilterCutoff, ParamChange::FilterContour]
        );
        assert!(params.set_filter(800.0, 2.0, 60.0).is_empty());
    }

    #[test]
    fn envelope_values_are_clamped() {
        let mut params = ParameterStore::default();
        params.set_filter_envelope(-1.0, 0.5, 2.0, 0.2);
        let env = params.filter_envelope();
        assert_eq!((env.attack, env.sustain), (0.0, 1.0));
    }

    #[test]
    fn master_volume_maps_to_gain() {
        let mut params = ParameterStore::default();
        params.set_master_volume(150.0);
        assert_eq!(params.master_gain(), 1.0);
        params.set_master_volume(-3.0);
        assert_eq!(params.master_gain(), 0.0);
    }

    #[test]
    fn names_parse() {
        assert_eq!("osc2".parse::<OscSlot>(), Ok(OscSlot::Osc2));
        assert_eq!("SUB".parse::<OscSlot>(), Ok(OscSlot::Sub));
        assert_eq!("noise".parse::<MixerChannel>(), Ok(MixerChannel::Noise));
        assert_eq!("osc3".parse::<MixerChannel>(), Ok(MixerChannel::Osc3));
        let err = "lfo".parse::<MixerChannel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown mixer channel 'lfo'");
    }
}
