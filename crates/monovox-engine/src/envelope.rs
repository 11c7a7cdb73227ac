//! ADSR envelopes as scheduled ramp segments.
//!
//! Envelopes are not run sample by sample. Each note-on computes the attack
//! and decay segments once, anchored at the note's start time, and hands them
//! to the backend as automation on the VCA gain and the filter cutoff. Each
//! note-off computes a single release segment anchored at the live value.
//!
//! ```text
//!  peak ─┐      ╱╲
//!        │     ╱  ╲
//!  sus  ─┤    ╱    ╲________________
//!        │   ╱                      ╲
//!  start─┤  ╱                        ╲___ floor
//!        └──┴──────┴──────────────┴──────┴──→ time
//!           t0  A   D   (sustain)  off  R
//! ```
//!
//! Amplitude ramps are linear up and exponential down to a small silence
//! floor. Filter ramps are exponential throughout and return to the base
//! cutoff on release.

use monovox_core::graph::{NodeId, ParamKind};

use crate::backend::{AudioGraphBackend, BackendError};
use crate::config::EngineConfig;

/// User-facing ADSR settings.
///
/// Times are in seconds; `sustain` is a level fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSpec {
    /// Attack time.
    pub attack: f32,
    /// Decay time.
    pub decay: f32,
    /// Sustain level as a fraction of the peak excursion.
    pub sustain: f32,
    /// Release time.
    pub release: f32,
}

impl EnvelopeSpec {
    /// Build a spec, clamping times to zero or more and sustain to `[0, 1]`.
    ///
    /// Returns `None` if any value is NaN or infinite.
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Option<Self> {
        if ![attack, decay, sustain, release].iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        })
    }
}

/// Interpolation of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    /// Straight line.
    Linear,
    /// Constant ratio; both ends must be positive.
    Exponential,
}

/// One ramp, starting where the previous segment ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Interpolation.
    pub shape: RampShape,
    /// Value reached at `end_time`.
    pub target: f32,
    /// Absolute end time in seconds.
    pub end_time: f64,
}

/// A run of segments anchored at `(start_time, start_value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopePlan {
    /// Anchor time.
    pub start_time: f64,
    /// Value at the anchor.
    pub start_value: f32,
    /// Segments in order.
    pub segments: Vec<Segment>,
}

impl EnvelopePlan {
    /// Time the last segment completes.
    pub fn end_time(&self) -> f64 {
        self.segments
            .last()
            .map_or(self.start_time, |segment| segment.end_time)
    }

    /// Value held once the plan completes.
    pub fn final_value(&self) -> f32 {
        self.segments
            .last()
            .map_or(self.start_value, |segment| segment.target)
    }

    /// Replace whatever is scheduled on `param` from the anchor onward.
    ///
    /// Cancels pending events at or after the anchor, pins the anchor value,
    /// then schedules each segment.
    pub fn install<B: AudioGraphBackend + ?Sized>(
        &self,
        backend: &mut B,
        node: NodeId,
        param: ParamKind,
    ) -> Result<(), BackendError> {
        backend.cancel_scheduled_values(node, param, self.start_time)?;
        backend.set_value_at_time(node, param, self.start_value, self.start_time)?;
        for segment in &self.segments {
            match segment.shape {
                RampShape::Linear => backend.linear_ramp_to_value_at_time(
                    node,
                    param,
                    segment.target,
                    segment.end_time,
                )?,
                RampShape::Exponential => backend.exponential_ramp_to_value_at_time(
                    node,
                    param,
                    segment.target,
                    segment.end_time,
                )?,
            }
        }
        Ok(())
    }
}

/// Computes envelope plans from [`EnvelopeSpec`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeScheduler {
    amp_attack_floor: f64,
    filter_attack_floor: f64,
    release_floor: f64,
    silence_floor: f32,
    freq_floor: f32,
    freq_ceiling: f32,
    contour_scale: f32,
}

impl EnvelopeScheduler {
    /// Scheduler using the floors and scaling from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            amp_attack_floor: config.amp_attack_floor,
            filter_attack_floor: config.filter_attack_floor,
            release_floor: config.release_floor,
            silence_floor: config.silence_floor,
            freq_floor: config.filter_floor_hz,
            freq_ceiling: config.filter_ceiling_hz,
            contour_scale: config.contour_scale,
        }
    }

    /// Release time after flooring.
    pub fn release_duration(&self, spec: &EnvelopeSpec) -> f64 {
        f64::from(spec.release).max(self.release_floor)
    }

    /// Filter envelope peak for a base cutoff and panel contour amount.
    pub fn filter_peak(&self, base_hz: f32, contour: f32) -> f32 {
        (base_hz + contour * self.contour_scale)
            .min(self.freq_ceiling)
            .max(self.freq_floor)
    }

    /// Filter sustain frequency between `base_hz` and `peak_hz`.
    pub fn filter_sustain(&self, base_hz: f32, peak_hz: f32, sustain: f32) -> f32 {
        (base_hz + (peak_hz - base_hz) * sustain).max(self.freq_floor)
    }

    /// Attack and decay for the VCA.
    ///
    /// Starts from `start_value` (the live gain, so a retrigger never jumps),
    /// rises linearly to `peak_gain`, then falls linearly to
    /// `peak_gain * sustain`.
    pub fn amplitude(
        &self,
        spec: &EnvelopeSpec,
        peak_gain: f32,
        start_value: f32,
        t0: f64,
    ) -> EnvelopePlan {
        let attack_end = t0 + f64::from(spec.attack).max(self.amp_attack_floor);
        let decay_end = attack_end + f64::from(spec.decay);
        EnvelopePlan {
            start_time: t0,
            start_value,
            segments: vec![
                Segment {
                    shape: RampShape::Linear,
                    target: peak_gain,
                    end_time: attack_end,
                },
                Segment {
                    shape: RampShape::Linear,
                    target: peak_gain * spec.sustain,
                    end_time: decay_end,
                },
            ],
        }
    }

    /// Attack and decay for the filter cutoff.
    ///
    /// Starts from the base cutoff, rises exponentially to the contour peak,
    /// then falls exponentially to the sustain frequency.
    pub fn filter(&self, spec: &EnvelopeSpec, base_hz: f32, contour: f32, t0: f64) -> EnvelopePlan {
        let base = base_hz.max(self.freq_floor);
        let peak = self.filter_peak(base, contour);
        let sustain = self.filter_sustain(base, peak, spec.sustain);
        let attack_end = t0 + f64::from(spec.attack).max(self.filter_attack_floor);
        let decay_end = attack_end + f64::from(spec.decay);
        EnvelopePlan {
            start_time: t0,
            start_value: base,
            segments: vec![
                Segment {
                    shape: RampShape::Exponential,
                    target: peak,
                    end_time: attack_end,
                },
                Segment {
                    shape: RampShape::Exponential,
                    target: sustain,
                    end_time: decay_end,
                },
            ],
        }
    }

    /// Release for the VCA, from the live gain toward silence.
    pub fn amplitude_release(&self, spec: &EnvelopeSpec, live_value: f32, t0: f64) -> EnvelopePlan {
        EnvelopePlan {
            start_time: t0,
            start_value: live_value,
            segments: vec![Segment {
                shape: RampShape::Exponential,
                target: self.silence_floor,
                end_time: t0 + self.release_duration(spec),
            }],
        }
    }

    /// Release for the filter, from the live cutoff back to the base cutoff.
    pub fn filter_release(
        &self,
        spec: &EnvelopeSpec,
        live_hz: f32,
        base_hz: f32,
        t0: f64,
    ) -> EnvelopePlan {
        EnvelopePlan {
            start_time: t0,
            start_value: live_hz,
            segments: vec![Segment {
                shape: RampShape::Exponential,
                target: base_hz.max(self.freq_floor),
                end_time: t0 + self.release_duration(spec),
            }],
        }
    }
}

impl Default for EnvelopeScheduler {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
