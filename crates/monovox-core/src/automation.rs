//! Scheduled parameter trajectories.
//!
//! Every automatable parameter in the audio graph (oscillator frequency, gain,
//! filter cutoff, ...) owns a [`ParamTimeline`]: an ordered list of
//! [`AutomationEvent`]s anchored at absolute times in seconds. The control side
//! writes events, the render side evaluates them with [`ParamTimeline::value_at`].
//!
//! ## Event Semantics
//!
//! ```text
//!   value
//!     │            ExponentialRamp
//!     │          ╱‾‾‾‾‾‾╲  LinearRamp
//!     │         ╱        ╲______________  SetTarget (approach)
//!     │  ______╱                        ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾───
//!     │ SetValue
//!     └──────────────────────────────────────────────────────→ time
//! ```
//!
//! - `SetValue` jumps to a value at its time and holds it.
//! - `LinearRamp` / `ExponentialRamp` start at the time and value of the
//!   previous event and reach their value at `end_time`.
//! - `SetTarget` approaches `target` exponentially from `start_time` with the
//!   given time constant (63% of the distance after one time constant).
//!
//! Events with equal times keep the order in which they were inserted.
//! [`ParamTimeline::cancel_scheduled_values`] removes every event at or after
//! a time, which is how envelopes pre-empt each other.

use thiserror::Error;

/// Errors raised when an automation event is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TimelineError {
    /// Event time was negative, NaN, or infinite.
    #[error("automation time must be finite and non-negative, got {0}")]
    InvalidTime(f64),

    /// Event value was NaN or infinite.
    #[error("automation value must be finite, got {0}")]
    NonFiniteValue(f32),

    /// Exponential ramps cannot reach zero or cross sign.
    #[error("exponential ramp target must be positive, got {0}")]
    NonPositiveTarget(f32),

    /// `SetTarget` needs a strictly positive time constant.
    #[error("time constant must be positive, got {0}")]
    InvalidTimeConstant(f64),
}

/// One scheduled change on a parameter timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue {
        /// Absolute time in seconds.
        time: f64,
        /// Value held from `time` onwards.
        value: f32,
    },
    /// Straight-line ramp from the previous event to `value`.
    LinearRamp {
        /// Time at which `value` is reached.
        end_time: f64,
        /// Ramp destination.
        value: f32,
    },
    /// Constant-ratio ramp from the previous event to `value` (must be > 0).
    ExponentialRamp {
        /// Time at which `value` is reached.
        end_time: f64,
        /// Ramp destination.
        value: f32,
    },
    /// Exponential approach toward `target`, never quite arriving.
    SetTarget {
        /// Time at which the approach begins.
        start_time: f64,
        /// Asymptotic value.
        target: f32,
        /// Time constant in seconds.
        time_constant: f64,
    },
}

impl AutomationEvent {
    /// The time this event is ordered by (end time for ramps).
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. } => time,
            Self::LinearRamp { end_time, .. } | Self::ExponentialRamp { end_time, .. } => end_time,
            Self::SetTarget { start_time, .. } => start_time,
        }
    }

    /// Whether this event interpolates from the previous event.
    #[inline]
    pub fn is_ramp(&self) -> bool {
        matches!(self, Self::LinearRamp { .. } | Self::ExponentialRamp { .. })
    }

    fn validate(&self) -> Result<(), TimelineError> {
        let time = self.time();
        if !time.is_finite() || time < 0.0 {
            return Err(TimelineError::InvalidTime(time));
        }
        match *self {
            Self::SetValue { value, .. } | Self::LinearRamp { value, .. } => {
                if !value.is_finite() {
                    return Err(TimelineError::NonFiniteValue(value));
                }
            }
            Self::ExponentialRamp { value, .. } => {
                if !value.is_finite() {
                    return Err(TimelineError::NonFiniteValue(value));
                }
                if value <= 0.0 {
                    return Err(TimelineError::NonPositiveTarget(value));
                }
            }
            Self::SetTarget {
                target,
                time_constant,
                ..
            } => {
                if !target.is_finite() {
                    return Err(TimelineError::NonFiniteValue(target));
                }
                if !time_constant.is_finite() || time_constant <= 0.0 {
                    return Err(TimelineError::InvalidTimeConstant(time_constant));
                }
            }
        }
        Ok(())
    }
}

/// Shape of the curve that follows an anchor point.
#[derive(Debug, Clone, Copy)]
enum Curve {
    Hold,
    Approach { target: f32, time_constant: f64 },
}

/// A known (time, value) point plus the curve leaving it.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    time: f64,
    value: f32,
    curve: Curve,
}

impl Anchor {
    fn hold(time: f64, value: f32) -> Self {
        Self {
            time,
            value,
            curve: Curve::Hold,
        }
    }

    fn value_at(&self, time: f64) -> f32 {
        match self.curve {
            Curve::Hold => self.value,
            Curve::Approach {
                target,
                time_constant,
            } => {
                let elapsed = (time - self.time).max(0.0);
                let remaining = (-elapsed / time_constant).exp();
                (f64::from(target) + f64::from(self.value - target) * remaining) as f32
            }
        }
    }
}

/// Evaluate a ramp event that started at `(start_time, start_value)`.
fn ramp_value(event: &AutomationEvent, start_time: f64, start_value: f32, time: f64) -> f32 {
    let (end_time, end_value, exponential) = match *event {
        AutomationEvent::LinearRamp { end_time, value } => (end_time, value, false),
        AutomationEvent::ExponentialRamp { end_time, value } => (end_time, value, true),
        _ => return start_value,
    };

    let span = end_time - start_time;
    if span <= 0.0 || time >= end_time {
        return end_value;
    }
    let progress = ((time - start_time) / span).clamp(0.0, 1.0);
    let (v0, v1) = (f64::from(start_value), f64::from(end_value));

    if exponential {
        // A ratio ramp is undefined through zero; hold until the end instead.
        if v0 <= 0.0 {
            return start_value;
        }
        (v0 * (v1 / v0).powf(progress)) as f32
    } else {
        (v0 + (v1 - v0) * progress) as f32
    }
}

/// The scheduled trajectory of a single parameter.
///
/// # Example
///
/// ```rust
/// use monovox_core::ParamTimeline;
///
/// let mut gain = ParamTimeline::new(0.0);
/// gain.set_value_at_time(0.0, 1.0).unwrap();
/// gain.linear_ramp_to_value_at_time(1.0, 2.0).unwrap();
///
/// assert!((gain.value_at(1.5) - 0.5).abs() < 1e-6);
/// assert_eq!(gain.value_at(3.0), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    initial: f32,
    events: Vec<AutomationEvent>,
}

impl ParamTimeline {
    /// Create a timeline that holds `initial` until the first event.
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Value before any event applies.
    pub fn initial(&self) -> f32 {
        self.initial
    }

    /// Scheduled events in evaluation order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Time of the latest scheduled event, if any.
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(AutomationEvent::time)
    }

    /// Insert an event, keeping events ordered by time.
    pub fn insert(&mut self, event: AutomationEvent) -> Result<(), TimelineError> {
        event.validate()?;
        let time = event.time();
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
        Ok(())
    }

    /// Schedule a jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<(), TimelineError> {
        self.insert(AutomationEvent::SetValue { time, value })
    }

    /// Schedule a linear ramp reaching `value` at `end_time`.
    pub fn linear_ramp_to_value_at_time(
        &mut self,
        value: f32,
        end_time: f64,
    ) -> Result<(), TimelineError> {
        self.insert(AutomationEvent::LinearRamp { end_time, value })
    }

    /// Schedule an exponential ramp reaching `value` (> 0) at `end_time`.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f32,
        end_time: f64,
    ) -> Result<(), TimelineError> {
        self.insert(AutomationEvent::ExponentialRamp { end_time, value })
    }

    /// Schedule an exponential approach toward `target` starting at `start_time`.
    pub fn set_target_at_time(
        &mut self,
        target: f32,
        start_time: f64,
        time_constant: f64,
    ) -> Result<(), TimelineError> {
        self.insert(AutomationEvent::SetTarget {
            start_time,
            target,
            time_constant,
        })
    }

    /// Drop every event whose time is at or after `from`.
    ///
    /// A ramp that is in progress at `from` ends after it and is removed too,
    /// so callers that want continuity should read [`value_at`](Self::value_at)
    /// first and re-anchor with [`set_value_at_time`](Self::set_value_at_time).
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.events.retain(|e| e.time() < from);
    }

    /// Evaluate the timeline at `time`.
    ///
    /// A `SetTarget` that starts inside a running ramp begins from that ramp's
    /// value, so inserting one never makes the parameter jump.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut anchor = Anchor::hold(0.0, self.initial);

        for (index, event) in self.events.iter().enumerate() {
            match *event {
                AutomationEvent::SetValue { time: at, value } => {
                    if at > time {
                        break;
                    }
                    anchor = Anchor::hold(at, value);
                }
                AutomationEvent::SetTarget {
                    start_time,
                    target,
                    time_constant,
                } => {
                    if start_time > time {
                        break;
                    }
                    let start_value = match self.events.get(index + 1) {
                        Some(next) if next.is_ramp() => {
                            ramp_value(next, anchor.time, anchor.value, start_time)
                        }
                        _ => anchor.value_at(start_time),
                    };
                    anchor = Anchor {
                        time: start_time,
                        value: start_value,
                        curve: Curve::Approach {
                            target,
                            time_constant,
                        },
                    };
                }
                AutomationEvent::LinearRamp { end_time, value }
                | AutomationEvent::ExponentialRamp { end_time, value } => {
                    if end_time <= time {
                        anchor = Anchor::hold(end_time, value);
                    } else {
                        return ramp_value(event, anchor.time, anchor.value, time);
                    }
                }
            }
        }

        anchor.value_at(time)
    }

    /// Collapse events that lie entirely before `time` into a single anchor.
    ///
    /// Evaluation at or after `time` is unchanged. Never grows the event list,
    /// so it is safe to call from the render thread once per block.
    pub fn prune_before(&mut self, time: f64) {
        let elapsed = self.events.partition_point(|e| e.time() <= time);
        if elapsed < 2 {
            return;
        }

        let last = self.events[elapsed - 1];
        let last_time = last.time();
        let value = self.value_at(last_time);
        let anchor = AutomationEvent::SetValue {
            time: last_time,
            value,
        };

        if matches!(last, AutomationEvent::SetTarget { .. }) {
            self.events.splice(..elapsed, [anchor, last]);
        } else {
            self.events.splice(..elapsed, [anchor]);
        }
    }

    /// Remove every event and reset the resting value.
    pub fn reset(&mut self, value: f32) {
        self.initial = value;
        self.events.clear();
    }
}

impl Default for ParamTimeline {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn holds_initial_value_without_events() {
        let timeline = ParamTimeline::new(0.25);
        assert_eq!(timeline.value_at(0.0), 0.25);
        assert_eq!(timeline.value_at(100.0), 0.25);
    }

    #[test]
    fn set_value_takes_effect_at_its_time() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(1.0, 0.5).unwrap();
        assert_eq!(timeline.value_at(0.49), 0.0);
        assert_eq!(timeline.value_at(0.5), 1.0);
    }

    #[test]
    fn linear_ramp_interpolates_from_previous_event() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 1.0).unwrap();
        timeline.linear_ramp_to_value_at_time(1.0, 2.0).unwrap();

        assert!(approx(timeline.value_at(1.0), 0.0, 1e-6));
        assert!(approx(timeline.value_at(1.25), 0.25, 1e-6));
        assert!(approx(timeline.value_at(2.0), 1.0, 1e-6));
        assert!(approx(timeline.value_at(5.0), 1.0, 1e-6));
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let mut timeline = ParamTimeline::new(100.0);
        timeline.set_value_at_time(100.0, 0.0).unwrap();
        timeline.exponential_ramp_to_value_at_time(400.0, 2.0).unwrap();

        // Halfway in time is the geometric mean.
        assert!(approx(timeline.value_at(1.0), 200.0, 1e-3));
    }

    #[test]
    fn exponential_ramp_rejects_non_positive_target() {
        let mut timeline = ParamTimeline::new(1.0);
        assert_eq!(
            timeline.exponential_ramp_to_value_at_time(0.0, 1.0),
            Err(TimelineError::NonPositiveTarget(0.0))
        );
        assert!(timeline.events().is_empty());
    }

    #[test]
    fn exponential_ramp_from_zero_holds_until_end() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.exponential_ramp_to_value_at_time(1.0, 1.0).unwrap();
        assert_eq!(timeline.value_at(0.5), 0.0);
        assert_eq!(timeline.value_at(1.0), 1.0);
    }

    #[test]
    fn set_target_approaches_exponentially() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_target_at_time(1.0, 0.0, 0.1).unwrap();

        let one_tau = timeline.value_at(0.1);
        assert!(approx(one_tau, 1.0 - (-1.0f32).exp(), 1e-4), "got {one_tau}");
        assert!(timeline.value_at(1.0) > 0.9999);
    }

    #[test]
    fn set_target_inside_a_ramp_starts_from_ramp_value() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 0.0).unwrap();
        timeline.linear_ramp_to_value_at_time(1.0, 1.0).unwrap();
        let before = timeline.value_at(0.5);

        timeline.set_target_at_time(0.2, 0.5, 0.1).unwrap();
        let after = timeline.value_at(0.5);

        assert!(approx(before, after, 1e-6), "{before} vs {after}");
        // The ramp still completes.
        assert!(approx(timeline.value_at(1.0), 1.0, 1e-6));
    }

    #[test]
    fn cancel_removes_events_at_or_after_time() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.5, 0.0).unwrap();
        timeline.linear_ramp_to_value_at_time(1.0, 1.0).unwrap();
        timeline.linear_ramp_to_value_at_time(0.2, 2.0).unwrap();

        timeline.cancel_scheduled_values(0.5);
        assert_eq!(timeline.events().len(), 1);
        assert_eq!(timeline.value_at(1.5), 0.5);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(1.0, 1.0).unwrap();
        timeline.set_value_at_time(2.0, 1.0).unwrap();
        assert_eq!(timeline.value_at(1.0), 2.0);
    }

    #[test]
    fn invalid_events_are_rejected() {
        let mut timeline = ParamTimeline::new(0.0);
        assert!(matches!(
            timeline.set_value_at_time(1.0, -1.0),
            Err(TimelineError::InvalidTime(_))
        ));
        assert!(matches!(
            timeline.set_value_at_time(f32::NAN, 0.0),
            Err(TimelineError::NonFiniteValue(_))
        ));
        assert!(matches!(
            timeline.set_target_at_time(1.0, 0.0, 0.0),
            Err(TimelineError::InvalidTimeConstant(_))
        ));
    }

    #[test]
    fn prune_preserves_future_values() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 0.0).unwrap();
        timeline.linear_ramp_to_value_at_time(1.0, 0.01).unwrap();
        timeline.linear_ramp_to_value_at_time(0.8, 0.41).unwrap();
        timeline.set_target_at_time(0.5, 0.6, 0.1).unwrap();
        timeline.exponential_ramp_to_value_at_time(0.0001, 2.0).unwrap();

        let probes = [0.6, 0.7, 1.0, 1.5, 2.0, 3.0];
        let before: Vec<f32> = probes.iter().map(|&t| timeline.value_at(t)).collect();

        timeline.prune_before(0.6);
        assert!(timeline.events().len() <= 3);

        for (&t, &expected) in probes.iter().zip(&before) {
            let got = timeline.value_at(t);
            assert!(approx(got, expected, 1e-5), "t={t}: {got} vs {expected}");
        }
    }
}
