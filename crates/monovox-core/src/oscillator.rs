//! Band-limited oscillator used by the graph renderer.
//!
//! Non-sinusoidal shapes are corrected with 4th-order PolyBLEP (Polynomial
//! Band-Limited Step) around their discontinuities.

use core::f32::consts::PI;
use core::fmt;
use core::str::FromStr;
use libm::{floorf, sinf};
use thiserror::Error;

#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * floorf(a / b);
    if r < 0.0 { r + b } else { r }
}

/// Oscillator waveform selectable per slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Pure fundamental.
    Sine,
    /// Odd harmonics, softer than saw.
    Triangle,
    /// All harmonics, bright.
    #[default]
    Sawtooth,
    /// 50% duty, odd harmonics, hollow.
    Square,
    /// Accepted for patches but rendered as [`Waveform::Square`].
    Pulse,
}

impl Waveform {
    /// All waveforms in panel order.
    pub const ALL: [Waveform; 5] = [
        Self::Sine,
        Self::Triangle,
        Self::Sawtooth,
        Self::Square,
        Self::Pulse,
    ];

    /// Shape the renderer actually produces.
    #[inline]
    pub fn rendered(self) -> Self {
        match self {
            Self::Pulse => Self::Square,
            other => other,
        }
    }

    /// Lowercase identifier used in config files and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Sawtooth => "sawtooth",
            Self::Square => "square",
            Self::Pulse => "pulse",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a waveform name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown waveform '{0}' (expected sine, triangle, sawtooth, square or pulse)")]
pub struct ParseWaveformError(pub String);

impl FromStr for Waveform {
    type Err = ParseWaveformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Self::Sine),
            "triangle" | "tri" => Ok(Self::Triangle),
            "sawtooth" | "saw" => Ok(Self::Sawtooth),
            "square" | "sqr" => Ok(Self::Square),
            "pulse" => Ok(Self::Pulse),
            _ => Err(ParseWaveformError(s.to_string())),
        }
    }
}

/// Audio-rate oscillator with PolyBLEP anti-aliasing.
///
/// Frequency may change every sample; the renderer feeds it the automated
/// value before each call to [`advance`](Self::advance).
///
/// # Example
///
/// ```rust
/// use monovox_core::{Oscillator, Waveform};
///
/// let mut osc = Oscillator::new(48000.0, Waveform::Sawtooth);
/// osc.set_frequency(440.0);
/// let sample = osc.advance();
/// assert!(sample.abs() <= 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: Waveform,
    /// Leaky integrator state for the triangle
    prev_output: f32,
}

impl Oscillator {
    /// Create an oscillator at 440 Hz.
    pub fn new(sample_rate: f32, waveform: Waveform) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform,
            prev_output: 0.0,
        }
    }

    /// Set frequency in Hz, clamped to `[0, Nyquist]`. NaN is treated as
    /// zero.
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        let nyquist = self.sample_rate * 0.5;
        self.frequency = if freq_hz.is_nan() {
            0.0
        } else {
            freq_hz.clamp(0.0, nyquist)
        };
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Switch waveform without resetting phase.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform as configured (not as rendered).
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase and integrator state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.prev_output = 0.0;
    }

    /// Generate the next sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = self.generate(self.phase, self.phase_inc);
        self.phase = rem_euclid_f32(self.phase + self.phase_inc, 1.0);
        output
    }

    #[inline]
    fn generate(&mut self, phase: f32, dt: f32) -> f32 {
        match self.waveform.rendered() {
            Waveform::Sine => sinf(phase * 2.0 * PI),

            Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),

            Waveform::Triangle => {
                // Integrated band-limited square; the leak keeps DC bounded.
                let square = if phase < 0.5 { 1.0 } else { -1.0 };
                let blep_square =
                    square + poly_blep(phase, dt) - poly_blep(rem_euclid_f32(phase + 0.5, 1.0), dt);
                let leak = 1.0 - (self.frequency / self.sample_rate).min(0.1);
                self.prev_output = leak * self.prev_output + blep_square * dt * 4.0;
                self.prev_output
            }

            Waveform::Square | Waveform::Pulse => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, dt) - poly_blep(rem_euclid_f32(phase + 0.5, 1.0), dt)
            }
        }
    }
}

/// 4th-order PolyBLEP correction, two samples either side of a step.
///
/// Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    //   p1(n) = A4 n^4 + A3 n^3 + A2 n^2 + A0   for n in [0,1)
    //   p2(n) = C (2-n)^4                       for n in [1,2)
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    if dt <= 0.0 {
        return 0.0;
    }
    let dt2 = 2.0 * dt;
    let piece = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };
    if t < dt2 {
        piece(t / dt)
    } else if t > 1.0 - dt2 {
        -piece((1.0 - t) / dt)
    } else {
        0.0
    }
}
