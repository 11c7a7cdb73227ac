//! Second-order IIR section used for the voice lowpass.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf};

/// Biquad filter coefficients and state.
///
/// Direct Form I:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,

    /// (frequency, linear Q, sample rate) the coefficients were computed for
    design: Option<(f32, f32, f32)>,
}

impl Biquad {
    /// Passthrough biquad (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            design: None,
        }
    }

    /// Set raw coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
        self.design = None;
    }

    /// Configure as a lowpass, recomputing only when the design changed.
    ///
    /// `frequency` is clamped just below Nyquist and `q` to a small positive
    /// minimum so automation overshoot cannot make the section unstable.
    #[inline]
    pub fn set_lowpass(&mut self, frequency: f32, q: f32, sample_rate: f32) {
        let frequency = frequency.clamp(1.0, sample_rate * 0.49);
        let q = q.max(0.01);
        if self.design == Some((frequency, q, sample_rate)) {
            return;
        }
        let (b0, b1, b2, a0, a1, a2) = lowpass_coefficients(frequency, q, sample_rate);
        self.set_coefficients(b0, b1, b2, a0, a1, a2);
        self.design = Some((frequency, q, sample_rate));
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        // A non-finite sample would otherwise stay in the feedback path forever.
        if !output.is_finite() {
            self.clear();
            return 0.0;
        }

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Clear the delay lines, keeping coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// RBJ lowpass coefficients as `(b0, b1, b2, a0, a1, a2)`.
///
/// `q` is the linear quality factor (0.707 for Butterworth).
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// Convert a resonance given in dB to a linear Q (`10^(dB/20)`).
///
/// A value of 0 dB is a Q of 1.
#[inline]
pub fn q_from_db(q_db: f32) -> f32 {
    powf(10.0, q_db / 20.0)
}
