//! Pitch conversions: key indices, MIDI notes, octaves, and cents.
//!
//! The keyboard reports zero-based key indices. Key 0 sits at MIDI note 36
//! (C2, two octaves below middle C); tuning is 12-tone equal temperament with
//! A4 = MIDI 69 = 440 Hz.

/// MIDI note that key index 0 maps to.
pub const KEY_ZERO_MIDI: i32 = 36;

/// Reference pitch for MIDI note 69.
pub const A4_HZ: f32 = 440.0;

/// Convert a (possibly fractional) MIDI note number to frequency in Hz.
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    A4_HZ * libm::exp2f((note - 69.0) / 12.0)
}

/// Convert a zero-based key index to its fundamental frequency.
///
/// Any integer is accepted, including negative indices.
///
/// ```rust
/// use monovox_core::pitch::key_to_freq;
///
/// assert!((key_to_freq(33) - 440.0).abs() < 1e-3);
/// assert!((key_to_freq(21) - 220.0).abs() < 1e-3);
/// ```
#[inline]
pub fn key_to_freq(key: i32) -> f32 {
    key_to_freq_from(key, KEY_ZERO_MIDI)
}

/// Like [`key_to_freq`] with a custom MIDI note for key 0.
#[inline]
pub fn key_to_freq_from(key: i32, key_zero_midi: i32) -> f32 {
    midi_to_freq((i64::from(key) + i64::from(key_zero_midi)) as f32)
}

/// Frequency multiplier for an octave offset (`2^octaves`).
#[inline]
pub fn octave_ratio(octaves: i32) -> f32 {
    libm::exp2f(octaves as f32)
}

/// Frequency multiplier for a detune in cents (`2^(cents/1200)`).
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    libm::exp2f(cents / 1200.0)
}
