//! Engine tuning constants, loadable from TOML.
//!
//! Every timing floor and scaling factor the engine uses lives here so it can
//! be calibrated without touching code. Missing keys fall back to the
//! defaults below.
//!
//! # TOML Format
//!
//! ```toml
//! amp_attack_floor = 0.005
//! filter_attack_floor = 0.005
//! release_floor = 0.01
//! stop_margin = 0.1
//! oscillator_smoothing = 0.05
//! mix_smoothing = 0.1
//! master_ramp = 0.1
//! contour_scale = 50.0
//! silence_floor = 0.0001
//! filter_floor_hz = 20.0
//! filter_ceiling_hz = 20000.0
//! key_zero_midi = 36
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field holds a value the engine cannot use
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid field error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Timing floors, smoothing constants, and scaling factors.
///
/// Times are in seconds, frequencies in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shortest amplitude attack.
    pub amp_attack_floor: f64,
    /// Shortest filter attack.
    pub filter_attack_floor: f64,
    /// Shortest release, for both envelopes.
    pub release_floor: f64,
    /// Extra time after the amplitude release before oscillators stop.
    pub stop_margin: f64,
    /// Time constant for live oscillator retuning.
    pub oscillator_smoothing: f64,
    /// Time constant for live mixer and filter changes.
    pub mix_smoothing: f64,
    /// Ramp time for a master volume change while a note is held.
    pub master_ramp: f64,
    /// Multiplier from the panel's contour amount to Hz.
    pub contour_scale: f32,
    /// Amplitude the release ramps down to.
    pub silence_floor: f32,
    /// Lowest frequency an exponential filter ramp may target.
    pub filter_floor_hz: f32,
    /// Highest filter envelope peak.
    pub filter_ceiling_hz: f32,
    /// MIDI note that keyboard key 0 plays.
    pub key_zero_midi: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            amp_attack_floor: 0.005,
            filter_attack_floor: 0.005,
            release_floor: 0.01,
            stop_margin: 0.1,
            oscillator_smoothing: 0.05,
            mix_smoothing: 0.1,
            master_ramp: 0.1,
            contour_scale: 50.0,
            silence_floor: 0.0001,
            filter_floor_hz: 20.0,
            filter_ceiling_hz: 20000.0,
            key_zero_midi: monovox_core::pitch::KEY_ZERO_MIDI,
        }
    }
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn positive_f32(field: &'static str, value: f32) -> Result<(), ConfigError> {
    positive_f64(field, f64::from(value))
}

impl EngineConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_f64("amp_attack_floor", self.amp_attack_floor)?;
        positive_f64("filter_attack_floor", self.filter_attack_floor)?;
        positive_f64("release_floor", self.release_floor)?;
        positive_f64("oscillator_smoothing", self.oscillator_smoothing)?;
        positive_f64("mix_smoothing", self.mix_smoothing)?;
        positive_f64("master_ramp", self.master_ramp)?;
        positive_f32("silence_floor", self.silence_floor)?;
        positive_f32("filter_floor_hz", self.filter_floor_hz)?;

        if !self.stop_margin.is_finite() || self.stop_margin < 0.0 {
            return Err(ConfigError::invalid(
                "stop_margin",
                format!("must be zero or more, got {}", self.stop_margin),
            ));
        }
        if !self.contour_scale.is_finite() {
            return Err(ConfigError::invalid("contour_scale", "must be finite"));
        }
        if !self.filter_ceiling_hz.is_finite() || self.filter_ceiling_hz <= self.filter_floor_hz {
            return Err(ConfigError::invalid(
                "filter_ceiling_hz",
                format!(
                    "must be above filter_floor_hz ({}), got {}",
                    self.filter_floor_hz, self.filter_ceiling_hz
                ),
            ));
        }
        if !(0..=127).contains(&self.key_zero_midi) {
            return Err(ConfigError::invalid(
                "key_zero_midi",
                format!("must be a MIDI note 0-127, got {}", self.key_zero_midi),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = EngineConfig::from_toml_str("contour_scale = 25.0\nstop_margin = 0.2\n").unwrap();
        assert_eq!(config.contour_scale, 25.0);
        assert_eq!(config.stop_margin, 0.2);
        assert_eq!(config.release_floor, 0.01);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = EngineConfig::default();
        config.key_zero_midi = 48;
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = EngineConfig::from_toml_str("release_floor = 0.0").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "release_floor", .. }),
            "got {err:?}"
        );

        let err = EngineConfig::from_toml_str("filter_ceiling_hz = 10.0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("filter_ceiling_hz"), "got: {msg}");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("stop_margin = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mix_smoothing = 0.2").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.mix_smoothing, 0.2);
    }

    #[test]
    fn missing_file_carries_path_and_source() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
        assert!(err.source().is_some());
    }
}
