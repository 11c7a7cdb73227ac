//! Engine-level error type.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Errors surfaced by [`SynthEngine`](crate::SynthEngine) construction and
/// [`resume`](crate::SynthEngine::resume).
///
/// Note events and parameter setters never fail; backend trouble there is
/// logged and the worst outcome is silence.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The audio graph backend refused an operation.
    #[error("audio backend error: {0}")]
    Backend(#[from] BackendError),

    /// The engine configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
