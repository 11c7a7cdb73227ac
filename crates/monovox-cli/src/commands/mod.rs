//! CLI command implementations.

pub mod common;
pub mod devices;
pub mod keys;
pub mod play;
