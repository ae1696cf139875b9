//! Centralized error handling for benchprof

use std::io;
use thiserror::Error;

/// Errors raised by the command helpers.
///
/// Probe methods never surface these to callers: every failure inside a probe
/// is converted locally into field absence.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// I/O errors (file reading, command execution)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A tool ran but reported failure
    #[error("detection error: {0}")]
    Detection(String),
}

/// Type alias for Results in benchprof
pub type Result<T> = std::result::Result<T, ProfileError>;
