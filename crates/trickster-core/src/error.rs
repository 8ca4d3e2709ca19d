//! Error types for trickster-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trickster-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trickster-core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file or value error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An audio file could not be decoded
    #[error("Failed to decode {}: {reason}", path.display())]
    Decode {
        /// Path of the offending file
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Audio output error
    #[error("Audio error: {0}")]
    Audio(String),

    /// Servo, LED or button error
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// GPIO driver error
    #[cfg(feature = "gpio")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
