//! Error types for configuration loading and audio input.
//!
//! The analysis core itself never fails: silence, empty spectra and
//! below-threshold signals all degrade to neutral values. Only the edges
//! that touch the outside world (files, devices) return these errors.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading a tuning file failed
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tuning file is not valid TOML for the parameter schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Re-encoding a parameter table for overlaying failed
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// A parameter is out of its allowed range
    #[error("invalid parameter: {0}")]
    Invalid(String),

    /// Unknown preset or scene name
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
}

/// Audio input errors (microphone capture and WAV files)
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No default input device on the host
    #[error("no audio input device found")]
    NoInputDevice,

    /// Device reported a sample format we do not convert
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Querying the device configuration failed
    #[error("failed to query input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    /// Building the input stream failed
    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// Starting the input stream failed
    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// WAV decoding failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for audio input operations
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
