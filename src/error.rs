//! Error types for the vocalink pipeline

use thiserror::Error;

/// Result type alias for vocalink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture or playback device unavailable, fatal to the current session
    #[error("device error: {0}")]
    Device(String),

    /// Audio encode/decode error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text engine error, recovered locally by skipping the segment
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech engine error, recovered locally by skipping the sentence
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
