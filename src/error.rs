//! Error types for talkback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalkbackError {
    // Construction-time errors: fatal, never deferred to inference time
    #[error("{role} model not found at {path}")]
    ModelNotFound { role: &'static str, path: String },

    // Audio decoding errors
    #[error("Unsupported audio format: {message}")]
    UnsupportedAudioFormat { message: String },

    // Per-request stage errors
    #[error("Transcription failed: {message}")]
    TranscriptionFailed { message: String },

    #[error("Generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("Synthesis failed: {message}")]
    SynthesisFailed { message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TalkbackError>;
