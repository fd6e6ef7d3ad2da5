//! Speech-to-text transcription.

pub mod transcriber;
pub mod whisper;

pub use transcriber::{Segment, SegmentDecoder, SegmentStream, SpeechTranscriber};
pub use whisper::{WhisperConfig, WhisperDecoder};
