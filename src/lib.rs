//! talkback - voice assistant pipeline
//!
//! Speech in, spoken reply out: WAV input is normalized to mono 16kHz,
//! transcribed, answered with one single-turn model request, and the reply
//! synthesized back into a WAV file.

// Error handling discipline: propagate, never panic in library paths
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod capability;
pub mod config;
pub mod defaults;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;

// Core traits (decode → generate → speak)
pub use llm::generator::{ChatModel, ConversationTurn, ResponseGenerator};
pub use stt::transcriber::{Segment, SegmentDecoder, SpeechTranscriber};
pub use tts::synthesizer::{SpeechSynthesizer, SynthesisChunk, Voice};

// Pipeline
pub use pipeline::{Assistant, PipelineOutput, Stage};

// Audio plumbing
pub use audio::{resample, AudioBuffer};
pub use capability::{select_profile, CapabilityProfile};

// Error handling
pub use error::{Result, TalkbackError};

// Config
pub use config::Config;
