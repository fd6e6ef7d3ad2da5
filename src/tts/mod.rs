//! Speech synthesis.

pub mod piper;
pub mod synthesizer;

pub use piper::{PiperConfig, PiperVoice};
pub use synthesizer::{ChunkStream, SpeechSynthesizer, SynthesisChunk, Voice};
