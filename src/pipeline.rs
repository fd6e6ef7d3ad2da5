//! Voice assistant pipeline implementation.
//!
//! Orchestrates the complete per-request flow:
//! transcribe → generate → synthesize

use crate::error::Result;
use crate::llm::generator::{ChatModel, ResponseGenerator};
use crate::stt::transcriber::{SegmentDecoder, SpeechTranscriber};
use crate::tts::synthesizer::{SpeechSynthesizer, Voice};
use std::path::{Path, PathBuf};

/// Per-request pipeline state, logged at each transition.
///
/// Any stage can transition directly to `Error` (terminal); there is no
/// retry or rollback between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Transcribing,
    Generating,
    Synthesizing,
    Done,
    Error,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineOutput {
    /// Transcript of the input utterance; empty for silent input.
    pub transcript: String,
    /// Generated reply text.
    pub reply: String,
    /// Path to the synthesized reply audio, if any was produced.
    /// Cleanup of this file is the caller's responsibility.
    pub reply_audio: Option<PathBuf>,
}

/// The voice assistant pipeline: speech in, spoken reply out.
///
/// Holds the three model handles for the life of the process; they are
/// loaded once at construction and shared across all requests. The handles
/// are not proven safe for concurrent invocation — callers that accept
/// concurrent requests must serialize access to one `Assistant` (or use one
/// instance per worker). No locking beyond what the model wrappers need
/// internally is performed here, and no cancellation or timeout exists:
/// once a stage starts, `process` blocks until it completes or fails.
pub struct Assistant<D: SegmentDecoder, M: ChatModel, V: Voice> {
    transcriber: SpeechTranscriber<D>,
    generator: ResponseGenerator<M>,
    synthesizer: SpeechSynthesizer<V>,
}

impl<D: SegmentDecoder, M: ChatModel, V: Voice> Assistant<D, M, V> {
    /// Compose a pipeline from already-constructed stages.
    ///
    /// Constructors of the real stages validate their model artifacts, so
    /// an `Assistant` never exists partially initialized.
    pub fn new(
        transcriber: SpeechTranscriber<D>,
        generator: ResponseGenerator<M>,
        synthesizer: SpeechSynthesizer<V>,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
        }
    }

    /// Process one utterance through the full pipeline.
    ///
    /// An absent or empty path is an explicit no-op, not an error: the
    /// result is empty strings and no audio, with zero model invocations.
    ///
    /// Stages run strictly in sequence; each stage's full output is
    /// consumed before the next begins. One fresh temporary WAV file is
    /// allocated per invocation for the reply audio and is *not* deleted
    /// here — ownership of cleanup passes to the caller.
    ///
    /// On a stage failure the error propagates alone; outputs already
    /// computed by earlier stages are discarded. Callers needing partial
    /// results can invoke the public stages individually.
    pub fn process(&self, audio_path: Option<&Path>) -> Result<PipelineOutput> {
        let Some(path) = audio_path else {
            tracing::debug!("no input audio, skipping pipeline");
            return Ok(PipelineOutput::default());
        };
        if path.as_os_str().is_empty() {
            tracing::debug!("empty input path, skipping pipeline");
            return Ok(PipelineOutput::default());
        }

        let mut stage = Stage::Idle;
        match self.run_stages(path, &mut stage) {
            Ok(output) => Ok(output),
            Err(e) => {
                // Error is terminal; no retry, no rollback
                advance(&mut stage, Stage::Error);
                tracing::error!(error = %e, "pipeline failed");
                Err(e)
            }
        }
    }

    fn run_stages(&self, path: &Path, stage: &mut Stage) -> Result<PipelineOutput> {
        advance(stage, Stage::Transcribing);
        let transcript = self.transcriber.transcribe(path)?;

        // Empty transcript is legitimate; the reply is still generated
        advance(stage, Stage::Generating);
        let reply = self.generator.chat(&transcript)?;

        advance(stage, Stage::Synthesizing);
        let reply_path = allocate_reply_path()?;
        let reply_audio = self.synthesizer.synthesize(&reply, &reply_path)?;

        advance(stage, Stage::Done);
        Ok(PipelineOutput {
            transcript,
            reply,
            reply_audio: Some(reply_audio),
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::info!(from = ?*stage, to = ?next, "pipeline stage");
    *stage = next;
}

/// Allocate one fresh temp WAV path for a reply and keep it on disk.
fn allocate_reply_path() -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("talkback-reply-")
        .suffix(".wav")
        .tempfile()?;
    file.into_temp_path()
        .keep()
        .map_err(|e| crate::error::TalkbackError::Io(e.error))
}

#[cfg(all(feature = "whisper", feature = "llm", feature = "piper"))]
impl
    Assistant<
        crate::stt::whisper::WhisperDecoder,
        crate::llm::llama::LlamaChatModel,
        crate::tts::piper::PiperVoice,
    >
{
    /// Build the full pipeline from configuration, loading all three models.
    ///
    /// A missing model artifact fails here, at startup, never at inference
    /// time.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let decoder = crate::stt::whisper::WhisperDecoder::new(crate::stt::whisper::WhisperConfig {
            model_path: config.stt.model_path.clone(),
            language: config.stt.language.clone(),
            threads: config.stt.threads,
        })?;
        let model = crate::llm::llama::LlamaChatModel::load(crate::llm::llama::LlamaConfig {
            model_path: config.llm.model_path.clone(),
            tokenizer_path: config.llm.tokenizer_path.clone(),
        })?;
        let voice = crate::tts::piper::PiperVoice::load(crate::tts::piper::PiperConfig {
            voice_config_path: config.tts.voice_config_path.clone(),
        })?;

        Ok(Self::new(
            SpeechTranscriber::new(decoder),
            ResponseGenerator::new(model)
                .with_system_prompt(&config.llm.system_prompt)
                .with_max_tokens(config.llm.max_tokens)
                .with_temperature(config.llm.temperature),
            SpeechSynthesizer::new(voice),
        ))
    }
}
