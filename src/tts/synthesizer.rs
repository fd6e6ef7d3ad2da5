use crate::error::{Result, TalkbackError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A raw audio chunk emitted by streaming synthesis: 16-bit mono samples
/// at the voice's native rate. Playback order equals emission order.
pub type SynthesisChunk = Vec<i16>;

/// A finite, non-restartable sequence of synthesis chunks.
///
/// Every call produces a fresh stream; chunk boundaries are defined by the
/// voice, not by the caller.
pub type ChunkStream = Box<dyn Iterator<Item = Result<SynthesisChunk>> + Send>;

/// Trait for synthesis voices.
///
/// This trait allows swapping implementations (real Piper vs mock).
pub trait Voice: Send + Sync {
    /// The voice's native output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Synthesize text into a lazy chunk stream.
    fn speak(&self, text: &str) -> Result<ChunkStream>;

    /// Get the name of the loaded voice
    fn voice_name(&self) -> &str;
}

/// Implement Voice for Arc<T> to allow sharing across requests.
impl<T: Voice> Voice for Arc<T> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn speak(&self, text: &str) -> Result<ChunkStream> {
        (**self).speak(text)
    }

    fn voice_name(&self) -> &str {
        (**self).voice_name()
    }
}

/// Synthesizes reply text into audio.
///
/// The file path (batch) contract writes a mono 16-bit PCM WAV at the
/// voice's native rate; no resampling is applied on this path. Callers
/// needing a different rate apply [`crate::audio::resample`] themselves.
pub struct SpeechSynthesizer<V: Voice> {
    voice: V,
}

impl<V: Voice> SpeechSynthesizer<V> {
    pub fn new(voice: V) -> Self {
        Self { voice }
    }

    /// The wrapped voice's native sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.voice.sample_rate()
    }

    /// Synthesize `text` into a WAV file at `out_path`.
    ///
    /// Chunks are appended in emission order and flushed as they arrive.
    /// On a mid-stream voice failure the error propagates, but samples
    /// already written are not rolled back: the file exists truncated.
    /// Callers must treat the path as valid only on `Ok`.
    pub fn synthesize(&self, text: &str, out_path: &Path) -> Result<PathBuf> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.voice.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(out_path, spec).map_err(|e| {
            TalkbackError::SynthesisFailed {
                message: format!("failed to create output WAV: {}", e),
            }
        })?;

        let synth_err = |e: hound::Error| TalkbackError::SynthesisFailed {
            message: format!("failed to write output WAV: {}", e),
        };

        for chunk in self.voice.speak(text)? {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Keep whatever was already written readable
                    writer.flush().map_err(synth_err)?;
                    return Err(e);
                }
            };
            for sample in chunk {
                writer.write_sample(sample).map_err(synth_err)?;
            }
            writer.flush().map_err(synth_err)?;
        }

        writer.finalize().map_err(synth_err)?;
        tracing::debug!(path = %out_path.display(), "reply audio written");
        Ok(out_path.to_path_buf())
    }

    /// Synthesize `text` into a lazy chunk stream for incremental playback.
    ///
    /// Each call produces a fresh, finite, non-restartable stream.
    pub fn synthesize_stream(&self, text: &str) -> Result<ChunkStream> {
        self.voice.speak(text)
    }
}

/// Mock voice for testing
#[derive(Debug)]
pub struct MockVoice {
    voice_name: String,
    sample_rate: u32,
    chunks: Vec<SynthesisChunk>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl MockVoice {
    /// Create a new mock voice emitting one short chunk at 22.05kHz.
    pub fn new(voice_name: &str) -> Self {
        Self {
            voice_name: voice_name.to_string(),
            sample_rate: 22050,
            chunks: vec![vec![0i16; 220]],
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the native sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the chunks every speak call emits.
    pub fn with_chunks(mut self, chunks: Vec<SynthesisChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    /// Configure the stream to fail after emitting `n` chunks.
    pub fn with_failure_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Number of speak invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Voice for MockVoice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speak(&self, _text: &str) -> Result<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let emitted: Vec<Result<SynthesisChunk>> = match self.fail_after {
            Some(n) => self
                .chunks
                .iter()
                .take(n)
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(TalkbackError::SynthesisFailed {
                    message: "mock voice failure mid-stream".to_string(),
                })))
                .collect(),
            None => self.chunks.iter().cloned().map(Ok).collect(),
        };
        Ok(Box::new(emitted.into_iter()))
    }

    fn voice_name(&self) -> &str {
        &self.voice_name
    }
}
