use crate::audio::resample::downmix_to_mono;
use crate::audio::{resample, AudioBuffer};
use crate::capability::{select_profile, CapabilityProfile};
use crate::defaults;
use crate::error::{Result, TalkbackError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A timed span of decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Start of the span, milliseconds from the beginning of the audio.
    pub start_ms: i64,
    /// End of the span, milliseconds from the beginning of the audio.
    pub end_ms: i64,
    /// Decoded text, possibly with surrounding whitespace.
    pub text: String,
}

/// A finite, single-pass sequence of segments.
///
/// Each decode call produces a fresh stream; streams are not restartable
/// and are consumed exactly once to build the transcript.
pub type SegmentStream = Box<dyn Iterator<Item = Segment> + Send>;

/// Trait for decoding normalized audio into timed text segments.
///
/// This trait allows swapping implementations (real Whisper vs mock).
/// Input is 16-bit PCM, mono, at [`defaults::SAMPLE_RATE`].
pub trait SegmentDecoder: Send + Sync {
    /// Decode audio samples into a lazy sequence of segments.
    ///
    /// An entirely silent input may yield an empty stream; that is not
    /// an error.
    fn decode(&self, audio: &[i16]) -> Result<SegmentStream>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;
}

/// Implement SegmentDecoder for Arc<T> to allow sharing across requests.
impl<T: SegmentDecoder> SegmentDecoder for Arc<T> {
    fn decode(&self, audio: &[i16]) -> Result<SegmentStream> {
        (**self).decode(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Transcribes a raw audio file into text.
///
/// Normalizes input to mono 16kHz via the resampler (always, regardless of
/// the source rate the caller believes it has), decodes into segments, and
/// joins the trimmed segment texts with single spaces in emission order.
pub struct SpeechTranscriber<D: SegmentDecoder> {
    decoder: D,
    profile: CapabilityProfile,
}

impl<D: SegmentDecoder> SpeechTranscriber<D> {
    /// Create a transcriber around a decoder.
    ///
    /// The capability profile is resolved here, once, and fixed for this
    /// instance's lifetime.
    pub fn new(decoder: D) -> Self {
        let profile = select_profile();
        tracing::info!(
            model = decoder.model_name(),
            profile = profile.label(),
            "transcriber ready"
        );
        Self { decoder, profile }
    }

    /// The device/precision profile this transcriber was built with.
    pub fn profile(&self) -> CapabilityProfile {
        self.profile
    }

    /// Transcribe a WAV file to text.
    ///
    /// Returns an empty string for silent or unintelligible input; that is
    /// a legitimate result, not an error.
    ///
    /// # Errors
    /// `UnsupportedAudioFormat` for unreadable containers,
    /// `TranscriptionFailed` if the decoder fails.
    pub fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let buffer = AudioBuffer::from_wav_path(audio_path)?;
        // The rate-match fast path can return stereo untouched, so the
        // downmix runs separately; it is the identity for mono input.
        let normalized = downmix_to_mono(&resample(&buffer, defaults::SAMPLE_RATE));
        let samples = normalized.to_i16_samples();

        tracing::debug!(
            path = %audio_path.display(),
            frames = samples.len(),
            "decoding normalized audio"
        );

        let segments = self.decoder.decode(&samples)?;
        let parts: Vec<String> = segments.map(|s| s.text.trim().to_string()).collect();
        Ok(parts.join(" "))
    }
}

/// Mock decoder for testing
#[derive(Debug)]
pub struct MockSegmentDecoder {
    model_name: String,
    segments: Vec<Segment>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockSegmentDecoder {
    /// Create a new mock decoder with no segments (silence).
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            segments: Vec::new(),
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to emit the given texts as consecutive segments.
    pub fn with_texts(mut self, texts: &[&str]) -> Self {
        self.segments = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Segment {
                start_ms: i as i64 * 1000,
                end_ms: (i as i64 + 1) * 1000,
                text: (*t).to_string(),
            })
            .collect();
        self
    }

    /// Configure the mock to fail on decode.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of decode invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentDecoder for MockSegmentDecoder {
    fn decode(&self, _audio: &[i16]) -> Result<SegmentStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(TalkbackError::TranscriptionFailed {
                message: "mock decode failure".to_string(),
            });
        }
        Ok(Box::new(self.segments.clone().into_iter()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture_wav(dir: &tempfile::TempDir, rate: u32, samples: &[i32]) -> std::path::PathBuf {
        let path = dir.path().join("fixture.wav");
        AudioBuffer::new(samples.to_vec(), rate, 1, 16)
            .write_wav(&path)
            .unwrap();
        path
    }

    #[test]
    fn joins_trimmed_segments_with_single_space() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 16000, &[0; 1600]);

        let decoder = MockSegmentDecoder::new("mock").with_texts(&[" Hello there.", " How are you? "]);
        let transcriber = SpeechTranscriber::new(decoder);

        let text = transcriber.transcribe(&path).unwrap();
        assert_eq!(text, "Hello there. How are you?");
    }

    #[test]
    fn preserves_segment_emission_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 16000, &[0; 1600]);

        let decoder = MockSegmentDecoder::new("mock").with_texts(&["one", "two", "three"]);
        let transcriber = SpeechTranscriber::new(decoder);

        assert_eq!(transcriber.transcribe(&path).unwrap(), "one two three");
    }

    #[test]
    fn silence_yields_empty_transcript_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 16000, &[0; 16000]);

        let decoder = MockSegmentDecoder::new("mock");
        let transcriber = SpeechTranscriber::new(decoder);

        assert_eq!(transcriber.transcribe(&path).unwrap(), "");
    }

    #[test]
    fn resamples_before_decoding() {
        // 8kHz input must reach the decoder at 16kHz length
        struct LengthProbe(std::sync::Mutex<usize>);
        impl SegmentDecoder for LengthProbe {
            fn decode(&self, audio: &[i16]) -> Result<SegmentStream> {
                *self.0.lock().unwrap() = audio.len();
                Ok(Box::new(std::iter::empty()))
            }
            fn model_name(&self) -> &str {
                "probe"
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 8000, &[0; 8000]);

        let probe = LengthProbe(std::sync::Mutex::new(0));
        let transcriber = SpeechTranscriber::new(probe);
        transcriber.transcribe(&path).unwrap();

        assert_eq!(*transcriber.decoder.0.lock().unwrap(), 16000);
    }

    #[test]
    fn stereo_input_at_target_rate_still_reaches_decoder_mono() {
        struct LengthProbe(std::sync::Mutex<usize>);
        impl SegmentDecoder for LengthProbe {
            fn decode(&self, audio: &[i16]) -> Result<SegmentStream> {
                *self.0.lock().unwrap() = audio.len();
                Ok(Box::new(std::iter::empty()))
            }
            fn model_name(&self) -> &str {
                "probe"
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        AudioBuffer::new(vec![0; 3200], 16000, 2, 16)
            .write_wav(&path)
            .unwrap();

        let transcriber = SpeechTranscriber::new(LengthProbe(std::sync::Mutex::new(0)));
        transcriber.transcribe(&path).unwrap();

        // 1600 stereo frames survive as 1600 mono samples
        assert_eq!(*transcriber.decoder.0.lock().unwrap(), 1600);
    }

    #[test]
    fn decoder_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 16000, &[0; 160]);

        let decoder = MockSegmentDecoder::new("mock").with_failure();
        let transcriber = SpeechTranscriber::new(decoder);

        assert!(matches!(
            transcriber.transcribe(&path),
            Err(TalkbackError::TranscriptionFailed { .. })
        ));
    }

    #[test]
    fn unreadable_container_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let decoder = MockSegmentDecoder::new("mock");
        let transcriber = SpeechTranscriber::new(decoder);

        assert!(matches!(
            transcriber.transcribe(&path),
            Err(TalkbackError::UnsupportedAudioFormat { .. })
        ));
    }

    #[test]
    fn profile_is_fixed_at_construction() {
        let transcriber = SpeechTranscriber::new(MockSegmentDecoder::new("mock"));
        assert_eq!(transcriber.profile(), select_profile());
    }

    #[test]
    fn mock_counts_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture_wav(&dir, 16000, &[0; 160]);

        let decoder = Arc::new(MockSegmentDecoder::new("mock"));
        let transcriber = SpeechTranscriber::new(Arc::clone(&decoder));

        transcriber.transcribe(&path).unwrap();
        transcriber.transcribe(&path).unwrap();
        assert_eq!(decoder.call_count(), 2);
    }
}
