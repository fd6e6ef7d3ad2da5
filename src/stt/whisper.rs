//! Whisper-based segment decoding.
//!
//! Provides a Whisper implementation of the [`SegmentDecoder`] trait using
//! whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. To build with Whisper support:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{Result, TalkbackError};
use crate::stt::transcriber::{SegmentDecoder, SegmentStream};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use crate::stt::transcriber::Segment;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    install_logging_hooks, FullParams, SamplingStrategy, WhisperContext,
    WhisperContextParameters,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Beam width for decoding. Wider than greedy to cut hallucinated tokens
/// on noisy input, at a modest latency cost.
pub const BEAM_SIZE: i32 = 5;

/// Configuration for the Whisper decoder.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es", "fr")
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Whisper-based decoder implementation.
///
/// The WhisperContext is wrapped in a Mutex: the underlying model is a
/// heavyweight, non-thread-safe resource loaded once and reused for every
/// request.
#[cfg(feature = "whisper")]
pub struct WhisperDecoder {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperDecoder")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper-based decoder placeholder (without whisper feature).
///
/// Validates the model path at construction like the real implementation
/// but returns errors when used. Enable the `whisper` feature for real
/// transcription.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperDecoder {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperDecoder {
    /// Load the Whisper model.
    ///
    /// # Errors
    /// `ModelNotFound` if the model file doesn't exist (fatal, never
    /// deferred to decode time), `TranscriptionFailed` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(TalkbackError::ModelNotFound {
                role: "transcription",
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config.model_path.to_str().ok_or_else(|| {
                TalkbackError::TranscriptionFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                }
            })?,
            context_params,
        )
        .map_err(|e| TalkbackError::TranscriptionFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        tracing::info!(
            model = %model_name,
            backend = defaults::gpu_backend(),
            "whisper model loaded"
        );

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Convert i16 audio samples to f32 normalized to [-1.0, 1.0]
    ///
    /// Whisper expects audio in f32 format normalized to the range [-1.0, 1.0].
    fn convert_audio(samples: &[i16]) -> Vec<f32> {
        samples
            .iter()
            .map(|&sample| sample as f32 / 32768.0)
            .collect()
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperDecoder {
    /// Create a Whisper decoder (stub implementation).
    ///
    /// Still validates the model path so construction-time error semantics
    /// match the real implementation.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(TalkbackError::ModelNotFound {
                role: "transcription",
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        Ok(Self { config, model_name })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl SegmentDecoder for WhisperDecoder {
    fn decode(&self, audio: &[i16]) -> Result<SegmentStream> {
        let audio_f32 = Self::convert_audio(audio);

        let context = self
            .context
            .lock()
            .map_err(|e| TalkbackError::TranscriptionFailed {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        // Fresh state per decode call; the stream below is single-pass
        let mut state =
            context
                .create_state()
                .map_err(|e| TalkbackError::TranscriptionFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: BEAM_SIZE,
            patience: -1.0,
        });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Disable printing to stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| TalkbackError::TranscriptionFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut segments = Vec::new();
        for i in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            let text =
                segment
                    .to_str_lossy()
                    .map_err(|e| TalkbackError::TranscriptionFailed {
                        message: format!("Failed to read segment text: {}", e),
                    })?;
            // whisper timestamps are in centiseconds
            segments.push(Segment {
                start_ms: segment.start_timestamp() * 10,
                end_ms: segment.end_timestamp() * 10,
                text: text.to_string(),
            });
        }

        Ok(Box::new(segments.into_iter()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl SegmentDecoder for WhisperDecoder {
    fn decode(&self, _audio: &[i16]) -> Result<SegmentStream> {
        Err(TalkbackError::TranscriptionFailed {
            message: concat!(
                "Whisper feature not enabled. This build has no speech recognition.\n",
                "To fix: cargo build --features whisper\n",
                "If the build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
